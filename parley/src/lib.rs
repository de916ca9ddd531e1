//! Unified facade over the parley workspace crates.
//!
//! This crate is the single dependency for most applications. It re-exports the
//! core crates, reads settings from the environment, and wires stores, credentials,
//! provider clients, and hooks into a ready [`ChatService`].
//!
//! ```rust
//! use parley::{AppConfig, ConfigErrorKind};
//!
//! let error = AppConfig::from_lookup(|_| None).expect_err("encryption key is required");
//! assert_eq!(error.kind, ConfigErrorKind::MissingSetting);
//! ```

pub mod config;
pub mod prelude;
pub mod runtime;
pub mod util;

pub use pchat;
pub use pcommon;
pub use pmemory;
pub use pobserve;
pub use pprovider;

pub use pchat::{
    AI_ABSENT_NOTICE, ChatError, ChatErrorKind, ChatPolicy, ChatService, ChatServiceBuilder,
    Conversation, ConversationDetail, ConversationStore, FailureClass, INTERNAL_FAILURE_MESSAGE,
    InMemoryChatStore, MessageStore, NewMessage, StoredMessage, TurnFailure, TurnHooks,
    TurnOutcome, TurnReport, TurnRequest, TurnState,
};
pub use pcommon::{BoxFuture, ConversationId, MessageId, UserId};
pub use pmemory::{
    ChatStores, MemoryError, MemoryErrorKind, SqliteChatStore, StoreConfig, create_chat_stores,
    default_sqlite_path,
};
pub use pobserve::{
    CompositeHooks, MetricsObservabilityHooks, SafeProviderHooks, SafeTurnHooks,
    TracingObservabilityHooks,
};
pub use pprovider::{
    ClientFactory, Completion, CredentialManager, CredentialRecord, CredentialResolution,
    CredentialResolver, CredentialSource, CredentialStore, Diagnostic, EnvSystemCredentials,
    HttpRequest, HttpTransport, Message, ModelCatalog, ModelChoice, ModelIdentifier,
    ProviderError, ProviderErrorKind, ProviderFuture, ProviderId, ProviderOperationHooks,
    ReqwestTransport, Role, SecretCipher, SecretString, SequencePolicy, StaticSystemCredentials,
    SystemCredentialSource,
};

pub use config::{AppConfig, ConfigError, ConfigErrorKind};
pub use runtime::{
    RuntimeBundle, RuntimeParts, build_runtime, build_runtime_from_env, build_runtime_with,
    observability_provider_hooks, observability_turn_hooks,
};
pub use util::{assistant_message, parse_provider_id, system_message, turn, user_message};
