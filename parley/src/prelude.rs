//! Common imports for most parley applications.

pub use crate::{
    AppConfig, ChatError, ChatErrorKind, ChatPolicy, ChatService, ChatStores, ConfigError,
    ConfigErrorKind, Conversation, ConversationDetail, ConversationId, CredentialManager,
    CredentialResolver, FailureClass, Message, MessageId, ModelCatalog, ProviderError,
    ProviderErrorKind, ProviderId, Role, RuntimeBundle, RuntimeParts, SecretString,
    SequencePolicy, StoreConfig, StoredMessage, TurnOutcome, TurnReport, TurnRequest, TurnState,
    UserId,
};
pub use crate::{
    assistant_message, build_runtime, build_runtime_from_env, build_runtime_with,
    parse_provider_id, system_message, turn, user_message,
};
