//! Provider abstraction for chat completions against OpenAI, Anthropic, and Google.
//!
//! ```rust
//! use pprovider::{Message, ProviderProtocol, SecretString, SequencePolicy};
//!
//! let protocol = ProviderProtocol::Anthropic {
//!     sequence_policy: SequencePolicy::Warn,
//! };
//! let (request, diagnostics) = protocol
//!     .prepare(
//!         "claude-3-haiku",
//!         &SecretString::new("ak-123"),
//!         &[Message::system("be brief"), Message::user("hi")],
//!     )
//!     .expect("request should build");
//!
//! assert_eq!(request.url, "https://api.anthropic.com/v1/messages");
//! assert_eq!(request.body["system"], "be brief");
//! assert!(diagnostics.is_empty());
//! ```

pub mod adapters;
mod client;
mod completion;
mod credentials;
mod error;
mod factory;
mod hooks;
mod model;
mod transport;

pub mod prelude;

pub type ProviderFuture<'a, T> = pcommon::BoxFuture<'a, T>;

pub use adapters::anthropic::SequencePolicy;
pub use client::{ProviderClient, ProviderProtocol};
pub use completion::{Completion, Diagnostic, Formatted};
pub use credentials::{
    CredentialManager, CredentialRecord, CredentialResolution, CredentialResolver,
    CredentialSource, CredentialStore, DecryptionError, EncryptedSecret, EnvSystemCredentials,
    InMemoryCredentialStore, SecretCipher, SecretString, StaticSystemCredentials,
    SystemCredentialSource, UserKeyIssue,
};
pub use error::{ErrorClass, ProviderError, ProviderErrorKind};
pub use factory::{ClientFactory, ProviderOptions};
pub use hooks::{NoopOperationHooks, ProviderOperationHooks};
pub use model::{Message, ModelCatalog, ModelChoice, ModelIdentifier, ProviderId, Role};
pub use transport::{DEFAULT_PROVIDER_TIMEOUT, HttpRequest, HttpTransport, ReqwestTransport};
