//! Common `pprovider` imports for downstream crates.

pub use crate::{
    ClientFactory, Completion, CredentialManager, CredentialRecord, CredentialResolver,
    CredentialStore, Diagnostic, ErrorClass, HttpTransport, Message, ModelCatalog,
    ModelIdentifier, NoopOperationHooks, ProviderClient, ProviderError, ProviderErrorKind,
    ProviderId, ProviderOperationHooks, ProviderOptions, ReqwestTransport, Role, SecretCipher,
    SecretString, SequencePolicy, SystemCredentialSource,
};
pub use pcommon::{BoxFuture, UserId};
