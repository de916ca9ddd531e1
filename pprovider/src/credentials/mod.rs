//! Per-user encrypted credentials, shared system keys, and key resolution.
//!
//! ```rust
//! use pprovider::{EncryptedSecret, SecretString};
//!
//! let secret = SecretString::new("sk-live-123");
//! assert_eq!(format!("{secret:?}"), "[REDACTED]");
//! assert_eq!(secret.expose(), "sk-live-123");
//!
//! let sealed = EncryptedSecret::from_token("gAAAAA...");
//! assert_eq!(sealed.as_str(), "gAAAAA...");
//! ```

mod cipher;
mod resolver;
mod store;
mod system;

use std::time::SystemTime;

use pcommon::UserId;

use crate::ProviderId;

pub use cipher::{DecryptionError, SecretCipher};
pub use resolver::{CredentialResolution, CredentialResolver, CredentialSource, UserKeyIssue};
pub use store::{CredentialManager, CredentialStore, InMemoryCredentialStore};
pub use system::{EnvSystemCredentials, StaticSystemCredentials, SystemCredentialSource};

#[derive(PartialEq, Eq)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// Ciphertext of a user API key as produced by [`SecretCipher::encrypt`].
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedSecret {
    token: String,
}

impl EncryptedSecret {
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        self.token.as_str()
    }

    pub fn into_token(self) -> String {
        self.token
    }
}

impl std::fmt::Debug for EncryptedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedSecret")
            .field("len", &self.token.len())
            .finish()
    }
}

/// Read-side view of a stored credential. Never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub user: UserId,
    pub provider: ProviderId,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl CredentialRecord {
    pub fn service_display(&self) -> &'static str {
        self.provider.display_name()
    }
}
