//! Symmetric encryption for stored user API keys.

use std::error::Error;
use std::fmt::{Display, Formatter};

use fernet::Fernet;

use crate::ProviderError;

use super::{EncryptedSecret, SecretString};

/// Process-wide cipher built once at startup from `FIELD_ENCRYPTION_KEY`.
///
/// Tokens are Fernet tokens, so keys generated for earlier deployments keep working.
pub struct SecretCipher {
    fernet: Fernet,
}

impl SecretCipher {
    pub fn from_key(key: &str) -> Result<Self, ProviderError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ProviderError::configuration(
                "field encryption key must not be empty",
            ));
        }

        let fernet = Fernet::new(key).ok_or_else(|| {
            ProviderError::configuration(
                "field encryption key must be 32 url-safe base64-encoded bytes",
            )
        })?;

        Ok(Self { fernet })
    }

    pub fn generate_key() -> String {
        Fernet::generate_key()
    }

    pub fn encrypt(&self, secret: &SecretString) -> EncryptedSecret {
        EncryptedSecret::from_token(self.fernet.encrypt(secret.expose().as_bytes()))
    }

    pub fn decrypt(&self, encrypted: &EncryptedSecret) -> Result<SecretString, DecryptionError> {
        let bytes = self
            .fernet
            .decrypt(encrypted.as_str())
            .map_err(|_| DecryptionError::new("token is invalid or was sealed with another key"))?;
        let value = String::from_utf8(bytes)
            .map_err(|_| DecryptionError::new("decrypted key is not valid utf-8"))?;

        Ok(SecretString::new(value))
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretCipher([REDACTED])")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptionError {
    pub message: String,
}

impl DecryptionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for DecryptionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "decryption failed: {}", self.message)
    }
}

impl Error for DecryptionError {}
