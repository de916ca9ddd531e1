//! Process-wide fallback keys shared by every user.

use std::collections::HashMap;

use crate::ProviderId;

use super::SecretString;

pub trait SystemCredentialSource: Send + Sync {
    /// Returns the shared key for `provider`. Empty values count as absent.
    fn lookup(&self, provider: ProviderId) -> Option<SecretString>;
}

/// Reads `<PROVIDER>_API_KEY` from the environment on every lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSystemCredentials;

impl SystemCredentialSource for EnvSystemCredentials {
    fn lookup(&self, provider: ProviderId) -> Option<SecretString> {
        std::env::var(provider.system_key_var())
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(SecretString::new)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticSystemCredentials {
    keys: HashMap<ProviderId, SecretString>,
}

impl StaticSystemCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        self.keys.insert(provider, SecretString::new(key));
        self
    }
}

impl SystemCredentialSource for StaticSystemCredentials {
    fn lookup(&self, provider: ProviderId) -> Option<SecretString> {
        self.keys
            .get(&provider)
            .filter(|secret| !secret.expose().trim().is_empty())
            .cloned()
    }
}
