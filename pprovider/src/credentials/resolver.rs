//! Picks the key used for a provider call: user key first, then the system key.

use std::sync::Arc;

use pcommon::UserId;

use crate::ProviderId;

use super::{CredentialStore, SecretCipher, SecretString, SystemCredentialSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    User,
    System,
}

/// Problem with the user's own key that was logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKeyIssue {
    DecryptionFailed(String),
    StoreUnavailable(String),
}

#[derive(Debug, Clone)]
pub enum CredentialResolution {
    User(SecretString),
    System {
        secret: SecretString,
        user_key_issue: Option<UserKeyIssue>,
    },
    Absent {
        user_key_issue: Option<UserKeyIssue>,
    },
}

impl CredentialResolution {
    pub fn secret(&self) -> Option<&SecretString> {
        match self {
            Self::User(secret) | Self::System { secret, .. } => Some(secret),
            Self::Absent { .. } => None,
        }
    }

    pub fn into_secret(self) -> Option<SecretString> {
        match self {
            Self::User(secret) | Self::System { secret, .. } => Some(secret),
            Self::Absent { .. } => None,
        }
    }

    pub fn source(&self) -> Option<CredentialSource> {
        match self {
            Self::User(_) => Some(CredentialSource::User),
            Self::System { .. } => Some(CredentialSource::System),
            Self::Absent { .. } => None,
        }
    }

    pub fn user_key_issue(&self) -> Option<&UserKeyIssue> {
        match self {
            Self::User(_) => None,
            Self::System { user_key_issue, .. } | Self::Absent { user_key_issue } => {
                user_key_issue.as_ref()
            }
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent { .. })
    }
}

#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
    cipher: Arc<SecretCipher>,
    system: Arc<dyn SystemCredentialSource>,
}

impl CredentialResolver {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        cipher: Arc<SecretCipher>,
        system: Arc<dyn SystemCredentialSource>,
    ) -> Self {
        Self {
            store,
            cipher,
            system,
        }
    }

    /// Never fails. Problems with the user key fall through to the system key.
    pub async fn resolve(&self, user: &UserId, provider: ProviderId) -> CredentialResolution {
        let user_key_issue = match self.store.load(user, provider).await {
            Ok(Some(sealed)) => match self.cipher.decrypt(&sealed) {
                Ok(secret) if !secret.is_empty() => {
                    tracing::debug!(user = %user, provider = %provider, "using user api key");
                    return CredentialResolution::User(secret);
                }
                Ok(_) => None,
                Err(error) => {
                    tracing::warn!(
                        user = %user,
                        provider = %provider,
                        error = %error,
                        "could not decrypt user api key, falling back to system key"
                    );
                    Some(UserKeyIssue::DecryptionFailed(error.message))
                }
            },
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(
                    user = %user,
                    provider = %provider,
                    error = %error,
                    "could not read user api key, falling back to system key"
                );
                Some(UserKeyIssue::StoreUnavailable(error.message))
            }
        };

        match self.system.lookup(provider) {
            Some(secret) => {
                tracing::debug!(provider = %provider, "using system api key");
                CredentialResolution::System {
                    secret,
                    user_key_issue,
                }
            }
            None => {
                tracing::warn!(
                    user = %user,
                    provider = %provider,
                    variable = %provider.system_key_var(),
                    "no api key available"
                );
                CredentialResolution::Absent { user_key_issue }
            }
        }
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{EncryptedSecret, InMemoryCredentialStore, StaticSystemCredentials};
    use crate::{CredentialRecord, ProviderError, ProviderFuture};

    fn cipher() -> Arc<SecretCipher> {
        Arc::new(SecretCipher::from_key(&SecretCipher::generate_key()).expect("valid key"))
    }

    fn system() -> Arc<StaticSystemCredentials> {
        Arc::new(
            StaticSystemCredentials::new()
                .with_key(ProviderId::OpenAi, "sk-system")
                .with_key(ProviderId::Anthropic, "ak-system")
                .with_key(ProviderId::Google, "gk-system"),
        )
    }

    #[tokio::test]
    async fn user_key_wins_over_system_key_for_every_provider() {
        let cipher = cipher();
        let store = Arc::new(InMemoryCredentialStore::new());
        let user = UserId::new("alice");
        for provider in ProviderId::ALL {
            let sealed = cipher.encrypt(&SecretString::new(format!("user-{provider}")));
            store.save(&user, provider, sealed).await.expect("save");
        }

        let resolver = CredentialResolver::new(store, cipher, system());
        for provider in ProviderId::ALL {
            let resolved = resolver.resolve(&user, provider).await;
            assert_eq!(resolved.source(), Some(CredentialSource::User));
            assert_eq!(
                resolved.secret().map(|s| s.expose().to_string()),
                Some(format!("user-{provider}"))
            );
        }
    }

    #[tokio::test]
    async fn undecryptable_user_key_falls_back_to_system_key() {
        let store = Arc::new(InMemoryCredentialStore::new());
        let user = UserId::new("alice");
        store
            .save(&user, ProviderId::OpenAi, EncryptedSecret::from_token("not-a-token"))
            .await
            .expect("save");

        let resolver = CredentialResolver::new(store, cipher(), system());
        let resolved = resolver.resolve(&user, ProviderId::OpenAi).await;

        assert_eq!(resolved.source(), Some(CredentialSource::System));
        assert_eq!(
            resolved.secret().map(|s| s.expose().to_string()),
            Some("sk-system".to_string())
        );
        assert!(matches!(
            resolved.user_key_issue(),
            Some(UserKeyIssue::DecryptionFailed(_))
        ));
    }

    #[tokio::test]
    async fn missing_everywhere_is_absent() {
        let resolver = CredentialResolver::new(
            Arc::new(InMemoryCredentialStore::new()),
            cipher(),
            Arc::new(StaticSystemCredentials::new()),
        );
        let resolved = resolver
            .resolve(&UserId::new("alice"), ProviderId::Google)
            .await;

        assert!(resolved.is_absent());
        assert!(resolved.user_key_issue().is_none());
        assert!(resolved.into_secret().is_none());
    }

    struct FailingStore;

    impl CredentialStore for FailingStore {
        fn load<'a>(
            &'a self,
            _user: &'a UserId,
            _provider: ProviderId,
        ) -> ProviderFuture<'a, Result<Option<EncryptedSecret>, ProviderError>> {
            Box::pin(async { Err(ProviderError::other("database is locked")) })
        }

        fn save<'a>(
            &'a self,
            _user: &'a UserId,
            _provider: ProviderId,
            _secret: EncryptedSecret,
        ) -> ProviderFuture<'a, Result<CredentialRecord, ProviderError>> {
            Box::pin(async { Err(ProviderError::other("database is locked")) })
        }

        fn delete<'a>(
            &'a self,
            _user: &'a UserId,
            _provider: ProviderId,
        ) -> ProviderFuture<'a, Result<bool, ProviderError>> {
            Box::pin(async { Err(ProviderError::other("database is locked")) })
        }

        fn list<'a>(
            &'a self,
            _user: &'a UserId,
        ) -> ProviderFuture<'a, Result<Vec<CredentialRecord>, ProviderError>> {
            Box::pin(async { Err(ProviderError::other("database is locked")) })
        }
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let resolver = CredentialResolver::new(Arc::new(FailingStore), cipher(), system());
        let resolved = resolver
            .resolve(&UserId::new("alice"), ProviderId::Anthropic)
            .await;

        assert_eq!(resolved.source(), Some(CredentialSource::System));
        assert_eq!(
            resolved.user_key_issue(),
            Some(&UserKeyIssue::StoreUnavailable("database is locked".to_string()))
        );
    }
}
