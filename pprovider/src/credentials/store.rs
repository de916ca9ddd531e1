//! Credential storage contract, in-memory store, and the write-side manager.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use pcommon::UserId;

use crate::{ProviderError, ProviderFuture, ProviderId};

use super::{CredentialRecord, EncryptedSecret, SecretCipher, SecretString};

/// Persistence for encrypted per-user provider keys, one per (user, provider).
pub trait CredentialStore: Send + Sync {
    fn load<'a>(
        &'a self,
        user: &'a UserId,
        provider: ProviderId,
    ) -> ProviderFuture<'a, Result<Option<EncryptedSecret>, ProviderError>>;

    /// Inserts or replaces the secret. `created_at` survives a replace.
    fn save<'a>(
        &'a self,
        user: &'a UserId,
        provider: ProviderId,
        secret: EncryptedSecret,
    ) -> ProviderFuture<'a, Result<CredentialRecord, ProviderError>>;

    fn delete<'a>(
        &'a self,
        user: &'a UserId,
        provider: ProviderId,
    ) -> ProviderFuture<'a, Result<bool, ProviderError>>;

    fn list<'a>(
        &'a self,
        user: &'a UserId,
    ) -> ProviderFuture<'a, Result<Vec<CredentialRecord>, ProviderError>>;
}

#[derive(Debug, Clone)]
struct StoredCredential {
    secret: EncryptedSecret,
    created_at: SystemTime,
    updated_at: SystemTime,
}

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    entries: Mutex<HashMap<(UserId, ProviderId), StoredCredential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned() -> ProviderError {
    ProviderError::other("credential store lock poisoned")
}

impl CredentialStore for InMemoryCredentialStore {
    fn load<'a>(
        &'a self,
        user: &'a UserId,
        provider: ProviderId,
    ) -> ProviderFuture<'a, Result<Option<EncryptedSecret>, ProviderError>> {
        Box::pin(async move {
            let entries = self.entries.lock().map_err(|_| lock_poisoned())?;
            Ok(entries
                .get(&(user.clone(), provider))
                .map(|entry| entry.secret.clone()))
        })
    }

    fn save<'a>(
        &'a self,
        user: &'a UserId,
        provider: ProviderId,
        secret: EncryptedSecret,
    ) -> ProviderFuture<'a, Result<CredentialRecord, ProviderError>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().map_err(|_| lock_poisoned())?;
            let now = SystemTime::now();
            let entry = entries
                .entry((user.clone(), provider))
                .and_modify(|entry| {
                    entry.secret = secret.clone();
                    entry.updated_at = now;
                })
                .or_insert_with(|| StoredCredential {
                    secret,
                    created_at: now,
                    updated_at: now,
                });

            Ok(CredentialRecord {
                user: user.clone(),
                provider,
                created_at: entry.created_at,
                updated_at: entry.updated_at,
            })
        })
    }

    fn delete<'a>(
        &'a self,
        user: &'a UserId,
        provider: ProviderId,
    ) -> ProviderFuture<'a, Result<bool, ProviderError>> {
        Box::pin(async move {
            let mut entries = self.entries.lock().map_err(|_| lock_poisoned())?;
            Ok(entries.remove(&(user.clone(), provider)).is_some())
        })
    }

    fn list<'a>(
        &'a self,
        user: &'a UserId,
    ) -> ProviderFuture<'a, Result<Vec<CredentialRecord>, ProviderError>> {
        Box::pin(async move {
            let entries = self.entries.lock().map_err(|_| lock_poisoned())?;
            let mut records = entries
                .iter()
                .filter(|((owner, _), _)| owner == user)
                .map(|((owner, provider), entry)| CredentialRecord {
                    user: owner.clone(),
                    provider: *provider,
                    created_at: entry.created_at,
                    updated_at: entry.updated_at,
                })
                .collect::<Vec<_>>();
            records.sort_by_key(|record| record.provider);
            Ok(records)
        })
    }
}

/// Write path for user keys. Plaintext never reaches the store.
#[derive(Clone)]
pub struct CredentialManager {
    store: Arc<dyn CredentialStore>,
    cipher: Arc<SecretCipher>,
}

impl CredentialManager {
    pub fn new(store: Arc<dyn CredentialStore>, cipher: Arc<SecretCipher>) -> Self {
        Self { store, cipher }
    }

    pub async fn set(
        &self,
        user: &UserId,
        provider: ProviderId,
        plaintext: SecretString,
    ) -> Result<CredentialRecord, ProviderError> {
        if plaintext.expose().trim().is_empty() {
            return Err(ProviderError::invalid_request(format!(
                "API key for service '{provider}' must not be empty"
            )));
        }

        let sealed = self.cipher.encrypt(&plaintext);
        let record = self.store.save(user, provider, sealed).await?;
        tracing::info!(user = %user, provider = %provider, "stored user api key");
        Ok(record)
    }

    pub async fn delete(&self, user: &UserId, provider: ProviderId) -> Result<bool, ProviderError> {
        self.store.delete(user, provider).await
    }

    pub async fn list(&self, user: &UserId) -> Result<Vec<CredentialRecord>, ProviderError> {
        self.store.list(user).await
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    fn manager() -> (CredentialManager, Arc<InMemoryCredentialStore>, Arc<SecretCipher>) {
        let store = Arc::new(InMemoryCredentialStore::new());
        let cipher = Arc::new(
            SecretCipher::from_key(&SecretCipher::generate_key()).expect("valid key"),
        );
        (
            CredentialManager::new(store.clone(), cipher.clone()),
            store,
            cipher,
        )
    }

    #[tokio::test]
    async fn set_encrypts_before_persisting() {
        let (manager, store, cipher) = manager();
        let user = UserId::new("alice");

        manager
            .set(&user, ProviderId::OpenAi, SecretString::new("sk-alice"))
            .await
            .expect("set should succeed");

        let sealed = store
            .load(&user, ProviderId::OpenAi)
            .await
            .expect("load should succeed")
            .expect("credential should exist");
        assert!(!sealed.as_str().contains("sk-alice"));
        assert_eq!(
            cipher.decrypt(&sealed).expect("decrypt").expose(),
            "sk-alice"
        );
    }

    #[tokio::test]
    async fn set_replaces_and_keeps_created_at() {
        let (manager, _store, _cipher) = manager();
        let user = UserId::new("alice");

        let first = manager
            .set(&user, ProviderId::Google, SecretString::new("g-1"))
            .await
            .expect("first set");
        let second = manager
            .set(&user, ProviderId::Google, SecretString::new("g-2"))
            .await
            .expect("second set");

        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(manager.list(&user).await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn set_rejects_empty_key() {
        let (manager, _store, _cipher) = manager();
        let error = manager
            .set(&UserId::new("alice"), ProviderId::OpenAi, SecretString::new("  "))
            .await
            .expect_err("empty key must fail");
        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn list_and_delete_are_scoped_to_user() {
        let (manager, _store, _cipher) = manager();
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");

        for provider in [ProviderId::Google, ProviderId::OpenAi] {
            manager
                .set(&alice, provider, SecretString::new("key"))
                .await
                .expect("set");
        }
        manager
            .set(&bob, ProviderId::Anthropic, SecretString::new("key"))
            .await
            .expect("set");

        let listed = manager.list(&alice).await.expect("list");
        assert_eq!(
            listed.iter().map(|r| r.provider).collect::<Vec<_>>(),
            vec![ProviderId::OpenAi, ProviderId::Google]
        );

        assert!(manager.delete(&alice, ProviderId::OpenAi).await.expect("delete"));
        assert!(!manager.delete(&alice, ProviderId::Anthropic).await.expect("delete"));
        assert_eq!(manager.list(&alice).await.expect("list").len(), 1);
        assert_eq!(manager.list(&bob).await.expect("list").len(), 1);
    }
}
