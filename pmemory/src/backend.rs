//! Store selection and construction.

use std::path::PathBuf;
use std::sync::Arc;

use pchat::{ConversationStore, InMemoryChatStore, MessageStore};
use pprovider::{CredentialStore, InMemoryCredentialStore};

use crate::backends::sqlite::default_sqlite_path;
use crate::error::MemoryError;

pub use crate::backends::sqlite::SqliteChatStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Sqlite { path: PathBuf },
    InMemory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

/// The three persistence seams, usually backed by one database.
#[derive(Clone)]
pub struct ChatStores {
    pub conversations: Arc<dyn ConversationStore>,
    pub messages: Arc<dyn MessageStore>,
    pub credentials: Arc<dyn CredentialStore>,
}

impl ChatStores {
    pub fn sqlite(store: SqliteChatStore) -> Self {
        let store = Arc::new(store);
        Self {
            conversations: store.clone(),
            messages: store.clone(),
            credentials: store,
        }
    }

    pub fn in_memory() -> Self {
        let chat = Arc::new(InMemoryChatStore::new());
        Self {
            conversations: chat.clone(),
            messages: chat,
            credentials: Arc::new(InMemoryCredentialStore::new()),
        }
    }
}

impl std::fmt::Debug for ChatStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStores").finish_non_exhaustive()
    }
}

pub fn create_chat_stores(config: StoreConfig) -> Result<ChatStores, MemoryError> {
    match config {
        StoreConfig::Sqlite { path } => {
            tracing::info!(path = %path.display(), "opening sqlite chat store");
            Ok(ChatStores::sqlite(SqliteChatStore::new(path)?))
        }
        StoreConfig::InMemory => Ok(ChatStores::in_memory()),
    }
}

pub fn create_default_chat_stores() -> Result<ChatStores, MemoryError> {
    create_chat_stores(StoreConfig::default())
}
