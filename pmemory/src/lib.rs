//! SQLite persistence for conversations, messages, and encrypted user keys.
//!
//! ```rust
//! use pmemory::{StoreConfig, create_chat_stores};
//!
//! let stores = create_chat_stores(StoreConfig::InMemory).expect("in-memory stores");
//! let _conversations = stores.conversations.clone();
//! ```

mod backend;
mod backends;
mod error;

pub mod prelude {
    pub use crate::{
        ChatStores, MemoryError, MemoryErrorKind, SqliteChatStore, StoreConfig,
        create_chat_stores, create_default_chat_stores, default_sqlite_path,
    };
}

pub use backend::{
    ChatStores, SqliteChatStore, StoreConfig, create_chat_stores, create_default_chat_stores,
};
pub use backends::sqlite::default_sqlite_path;
pub use error::{MemoryError, MemoryErrorKind};
