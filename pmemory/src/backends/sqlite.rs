use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pchat::{
    ChatError, ChatFuture, Conversation, ConversationStore, MessageStore, NewConversation,
    NewMessage, StoredMessage, new_conversation_id,
};
use pcommon::{ConversationId, MessageId, UserId};
use pprovider::{
    CredentialRecord, CredentialStore, EncryptedSecret, ProviderError, ProviderFuture,
    ProviderId, Role,
};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::MemoryError;

/// Conversations, messages, and encrypted user keys in one SQLite file.
#[derive(Debug)]
pub struct SqliteChatStore {
    connection: Mutex<Connection>,
}

impl SqliteChatStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                MemoryError::storage(format!(
                    "failed to create sqlite parent directory: {error}"
                ))
            })?;
        }

        let connection = Connection::open(path).map_err(|error| {
            MemoryError::storage(format!("failed to open sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    pub fn new_in_memory() -> Result<Self, MemoryError> {
        let connection = Connection::open_in_memory().map_err(|error| {
            MemoryError::storage(format!("failed to open in-memory sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, MemoryError> {
        connection
            .busy_timeout(Duration::from_secs(5))
            .map_err(|error| {
                MemoryError::storage(format!("failed to configure sqlite busy timeout: {error}"))
            })?;
        let store = Self {
            connection: Mutex::new(connection),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, MemoryError> {
        self.connection
            .lock()
            .map_err(|_| MemoryError::storage("sqlite store lock poisoned"))
    }

    fn initialize_schema(&self) -> Result<(), MemoryError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                model_identifier TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at_secs INTEGER NOT NULL,
                created_at_nanos INTEGER NOT NULL,
                updated_at_secs INTEGER NOT NULL,
                updated_at_nanos INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_conversations_user_updated
            ON conversations(user_id, updated_at_secs, updated_at_nanos);

            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL
                    REFERENCES conversations(id) ON DELETE CASCADE,
                role TEXT NOT NULL CHECK (role IN ('system', 'user', 'assistant')),
                content TEXT NOT NULL,
                created_at_secs INTEGER NOT NULL,
                created_at_nanos INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_messages_conversation_created
            ON messages(conversation_id, created_at_secs, created_at_nanos, id);

            CREATE TABLE IF NOT EXISTS user_api_keys (
                user_id TEXT NOT NULL,
                service_name TEXT NOT NULL,
                encrypted_api_key TEXT NOT NULL,
                created_at_secs INTEGER NOT NULL,
                created_at_nanos INTEGER NOT NULL,
                updated_at_secs INTEGER NOT NULL,
                updated_at_nanos INTEGER NOT NULL,
                PRIMARY KEY (user_id, service_name)
            );
            ",
        )
        .map_err(|error| {
            MemoryError::storage(format!("failed to initialize sqlite schema: {error}"))
        })?;

        Ok(())
    }

    fn create_conversation(&self, new: NewConversation) -> Result<Conversation, MemoryError> {
        let conn = self.connection()?;
        let now = SystemTime::now();
        let (secs, nanos) = encode_system_time(now)?;
        let conversation = Conversation {
            id: new_conversation_id(),
            user: new.user,
            model_identifier: new.model_identifier,
            title: new.title,
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "
            INSERT INTO conversations (
                id, user_id, model_identifier, title,
                created_at_secs, created_at_nanos, updated_at_secs, updated_at_nanos
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?5, ?6)
            ",
            params![
                conversation.id.as_str(),
                conversation.user.as_str(),
                &conversation.model_identifier,
                &conversation.title,
                secs,
                nanos,
            ],
        )
        .map_err(|error| MemoryError::storage(format!("failed to insert conversation: {error}")))?;

        Ok(conversation)
    }

    fn load_conversation(
        conn: &Connection,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, MemoryError> {
        let row = conn
            .query_row(
                "
                SELECT id, user_id, model_identifier, title,
                       created_at_secs, created_at_nanos, updated_at_secs, updated_at_nanos
                FROM conversations
                WHERE id = ?1
                ",
                params![id.as_str()],
                ConversationRow::from_row,
            )
            .optional()
            .map_err(|error| MemoryError::storage(format!("failed to load conversation: {error}")))?;

        row.map(ConversationRow::into_conversation).transpose()
    }

    fn list_conversations(&self, user: &UserId) -> Result<Vec<Conversation>, MemoryError> {
        let conn = self.connection()?;
        let mut statement = conn
            .prepare(
                "
                SELECT id, user_id, model_identifier, title,
                       created_at_secs, created_at_nanos, updated_at_secs, updated_at_nanos
                FROM conversations
                WHERE user_id = ?1
                ORDER BY updated_at_secs DESC, updated_at_nanos DESC,
                         created_at_secs DESC, created_at_nanos DESC
                ",
            )
            .map_err(|error| {
                MemoryError::storage(format!("failed to prepare conversation query: {error}"))
            })?;

        let rows = statement
            .query_map(params![user.as_str()], ConversationRow::from_row)
            .map_err(|error| {
                MemoryError::storage(format!("failed to query conversations: {error}"))
            })?;

        let mut conversations = Vec::new();
        for row in rows {
            let row = row.map_err(|error| {
                MemoryError::storage(format!("failed to decode conversation row: {error}"))
            })?;
            conversations.push(row.into_conversation()?);
        }

        Ok(conversations)
    }

    fn rename_conversation(
        &self,
        id: &ConversationId,
        title: &str,
    ) -> Result<Option<Conversation>, MemoryError> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                "UPDATE conversations SET title = ?2 WHERE id = ?1",
                params![id.as_str(), title],
            )
            .map_err(|error| {
                MemoryError::storage(format!("failed to rename conversation: {error}"))
            })?;

        if changed == 0 {
            return Ok(None);
        }

        Self::load_conversation(&conn, id)
    }

    fn touch_conversation(&self, id: &ConversationId) -> Result<(), MemoryError> {
        let conn = self.connection()?;
        let (secs, nanos) = encode_system_time(SystemTime::now())?;
        let changed = conn
            .execute(
                "
                UPDATE conversations
                SET updated_at_secs = ?2, updated_at_nanos = ?3
                WHERE id = ?1
                ",
                params![id.as_str(), secs, nanos],
            )
            .map_err(|error| {
                MemoryError::storage(format!("failed to touch conversation: {error}"))
            })?;

        if changed == 0 {
            return Err(MemoryError::not_found(format!(
                "conversation '{id}' not found"
            )));
        }

        Ok(())
    }

    fn delete_conversation(&self, id: &ConversationId) -> Result<bool, MemoryError> {
        let conn = self.connection()?;
        let deleted = conn
            .execute("DELETE FROM conversations WHERE id = ?1", params![id.as_str()])
            .map_err(|error| {
                MemoryError::storage(format!("failed to delete conversation: {error}"))
            })?;

        Ok(deleted > 0)
    }

    fn append_message(
        &self,
        conversation_id: &ConversationId,
        message: NewMessage,
    ) -> Result<StoredMessage, MemoryError> {
        let conn = self.connection()?;
        let exists = conn
            .query_row(
                "SELECT 1 FROM conversations WHERE id = ?1",
                params![conversation_id.as_str()],
                |_| Ok(()),
            )
            .optional()
            .map_err(|error| {
                MemoryError::storage(format!("failed to check conversation: {error}"))
            })?
            .is_some();
        if !exists {
            return Err(MemoryError::not_found(format!(
                "conversation '{conversation_id}' not found"
            )));
        }

        let created_at = message.created_at.unwrap_or_else(SystemTime::now);
        let (secs, nanos) = encode_system_time(created_at)?;
        conn.execute(
            "
            INSERT INTO messages (conversation_id, role, content, created_at_secs, created_at_nanos)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                conversation_id.as_str(),
                message.role.as_str(),
                &message.content,
                secs,
                nanos,
            ],
        )
        .map_err(|error| MemoryError::storage(format!("failed to insert message: {error}")))?;

        Ok(StoredMessage {
            id: MessageId::new(conn.last_insert_rowid() as u64),
            conversation_id: conversation_id.clone(),
            role: message.role,
            content: message.content,
            created_at,
        })
    }

    fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<StoredMessage>, MemoryError> {
        let conn = self.connection()?;
        let mut statement = conn
            .prepare(
                "
                SELECT id, role, content, created_at_secs, created_at_nanos
                FROM messages
                WHERE conversation_id = ?1
                ORDER BY created_at_secs ASC, created_at_nanos ASC, id ASC
                ",
            )
            .map_err(|error| {
                MemoryError::storage(format!("failed to prepare message query: {error}"))
            })?;

        let rows = statement
            .query_map(params![conversation_id.as_str()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .map_err(|error| MemoryError::storage(format!("failed to query messages: {error}")))?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, role, content, secs, nanos) = row.map_err(|error| {
                MemoryError::storage(format!("failed to decode message row: {error}"))
            })?;
            messages.push(StoredMessage {
                id: MessageId::new(id as u64),
                conversation_id: conversation_id.clone(),
                role: role_from_str(&role)?,
                content,
                created_at: decode_system_time(secs, nanos)?,
            });
        }

        Ok(messages)
    }

    fn load_credential(
        &self,
        user: &UserId,
        provider: ProviderId,
    ) -> Result<Option<EncryptedSecret>, MemoryError> {
        let conn = self.connection()?;
        let token = conn
            .query_row(
                "
                SELECT encrypted_api_key FROM user_api_keys
                WHERE user_id = ?1 AND service_name = ?2
                ",
                params![user.as_str(), provider.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|error| MemoryError::storage(format!("failed to load api key: {error}")))?;

        Ok(token.map(EncryptedSecret::from_token))
    }

    fn save_credential(
        &self,
        user: &UserId,
        provider: ProviderId,
        secret: EncryptedSecret,
    ) -> Result<CredentialRecord, MemoryError> {
        let conn = self.connection()?;
        let (secs, nanos) = encode_system_time(SystemTime::now())?;
        conn.execute(
            "
            INSERT INTO user_api_keys (
                user_id, service_name, encrypted_api_key,
                created_at_secs, created_at_nanos, updated_at_secs, updated_at_nanos
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?4, ?5)
            ON CONFLICT(user_id, service_name) DO UPDATE SET
                encrypted_api_key = excluded.encrypted_api_key,
                updated_at_secs = excluded.updated_at_secs,
                updated_at_nanos = excluded.updated_at_nanos
            ",
            params![user.as_str(), provider.as_str(), secret.as_str(), secs, nanos],
        )
        .map_err(|error| MemoryError::storage(format!("failed to upsert api key: {error}")))?;

        let (created_secs, created_nanos, updated_secs, updated_nanos) = conn
            .query_row(
                "
                SELECT created_at_secs, created_at_nanos, updated_at_secs, updated_at_nanos
                FROM user_api_keys
                WHERE user_id = ?1 AND service_name = ?2
                ",
                params![user.as_str(), provider.as_str()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .map_err(|error| MemoryError::storage(format!("failed to reload api key: {error}")))?;

        Ok(CredentialRecord {
            user: user.clone(),
            provider,
            created_at: decode_system_time(created_secs, created_nanos)?,
            updated_at: decode_system_time(updated_secs, updated_nanos)?,
        })
    }

    fn delete_credential(&self, user: &UserId, provider: ProviderId) -> Result<bool, MemoryError> {
        let conn = self.connection()?;
        let deleted = conn
            .execute(
                "DELETE FROM user_api_keys WHERE user_id = ?1 AND service_name = ?2",
                params![user.as_str(), provider.as_str()],
            )
            .map_err(|error| MemoryError::storage(format!("failed to delete api key: {error}")))?;

        Ok(deleted > 0)
    }

    fn list_credentials(&self, user: &UserId) -> Result<Vec<CredentialRecord>, MemoryError> {
        let conn = self.connection()?;
        let mut statement = conn
            .prepare(
                "
                SELECT service_name,
                       created_at_secs, created_at_nanos, updated_at_secs, updated_at_nanos
                FROM user_api_keys
                WHERE user_id = ?1
                ",
            )
            .map_err(|error| {
                MemoryError::storage(format!("failed to prepare api key query: {error}"))
            })?;

        let rows = statement
            .query_map(params![user.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .map_err(|error| MemoryError::storage(format!("failed to query api keys: {error}")))?;

        let mut records = Vec::new();
        for row in rows {
            let (service, created_secs, created_nanos, updated_secs, updated_nanos) =
                row.map_err(|error| {
                    MemoryError::storage(format!("failed to decode api key row: {error}"))
                })?;
            let provider = ProviderId::from_token(&service).ok_or_else(|| {
                MemoryError::storage(format!("unknown service name '{service}'"))
            })?;
            records.push(CredentialRecord {
                user: user.clone(),
                provider,
                created_at: decode_system_time(created_secs, created_nanos)?,
                updated_at: decode_system_time(updated_secs, updated_nanos)?,
            });
        }
        records.sort_by_key(|record| record.provider);

        Ok(records)
    }
}

struct ConversationRow {
    id: String,
    user_id: String,
    model_identifier: String,
    title: String,
    created_at: (i64, i64),
    updated_at: (i64, i64),
}

impl ConversationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            model_identifier: row.get(2)?,
            title: row.get(3)?,
            created_at: (row.get(4)?, row.get(5)?),
            updated_at: (row.get(6)?, row.get(7)?),
        })
    }

    fn into_conversation(self) -> Result<Conversation, MemoryError> {
        Ok(Conversation {
            id: ConversationId::new(self.id),
            user: UserId::new(self.user_id),
            model_identifier: self.model_identifier,
            title: self.title,
            created_at: decode_system_time(self.created_at.0, self.created_at.1)?,
            updated_at: decode_system_time(self.updated_at.0, self.updated_at.1)?,
        })
    }
}

impl MessageStore for SqliteChatStore {
    fn append<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message: NewMessage,
    ) -> ChatFuture<'a, Result<StoredMessage, ChatError>> {
        Box::pin(async move { Ok(self.append_message(conversation_id, message)?) })
    }

    fn list_ordered<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Vec<StoredMessage>, ChatError>> {
        Box::pin(async move { Ok(self.list_messages(conversation_id)?) })
    }
}

impl ConversationStore for SqliteChatStore {
    fn create<'a>(
        &'a self,
        conversation: NewConversation,
    ) -> ChatFuture<'a, Result<Conversation, ChatError>> {
        Box::pin(async move { Ok(self.create_conversation(conversation)?) })
    }

    fn get<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            Ok(Self::load_conversation(&conn, id)?)
        })
    }

    fn list_for_user<'a>(
        &'a self,
        user: &'a UserId,
    ) -> ChatFuture<'a, Result<Vec<Conversation>, ChatError>> {
        Box::pin(async move { Ok(self.list_conversations(user)?) })
    }

    fn rename<'a>(
        &'a self,
        id: &'a ConversationId,
        title: String,
    ) -> ChatFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move { Ok(self.rename_conversation(id, &title)?) })
    }

    fn touch_updated_at<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move { Ok(self.touch_conversation(id)?) })
    }

    fn delete<'a>(&'a self, id: &'a ConversationId) -> ChatFuture<'a, Result<bool, ChatError>> {
        Box::pin(async move { Ok(self.delete_conversation(id)?) })
    }
}

impl CredentialStore for SqliteChatStore {
    fn load<'a>(
        &'a self,
        user: &'a UserId,
        provider: ProviderId,
    ) -> ProviderFuture<'a, Result<Option<EncryptedSecret>, ProviderError>> {
        Box::pin(async move { Ok(self.load_credential(user, provider)?) })
    }

    fn save<'a>(
        &'a self,
        user: &'a UserId,
        provider: ProviderId,
        secret: EncryptedSecret,
    ) -> ProviderFuture<'a, Result<CredentialRecord, ProviderError>> {
        Box::pin(async move { Ok(self.save_credential(user, provider, secret)?) })
    }

    fn delete<'a>(
        &'a self,
        user: &'a UserId,
        provider: ProviderId,
    ) -> ProviderFuture<'a, Result<bool, ProviderError>> {
        Box::pin(async move { Ok(self.delete_credential(user, provider)?) })
    }

    fn list<'a>(
        &'a self,
        user: &'a UserId,
    ) -> ProviderFuture<'a, Result<Vec<CredentialRecord>, ProviderError>> {
        Box::pin(async move { Ok(self.list_credentials(user)?) })
    }
}

fn encode_system_time(value: SystemTime) -> Result<(i64, i64), MemoryError> {
    let duration = value.duration_since(UNIX_EPOCH).map_err(|error| {
        MemoryError::invalid_request(format!("timestamp predates unix epoch: {error}"))
    })?;
    Ok((
        duration.as_secs() as i64,
        i64::from(duration.subsec_nanos()),
    ))
}

fn decode_system_time(seconds: i64, nanos: i64) -> Result<SystemTime, MemoryError> {
    if seconds < 0 {
        return Err(MemoryError::storage(format!(
            "timestamp seconds must be non-negative, got {seconds}"
        )));
    }
    if !(0..1_000_000_000).contains(&nanos) {
        return Err(MemoryError::storage(format!(
            "timestamp nanos must be in [0, 1_000_000_000), got {nanos}"
        )));
    }
    Ok(UNIX_EPOCH + Duration::new(seconds as u64, nanos as u32))
}

fn role_from_str(value: &str) -> Result<Role, MemoryError> {
    Role::parse(value)
        .ok_or_else(|| MemoryError::storage(format!("unknown message role value '{value}'")))
}

pub fn default_sqlite_path() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home).join(".parley").join("parley.sqlite3");
    }

    PathBuf::from("parley.sqlite3")
}
