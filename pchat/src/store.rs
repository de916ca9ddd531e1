//! Conversation and message storage contracts and a basic in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::SystemTime;

use pcommon::{BoxFuture, ConversationId, MessageId, UserId};

use crate::{ChatError, Conversation, NewConversation, NewMessage, StoredMessage};

pub type ChatFuture<'a, T> = BoxFuture<'a, T>;

pub trait MessageStore: Send + Sync {
    /// Fails with `NotFound` when the conversation does not exist.
    fn append<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message: NewMessage,
    ) -> ChatFuture<'a, Result<StoredMessage, ChatError>>;

    /// Ascending by `created_at`, ties broken by message id.
    fn list_ordered<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Vec<StoredMessage>, ChatError>>;
}

pub trait ConversationStore: Send + Sync {
    fn create<'a>(
        &'a self,
        conversation: NewConversation,
    ) -> ChatFuture<'a, Result<Conversation, ChatError>>;

    fn get<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Option<Conversation>, ChatError>>;

    /// Most recently updated first.
    fn list_for_user<'a>(
        &'a self,
        user: &'a UserId,
    ) -> ChatFuture<'a, Result<Vec<Conversation>, ChatError>>;

    fn rename<'a>(
        &'a self,
        id: &'a ConversationId,
        title: String,
    ) -> ChatFuture<'a, Result<Option<Conversation>, ChatError>>;

    fn touch_updated_at<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<(), ChatError>>;

    /// Removes the conversation and all of its messages.
    fn delete<'a>(&'a self, id: &'a ConversationId) -> ChatFuture<'a, Result<bool, ChatError>>;
}

pub fn new_conversation_id() -> ConversationId {
    ConversationId::new(uuid::Uuid::new_v4().to_string())
}

pub(crate) fn sort_messages(messages: &mut [StoredMessage]) {
    messages.sort_by(|left, right| {
        left.created_at
            .cmp(&right.created_at)
            .then(left.id.cmp(&right.id))
    });
}

#[derive(Debug, Default)]
struct ChatTables {
    conversations: HashMap<ConversationId, Conversation>,
    messages: HashMap<ConversationId, Vec<StoredMessage>>,
    last_message_id: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryChatStore {
    tables: Mutex<ChatTables>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<std::sync::MutexGuard<'_, ChatTables>, ChatError> {
        self.tables
            .lock()
            .map_err(|_| ChatError::store("chat store lock poisoned"))
    }
}

impl MessageStore for InMemoryChatStore {
    fn append<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        message: NewMessage,
    ) -> ChatFuture<'a, Result<StoredMessage, ChatError>> {
        Box::pin(async move {
            let mut tables = self.tables()?;
            if !tables.conversations.contains_key(conversation_id) {
                return Err(ChatError::not_found(format!(
                    "conversation '{conversation_id}' not found"
                )));
            }

            tables.last_message_id += 1;
            let stored = StoredMessage {
                id: MessageId::new(tables.last_message_id),
                conversation_id: conversation_id.clone(),
                role: message.role,
                content: message.content,
                created_at: message.created_at.unwrap_or_else(SystemTime::now),
            };
            tables
                .messages
                .entry(conversation_id.clone())
                .or_default()
                .push(stored.clone());

            Ok(stored)
        })
    }

    fn list_ordered<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Vec<StoredMessage>, ChatError>> {
        Box::pin(async move {
            let tables = self.tables()?;
            let mut messages = tables
                .messages
                .get(conversation_id)
                .cloned()
                .unwrap_or_default();
            sort_messages(&mut messages);
            Ok(messages)
        })
    }
}

impl ConversationStore for InMemoryChatStore {
    fn create<'a>(
        &'a self,
        conversation: NewConversation,
    ) -> ChatFuture<'a, Result<Conversation, ChatError>> {
        Box::pin(async move {
            let mut tables = self.tables()?;
            let now = SystemTime::now();
            let created = Conversation {
                id: new_conversation_id(),
                user: conversation.user,
                model_identifier: conversation.model_identifier,
                title: conversation.title,
                created_at: now,
                updated_at: now,
            };
            tables
                .conversations
                .insert(created.id.clone(), created.clone());
            Ok(created)
        })
    }

    fn get<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move { Ok(self.tables()?.conversations.get(id).cloned()) })
    }

    fn list_for_user<'a>(
        &'a self,
        user: &'a UserId,
    ) -> ChatFuture<'a, Result<Vec<Conversation>, ChatError>> {
        Box::pin(async move {
            let tables = self.tables()?;
            let mut owned = tables
                .conversations
                .values()
                .filter(|conversation| conversation.is_owned_by(user))
                .cloned()
                .collect::<Vec<_>>();
            owned.sort_by(|left, right| {
                right
                    .updated_at
                    .cmp(&left.updated_at)
                    .then_with(|| right.created_at.cmp(&left.created_at))
            });
            Ok(owned)
        })
    }

    fn rename<'a>(
        &'a self,
        id: &'a ConversationId,
        title: String,
    ) -> ChatFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move {
            let mut tables = self.tables()?;
            Ok(tables.conversations.get_mut(id).map(|conversation| {
                conversation.title = title;
                conversation.clone()
            }))
        })
    }

    fn touch_updated_at<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut tables = self.tables()?;
            let conversation = tables
                .conversations
                .get_mut(id)
                .ok_or_else(|| ChatError::not_found(format!("conversation '{id}' not found")))?;
            conversation.updated_at = SystemTime::now().max(conversation.updated_at);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a ConversationId) -> ChatFuture<'a, Result<bool, ChatError>> {
        Box::pin(async move {
            let mut tables = self.tables()?;
            tables.messages.remove(id);
            Ok(tables.conversations.remove(id).is_some())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pprovider::Role;

    use super::*;
    use crate::ChatErrorKind;

    async fn conversation(store: &InMemoryChatStore, user: &str) -> Conversation {
        store
            .create(NewConversation::new(UserId::new(user), "openai_gpt-4", "Chat"))
            .await
            .expect("create should succeed")
    }

    #[tokio::test]
    async fn list_ordered_sorts_by_created_at_then_id() {
        let store = InMemoryChatStore::new();
        let conversation = conversation(&store, "alice").await;
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        for (content, offset) in [("third", 30), ("first", 10), ("tie-a", 20), ("tie-b", 20)] {
            store
                .append(
                    &conversation.id,
                    NewMessage::user(content).at(base + Duration::from_secs(offset)),
                )
                .await
                .expect("append should succeed");
        }

        let ordered = store
            .list_ordered(&conversation.id)
            .await
            .expect("list should succeed");
        let contents = ordered
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>();
        assert_eq!(contents, vec!["first", "tie-a", "tie-b", "third"]);
        assert!(ordered.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn append_to_unknown_conversation_is_not_found() {
        let store = InMemoryChatStore::new();
        let error = store
            .append(&ConversationId::new("missing"), NewMessage::user("hi"))
            .await
            .expect_err("unknown conversation should fail");
        assert_eq!(error.kind, ChatErrorKind::NotFound);
    }

    #[tokio::test]
    async fn delete_cascades_to_messages() {
        let store = InMemoryChatStore::new();
        let conversation = conversation(&store, "alice").await;
        store
            .append(&conversation.id, NewMessage::new(Role::User, "hi"))
            .await
            .expect("append should succeed");

        assert!(store.delete(&conversation.id).await.expect("delete"));
        assert!(store.get(&conversation.id).await.expect("get").is_none());
        assert!(
            store
                .list_ordered(&conversation.id)
                .await
                .expect("list")
                .is_empty()
        );
        assert!(!store.delete(&conversation.id).await.expect("delete"));
    }

    #[tokio::test]
    async fn list_for_user_is_scoped_and_most_recent_first() {
        let store = InMemoryChatStore::new();
        let older = conversation(&store, "alice").await;
        let newer = conversation(&store, "alice").await;
        conversation(&store, "bob").await;

        tokio::time::sleep(Duration::from_millis(5)).await;
        store.touch_updated_at(&older.id).await.expect("touch");

        let listed = store
            .list_for_user(&UserId::new("alice"))
            .await
            .expect("list should succeed");
        assert_eq!(
            listed.iter().map(|c| c.id.clone()).collect::<Vec<_>>(),
            vec![older.id, newer.id]
        );
    }

    #[tokio::test]
    async fn rename_updates_title() {
        let store = InMemoryChatStore::new();
        let conversation = conversation(&store, "alice").await;

        let renamed = store
            .rename(&conversation.id, "Trip planning".to_string())
            .await
            .expect("rename should succeed")
            .expect("conversation exists");
        assert_eq!(renamed.title, "Trip planning");
        assert!(
            store
                .rename(&ConversationId::new("missing"), "x".to_string())
                .await
                .expect("rename should succeed")
                .is_none()
        );
    }
}
