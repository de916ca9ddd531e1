//! Turn orchestration and conversation management.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use pcommon::{ConversationId, UserId};
use pprovider::{ClientFactory, ModelCatalog, ProviderError, ProviderErrorKind};
use tokio::sync::OwnedMutexGuard;

use crate::{
    AI_ABSENT_NOTICE, ChatError, Conversation, ConversationDetail, ConversationStore,
    FailureClass, INTERNAL_FAILURE_MESSAGE, MessageStore, NewConversation, NewMessage,
    NoopTurnHooks, StoredMessage, TurnFailure, TurnHooks, TurnOutcome, TurnReport, TurnRequest,
    TurnState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatPolicy {
    /// Run at most one turn per conversation at a time.
    pub serialize_turns: bool,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            serialize_turns: true,
        }
    }
}

impl ChatPolicy {
    pub fn with_serialize_turns(mut self, serialize_turns: bool) -> Self {
        self.serialize_turns = serialize_turns;
        self
    }
}

#[derive(Debug, Default)]
struct TurnLocks {
    locks: Mutex<HashMap<ConversationId, Arc<tokio::sync::Mutex<()>>>>,
}

impl TurnLocks {
    async fn acquire(&self, id: &ConversationId) -> Result<OwnedMutexGuard<()>, ChatError> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| ChatError::store("turn lock table poisoned"))?;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(id.clone()).or_default().clone()
        };

        Ok(lock.lock_owned().await)
    }
}

pub struct ChatServiceBuilder {
    factory: ClientFactory,
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    catalog: ModelCatalog,
    hooks: Arc<dyn TurnHooks>,
    policy: ChatPolicy,
}

impl ChatServiceBuilder {
    pub fn new(
        factory: ClientFactory,
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        Self {
            factory,
            conversations,
            messages,
            catalog: ModelCatalog::default(),
            hooks: Arc::new(NoopTurnHooks),
            policy: ChatPolicy::default(),
        }
    }

    pub fn catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn TurnHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn policy(mut self, policy: ChatPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> ChatService {
        ChatService {
            factory: self.factory,
            conversations: self.conversations,
            messages: self.messages,
            catalog: self.catalog,
            hooks: self.hooks,
            policy: self.policy,
            turn_locks: Arc::new(TurnLocks::default()),
        }
    }
}

#[derive(Clone)]
pub struct ChatService {
    factory: ClientFactory,
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    catalog: ModelCatalog,
    hooks: Arc<dyn TurnHooks>,
    policy: ChatPolicy,
    turn_locks: Arc<TurnLocks>,
}

impl ChatService {
    pub fn builder(
        factory: ClientFactory,
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
    ) -> ChatServiceBuilder {
        ChatServiceBuilder::new(factory, conversations, messages)
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn policy(&self) -> ChatPolicy {
        self.policy
    }

    /// Runs one chat turn.
    ///
    /// Returns `Err` only when the turn is rejected before the user message is stored:
    /// empty content, or a conversation the user does not own. Once the user message is
    /// stored every path returns a [`TurnReport`].
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnReport, ChatError> {
        let started = Instant::now();
        let TurnRequest {
            user,
            conversation_id,
            content,
        } = request;

        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::invalid_request("message content must not be empty"));
        }

        let conversation = self.owned_conversation(&user, &conversation_id).await?;
        let _turn_guard = if self.policy.serialize_turns {
            Some(self.turn_locks.acquire(&conversation.id).await?)
        } else {
            None
        };

        let user_message = self
            .messages
            .append(&conversation.id, NewMessage::user(content))
            .await?;

        // Hooks see only turns that will reach `on_turn_finish`.
        self.hooks
            .on_turn_start(&conversation.id, &conversation.model_identifier);
        let mut turn = TurnProgress::new(self.hooks.as_ref(), &conversation.id);
        turn.advance(TurnState::UserPersisted);

        let outcome = self.complete_turn(&user, &conversation, user_message, &mut turn).await;
        let report = turn.finish(outcome);

        if let TurnOutcome::Failed { failure, .. } = &report.outcome {
            tracing::error!(
                conversation_id = %conversation.id,
                model = %conversation.model_identifier,
                failure_class = ?failure.class,
                error = %failure.detail,
                "chat turn failed"
            );
        }

        self.hooks
            .on_turn_finish(&conversation.id, &report, started.elapsed());
        Ok(report)
    }

    async fn complete_turn(
        &self,
        user: &UserId,
        conversation: &Conversation,
        user_message: StoredMessage,
        turn: &mut TurnProgress<'_>,
    ) -> TurnOutcome {
        let history = match self.messages.list_ordered(&conversation.id).await {
            Ok(history) => history,
            Err(error) => return internal_failure(user_message, &error),
        };
        turn.advance(TurnState::HistoryLoaded);

        let client = match self
            .factory
            .create(user, &conversation.model_identifier)
            .await
        {
            Ok(client) => client,
            Err(error) => return provider_failure(user_message, &error),
        };

        turn.advance(TurnState::Completing);
        let history = history
            .iter()
            .map(StoredMessage::to_message)
            .collect::<Vec<_>>();
        let completion = match client.complete(&history).await {
            Ok(completion) => completion,
            Err(error) => return provider_failure(user_message, &error),
        };
        turn.diagnostics.extend(completion.diagnostics);

        let Some(text) = completion.text else {
            tracing::info!(conversation_id = %conversation.id, "provider returned no text");
            return TurnOutcome::AiAbsent {
                user_message,
                notice: AI_ABSENT_NOTICE.to_string(),
            };
        };

        let assistant_message = match self
            .messages
            .append(&conversation.id, NewMessage::assistant(text))
            .await
        {
            Ok(message) => message,
            Err(error) => return internal_failure(user_message, &error),
        };

        if let Err(error) = self.conversations.touch_updated_at(&conversation.id).await {
            tracing::warn!(
                conversation_id = %conversation.id,
                error = %error,
                "could not refresh conversation timestamp"
            );
        }

        TurnOutcome::Completed {
            user_message,
            assistant_message,
        }
    }

    pub async fn create_conversation(
        &self,
        user: &UserId,
        model_identifier: &str,
        title: Option<String>,
    ) -> Result<Conversation, ChatError> {
        self.catalog
            .validate(model_identifier)
            .map_err(|error| ChatError::invalid_request(error.message))?;

        let title = match title.map(|title| title.trim().to_string()) {
            Some(title) if !title.is_empty() => title,
            _ => format!(
                "Chat with {}",
                self.catalog.display_name(model_identifier).unwrap_or("AI")
            ),
        };

        let conversation = self
            .conversations
            .create(NewConversation::new(user.clone(), model_identifier, title))
            .await?;
        tracing::info!(
            conversation_id = %conversation.id,
            user = %user,
            model = model_identifier,
            "created conversation"
        );
        Ok(conversation)
    }

    pub async fn get_conversation(
        &self,
        user: &UserId,
        id: &ConversationId,
    ) -> Result<ConversationDetail, ChatError> {
        let conversation = self.owned_conversation(user, id).await?;
        let messages = self.messages.list_ordered(&conversation.id).await?;
        Ok(ConversationDetail {
            conversation,
            messages,
        })
    }

    pub async fn list_conversations(&self, user: &UserId) -> Result<Vec<Conversation>, ChatError> {
        self.conversations.list_for_user(user).await
    }

    pub async fn rename_conversation(
        &self,
        user: &UserId,
        id: &ConversationId,
        title: &str,
    ) -> Result<Conversation, ChatError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ChatError::invalid_request("title must not be empty"));
        }

        let conversation = self.owned_conversation(user, id).await?;
        self.conversations
            .rename(&conversation.id, title.to_string())
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn delete_conversation(
        &self,
        user: &UserId,
        id: &ConversationId,
    ) -> Result<(), ChatError> {
        let conversation = self.owned_conversation(user, id).await?;
        if !self.conversations.delete(&conversation.id).await? {
            return Err(not_found(id));
        }

        tracing::info!(conversation_id = %conversation.id, user = %user, "deleted conversation");
        Ok(())
    }

    async fn owned_conversation(
        &self,
        user: &UserId,
        id: &ConversationId,
    ) -> Result<Conversation, ChatError> {
        self.conversations
            .get(id)
            .await?
            .filter(|conversation| conversation.is_owned_by(user))
            .ok_or_else(|| not_found(id))
    }
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

struct TurnProgress<'a> {
    hooks: &'a dyn TurnHooks,
    conversation_id: &'a ConversationId,
    states: Vec<TurnState>,
    diagnostics: Vec<pprovider::Diagnostic>,
}

impl<'a> TurnProgress<'a> {
    fn new(hooks: &'a dyn TurnHooks, conversation_id: &'a ConversationId) -> Self {
        let mut progress = Self {
            hooks,
            conversation_id,
            states: Vec::new(),
            diagnostics: Vec::new(),
        };
        progress.advance(TurnState::Received);
        progress
    }

    fn advance(&mut self, state: TurnState) {
        self.states.push(state);
        self.hooks.on_state(self.conversation_id, state);
    }

    fn finish(mut self, outcome: TurnOutcome) -> TurnReport {
        self.advance(outcome.state());
        TurnReport {
            conversation_id: self.conversation_id.clone(),
            outcome,
            states: self.states,
            diagnostics: self.diagnostics,
        }
    }
}

fn not_found(id: &ConversationId) -> ChatError {
    ChatError::not_found(format!("conversation '{id}' not found"))
}

fn provider_failure(user_message: StoredMessage, error: &ProviderError) -> TurnOutcome {
    if error.kind == ProviderErrorKind::Other {
        return TurnOutcome::Failed {
            user_message,
            failure: TurnFailure {
                class: FailureClass::Internal,
                message: INTERNAL_FAILURE_MESSAGE.to_string(),
                detail: error.to_string(),
                provider_error: Some(error.kind),
            },
        };
    }

    TurnOutcome::Failed {
        user_message,
        failure: TurnFailure {
            class: FailureClass::ServiceUnavailable,
            message: format!("Failed to get response from AI service: {}", error.message),
            detail: error.to_string(),
            provider_error: Some(error.kind),
        },
    }
}

fn internal_failure(user_message: StoredMessage, error: &ChatError) -> TurnOutcome {
    TurnOutcome::Failed {
        user_message,
        failure: TurnFailure {
            class: FailureClass::Internal,
            message: INTERNAL_FAILURE_MESSAGE.to_string(),
            detail: error.to_string(),
            provider_error: None,
        },
    }
}
