//! Conversation, message, and turn types.

use std::time::SystemTime;

use pcommon::{ConversationId, MessageId, UserId};
use pprovider::{Diagnostic, Message, ProviderErrorKind, Role};

/// Notice returned when the provider answered without any text.
pub const AI_ABSENT_NOTICE: &str = "AI did not return a response.";

/// Message shown for failures that are not the provider's fault.
pub const INTERNAL_FAILURE_MESSAGE: &str = "An unexpected server error occurred.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub user: UserId,
    pub model_identifier: String,
    pub title: String,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl Conversation {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user == user
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversation {
    pub user: UserId,
    pub model_identifier: String,
    pub title: String,
}

impl NewConversation {
    pub fn new(
        user: UserId,
        model_identifier: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            user,
            model_identifier: model_identifier.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub created_at: SystemTime,
}

impl StoredMessage {
    pub fn to_message(&self) -> Message {
        Message::new(self.role, self.content.clone())
    }
}

/// Message waiting to be appended. `created_at` defaults to the time of the append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub role: Role,
    pub content: String,
    pub created_at: Option<SystemTime>,
}

impl NewMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn at(mut self, created_at: SystemTime) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationDetail {
    pub conversation: Conversation,
    pub messages: Vec<StoredMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub user: UserId,
    pub conversation_id: ConversationId,
    pub content: String,
}

impl TurnRequest {
    pub fn new(user: UserId, conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self {
            user,
            conversation_id,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Received,
    UserPersisted,
    HistoryLoaded,
    Completing,
    Completed,
    AiAbsent,
    Failed,
}

impl TurnState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::AiAbsent | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::UserPersisted => "user_persisted",
            Self::HistoryLoaded => "history_loaded",
            Self::Completing => "completing",
            Self::Completed => "completed",
            Self::AiAbsent => "ai_absent",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The provider could not be reached, refused the call, or answered unusably.
    ServiceUnavailable,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnFailure {
    pub class: FailureClass,
    /// Text safe to show to the user.
    pub message: String,
    /// Underlying error, for logs.
    pub detail: String,
    pub provider_error: Option<ProviderErrorKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed {
        user_message: StoredMessage,
        assistant_message: StoredMessage,
    },
    AiAbsent {
        user_message: StoredMessage,
        notice: String,
    },
    Failed {
        user_message: StoredMessage,
        failure: TurnFailure,
    },
}

impl TurnOutcome {
    pub fn user_message(&self) -> &StoredMessage {
        match self {
            Self::Completed { user_message, .. }
            | Self::AiAbsent { user_message, .. }
            | Self::Failed { user_message, .. } => user_message,
        }
    }

    pub fn state(&self) -> TurnState {
        match self {
            Self::Completed { .. } => TurnState::Completed,
            Self::AiAbsent { .. } => TurnState::AiAbsent,
            Self::Failed { .. } => TurnState::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub conversation_id: ConversationId,
    pub outcome: TurnOutcome,
    /// Every state the turn passed through, in order.
    pub states: Vec<TurnState>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TurnReport {
    pub fn state(&self) -> TurnState {
        self.outcome.state()
    }
}
