//! Conversational orchestration over model providers.
//!
//! ```rust
//! use pchat::{ChatPolicy, TurnState};
//!
//! let policy = ChatPolicy::default();
//! assert!(policy.serialize_turns);
//! assert!(TurnState::AiAbsent.is_terminal());
//! assert!(!TurnState::Completing.is_terminal());
//! ```

mod error;
mod hooks;
mod service;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, ChatPolicy, ChatService, ChatServiceBuilder, Conversation,
        ConversationDetail, ConversationStore, FailureClass, InMemoryChatStore, MessageStore,
        NewMessage, StoredMessage, TurnFailure, TurnHooks, TurnOutcome, TurnReport, TurnRequest,
        TurnState,
    };
    pub use pcommon::{ConversationId, MessageId, UserId};
}

pub use error::{ChatError, ChatErrorKind};
pub use hooks::{NoopTurnHooks, TurnHooks};
pub use service::{ChatPolicy, ChatService, ChatServiceBuilder};
pub use store::{
    ChatFuture, ConversationStore, InMemoryChatStore, MessageStore, new_conversation_id,
};
pub use types::{
    AI_ABSENT_NOTICE, Conversation, ConversationDetail, FailureClass, INTERNAL_FAILURE_MESSAGE,
    NewConversation, NewMessage, StoredMessage, TurnFailure, TurnOutcome, TurnReport,
    TurnRequest, TurnState,
};
pub use pcommon::{ConversationId, MessageId, UserId};
