//! Small convenience constructors for common types.

use crate::{ConversationId, Message, ProviderId, Role, TurnRequest, UserId};

pub fn system_message(content: impl Into<String>) -> Message {
    Message::new(Role::System, content)
}

pub fn user_message(content: impl Into<String>) -> Message {
    Message::new(Role::User, content)
}

pub fn assistant_message(content: impl Into<String>) -> Message {
    Message::new(Role::Assistant, content)
}

pub fn turn(
    user: impl Into<UserId>,
    conversation_id: impl Into<ConversationId>,
    content: impl Into<String>,
) -> TurnRequest {
    TurnRequest::new(user.into(), conversation_id.into(), content)
}

pub fn parse_provider_id(value: &str) -> Option<ProviderId> {
    match value.trim().to_ascii_lowercase().as_str() {
        "openai" | "open-ai" | "gpt" => Some(ProviderId::OpenAi),
        "anthropic" | "claude" => Some(ProviderId::Anthropic),
        "google" | "gemini" => Some(ProviderId::Google),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::{ProviderId, Role};

    use super::{parse_provider_id, turn, user_message};

    #[test]
    fn parse_provider_id_supports_aliases() {
        assert_eq!(parse_provider_id("openai"), Some(ProviderId::OpenAi));
        assert_eq!(parse_provider_id("Claude"), Some(ProviderId::Anthropic));
        assert_eq!(parse_provider_id(" gemini "), Some(ProviderId::Google));
        assert_eq!(parse_provider_id("ollama"), None);
    }

    #[test]
    fn message_and_turn_helpers_fill_fields() {
        let message = user_message("hello");
        assert_eq!(message.role, Role::User);

        let request = turn("alice", "conv-1", "hello");
        assert_eq!(request.user.as_str(), "alice");
        assert_eq!(request.conversation_id.as_str(), "conv-1");
        assert_eq!(request.content, "hello");
    }
}
