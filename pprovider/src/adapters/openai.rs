//! OpenAI chat completions: flat `{role, content}` list, bearer auth.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Completion, Formatted, HttpRequest, Message, ProviderError, SecretString};

pub const OPENAI_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenAiMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenAiBody {
    pub messages: Vec<OpenAiMessage>,
}

impl OpenAiBody {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct OpenAiApiRequest<'a> {
    model: &'a str,
    messages: &'a [OpenAiMessage],
}

pub fn format_messages(history: &[Message]) -> Formatted<OpenAiBody> {
    let messages = history
        .iter()
        .map(|message| OpenAiMessage {
            role: message.role.as_str(),
            content: message.content.clone(),
        })
        .collect();

    Formatted::new(OpenAiBody { messages })
}

pub fn build_request(
    model: &str,
    api_key: &SecretString,
    body: &OpenAiBody,
) -> Result<HttpRequest, ProviderError> {
    let payload = serde_json::to_value(OpenAiApiRequest {
        model,
        messages: &body.messages,
    })
    .map_err(|err| ProviderError::other(format!("could not encode openai payload: {err}")))?;

    Ok(HttpRequest::new(OPENAI_CHAT_COMPLETIONS_URL, payload)
        .with_header("Authorization", format!("Bearer {}", api_key.expose())))
}

#[derive(Debug, Deserialize)]
struct OpenAiApiResponse {
    error: Option<OpenAiApiError>,
    choices: Option<Vec<OpenAiApiChoice>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiApiError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiApiChoice {
    message: OpenAiApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiApiChoiceMessage {
    content: Option<String>,
}

pub fn parse_response(response: Value) -> Result<Completion, ProviderError> {
    let parsed: OpenAiApiResponse = serde_json::from_value(response.clone()).map_err(|err| {
        malformed(&response, &err.to_string())
    })?;

    if let Some(error) = parsed.error {
        let message = error.message.unwrap_or_else(|| "Unknown error".to_string());
        tracing::error!(provider = "openai", error = %message, "provider reported an error");
        return Err(ProviderError::provider_reported(format!(
            "OpenAI API Error: {message}"
        )));
    }

    let choice = parsed
        .choices
        .and_then(|choices| choices.into_iter().next())
        .ok_or_else(|| malformed(&response, "no choices"))?;

    Ok(Completion {
        text: choice.message.content,
        diagnostics: Vec::new(),
    })
}

fn malformed(response: &Value, reason: &str) -> ProviderError {
    tracing::error!(provider = "openai", reason, response = %response, "could not parse response");
    ProviderError::malformed_response("Failed to parse response from OpenAI API.")
}
