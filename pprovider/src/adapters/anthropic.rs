//! Anthropic messages API: system prompt split out, history must open with a user turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Completion, Diagnostic, Formatted, HttpRequest, Message, ProviderError, Role, SecretString,
};

pub const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const ANTHROPIC_MAX_TOKENS: u32 = 1024;

/// What to do when the history does not open with a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencePolicy {
    /// Log, record [`Diagnostic::FirstMessageNotUser`], and send anyway.
    #[default]
    Warn,
    /// Fail the call with `InvalidRequest` before anything is sent.
    Reject,
}

impl SequencePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "warn" => Some(Self::Warn),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnthropicMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnthropicBody {
    pub system: Option<String>,
    pub messages: Vec<AnthropicMessage>,
}

impl AnthropicBody {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug, Serialize)]
struct AnthropicApiRequest<'a> {
    model: &'a str,
    messages: &'a [AnthropicMessage],
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

pub fn format_messages(
    history: &[Message],
    policy: SequencePolicy,
) -> Result<Formatted<AnthropicBody>, ProviderError> {
    let mut system = None;
    let mut messages = Vec::with_capacity(history.len());
    let mut diagnostics = Vec::new();

    for (index, message) in history.iter().enumerate() {
        match message.role {
            Role::System if system.is_none() => system = Some(message.content.clone()),
            Role::System => {
                tracing::warn!(provider = "anthropic", index, "ignoring extra system message");
                diagnostics.push(Diagnostic::ExtraSystemMessageIgnored { index });
            }
            Role::User | Role::Assistant => messages.push(AnthropicMessage {
                role: message.role.as_str(),
                content: message.content.clone(),
            }),
        }
    }

    if messages.first().map(|message| message.role) != Some(Role::User.as_str()) {
        if policy == SequencePolicy::Reject {
            return Err(ProviderError::invalid_request(
                "Anthropic requires the first message to be from 'user'.",
            ));
        }
        tracing::warn!(
            provider = "anthropic",
            "first message is not from 'user', sending anyway"
        );
        diagnostics.push(Diagnostic::FirstMessageNotUser);
    }

    let system = system.filter(|prompt: &String| !prompt.is_empty());
    Ok(Formatted::with_diagnostics(
        AnthropicBody { system, messages },
        diagnostics,
    ))
}

pub fn build_request(
    model: &str,
    api_key: &SecretString,
    body: &AnthropicBody,
) -> Result<HttpRequest, ProviderError> {
    let payload = serde_json::to_value(AnthropicApiRequest {
        model,
        messages: &body.messages,
        max_tokens: ANTHROPIC_MAX_TOKENS,
        system: body.system.as_deref(),
    })
    .map_err(|err| ProviderError::other(format!("could not encode anthropic payload: {err}")))?;

    Ok(HttpRequest::new(ANTHROPIC_MESSAGES_URL, payload)
        .with_header("x-api-key", api_key.expose())
        .with_header("anthropic-version", ANTHROPIC_VERSION))
}

#[derive(Debug, Deserialize)]
struct AnthropicApiResponse {
    #[serde(rename = "type")]
    kind: Option<String>,
    error: Option<AnthropicApiError>,
    content: Option<Vec<AnthropicApiContentBlock>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicApiError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicApiContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

pub fn parse_response(response: Value) -> Result<Completion, ProviderError> {
    let parsed: AnthropicApiResponse = serde_json::from_value(response.clone())
        .map_err(|err| malformed(&response, &err.to_string()))?;

    if parsed.kind.as_deref() == Some("error") {
        let message = parsed
            .error
            .and_then(|error| error.message)
            .unwrap_or_else(|| "Unknown error".to_string());
        tracing::error!(provider = "anthropic", error = %message, "provider reported an error");
        return Err(ProviderError::provider_reported(format!(
            "Anthropic API Error: {message}"
        )));
    }

    let block = parsed
        .content
        .and_then(|blocks| blocks.into_iter().next())
        .ok_or_else(|| malformed(&response, "no content blocks"))?;

    if block.kind != "text" {
        tracing::warn!(
            provider = "anthropic",
            block_type = %block.kind,
            "unexpected content block type"
        );
        return Ok(Completion::absent().with_diagnostic(Diagnostic::UnexpectedContentBlock {
            block_type: block.kind,
        }));
    }

    let text = block
        .text
        .ok_or_else(|| malformed(&response, "text block without text"))?;
    Ok(Completion::text(text))
}

fn malformed(response: &Value, reason: &str) -> ProviderError {
    tracing::error!(provider = "anthropic", reason, response = %response, "could not parse response");
    ProviderError::malformed_response("Failed to parse response from Anthropic API.")
}
