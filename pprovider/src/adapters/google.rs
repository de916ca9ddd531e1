//! Gemini `generateContent`: alternating user/model turns, no system role.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Completion, Diagnostic, Formatted, HttpRequest, Message, ProviderError, Role, SecretString,
};

pub const GOOGLE_GENERATE_CONTENT_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GooglePart {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoogleContent {
    pub role: &'static str,
    pub parts: Vec<GooglePart>,
}

impl GoogleContent {
    fn new(role: &'static str, text: &str) -> Self {
        Self {
            role,
            parts: vec![GooglePart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoogleBody {
    pub contents: Vec<GoogleContent>,
}

impl GoogleBody {
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}

const USER: &str = "user";
const MODEL: &str = "model";

pub fn format_messages(history: &[Message]) -> Formatted<GoogleBody> {
    let mut contents: Vec<GoogleContent> = Vec::with_capacity(history.len());
    let mut diagnostics = Vec::new();

    for (index, message) in history.iter().enumerate() {
        match message.role {
            Role::User => contents.push(GoogleContent::new(USER, &message.content)),
            Role::Assistant => match contents.last().map(|content| content.role) {
                Some(USER) => contents.push(GoogleContent::new(MODEL, &message.content)),
                Some(_) => {
                    tracing::warn!(
                        provider = "google",
                        index,
                        "merging consecutive assistant messages"
                    );
                    if let Some(part) = contents
                        .last_mut()
                        .and_then(|last| last.parts.first_mut())
                    {
                        part.text.push('\n');
                        part.text.push_str(&message.content);
                    }
                    diagnostics.push(Diagnostic::ConsecutiveAssistantMerged { index });
                }
                None => {
                    tracing::warn!(
                        provider = "google",
                        index,
                        "skipping assistant message with no preceding user turn"
                    );
                    diagnostics.push(Diagnostic::AssistantWithoutPrompt { index });
                }
            },
            Role::System => {
                tracing::warn!(provider = "google", index, "dropping system message");
                diagnostics.push(Diagnostic::SystemMessageDropped { index });
            }
        }
    }

    if contents.last().map(|content| content.role) == Some(MODEL) {
        tracing::warn!(provider = "google", "history ends on a model turn");
        diagnostics.push(Diagnostic::EndsOnModelTurn);
    }

    Formatted::with_diagnostics(GoogleBody { contents }, diagnostics)
}

pub fn build_request(
    model: &str,
    api_key: &SecretString,
    body: &GoogleBody,
) -> Result<HttpRequest, ProviderError> {
    let payload = serde_json::to_value(body)
        .map_err(|err| ProviderError::other(format!("could not encode google payload: {err}")))?;
    // Catalog model names are the API's model names.
    let url = GOOGLE_GENERATE_CONTENT_URL.replace("{model}", model);

    Ok(HttpRequest::new(url, payload).with_header("x-goog-api-key", api_key.expose()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleApiResponse {
    candidates: Option<Vec<GoogleApiCandidate>>,
    error: Option<GoogleApiError>,
    prompt_feedback: Option<GoogleApiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GoogleApiError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleApiPromptFeedback {
    block_reason: Option<String>,
    safety_ratings: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleApiCandidate {
    finish_reason: Option<String>,
    safety_ratings: Option<Value>,
    content: Option<GoogleApiContent>,
}

#[derive(Debug, Deserialize)]
struct GoogleApiContent {
    #[serde(default)]
    parts: Vec<GoogleApiPart>,
}

#[derive(Debug, Deserialize)]
struct GoogleApiPart {
    text: Option<String>,
}

fn ratings_text(ratings: Option<Value>) -> String {
    ratings.unwrap_or_else(|| Value::Array(Vec::new())).to_string()
}

pub fn parse_response(response: Value) -> Result<Completion, ProviderError> {
    let parsed: GoogleApiResponse = serde_json::from_value(response.clone())
        .map_err(|err| malformed(&response, &err.to_string()))?;

    let candidate = match parsed.candidates.and_then(|c| c.into_iter().next()) {
        Some(candidate) => candidate,
        None => {
            let mut message = parsed.error.and_then(|error| error.message).unwrap_or_else(|| {
                "Unknown Google API error, response did not contain candidates.".to_string()
            });
            if let Some(feedback) = parsed.prompt_feedback
                && let Some(reason) = feedback.block_reason
            {
                message.push_str(&format!(" Blocked due to: {reason}."));
                message.push_str(&format!(
                    " Safety Ratings: {}",
                    ratings_text(feedback.safety_ratings)
                ));
            }
            tracing::error!(provider = "google", error = %message, "provider reported an error");
            return Err(ProviderError::provider_reported(format!(
                "Google API Error: {message}"
            )));
        }
    };

    let mut diagnostics = Vec::new();
    match candidate.finish_reason.as_deref() {
        None | Some("STOP") | Some("MAX_TOKENS") => {}
        Some("SAFETY") => {
            let ratings = ratings_text(candidate.safety_ratings);
            tracing::warn!(provider = "google", ratings = %ratings, "response blocked for safety");
            return Err(ProviderError::safety_blocked(format!(
                "Google API response blocked due to safety concerns. Ratings: {ratings}"
            )));
        }
        Some(reason) => {
            tracing::warn!(provider = "google", finish_reason = reason, "unusual finish reason");
            diagnostics.push(Diagnostic::UnusualFinishReason {
                reason: reason.to_string(),
            });
        }
    }

    let content = candidate
        .content
        .ok_or_else(|| malformed(&response, "candidate without content"))?;
    let text = content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect::<Vec<_>>()
        .join("\n");

    Ok(Completion {
        text: Some(text),
        diagnostics,
    })
}

fn malformed(response: &Value, reason: &str) -> ProviderError {
    tracing::error!(provider = "google", reason, response = %response, "could not parse response");
    ProviderError::malformed_response("Failed to parse response from Google API.")
}
