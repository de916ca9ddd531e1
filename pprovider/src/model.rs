//! Provider-agnostic roles, messages, provider ids, and model identifiers.
//!
//! ```rust
//! use pprovider::{ModelIdentifier, ProviderId, ProviderErrorKind};
//!
//! let model = ModelIdentifier::parse("openai_gpt-4").expect("identifier should parse");
//! assert_eq!(model.provider(), ProviderId::OpenAi);
//! assert_eq!(model.model_name(), "gpt-4");
//!
//! let err = ModelIdentifier::parse("mistral_large").expect_err("unknown service");
//! assert_eq!(err.kind, ProviderErrorKind::Configuration);
//! ```

use std::fmt::{Display, Formatter};

use crate::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Google,
}

impl ProviderId {
    pub const ALL: [ProviderId; 3] = [Self::OpenAi, Self::Anthropic, Self::Google];

    /// Service token used in model identifiers and credential records.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Google => "Google Gemini",
        }
    }

    /// Name of the process-wide setting holding the shared key, e.g. `OPENAI_API_KEY`.
    pub fn system_key_var(self) -> String {
        format!("{}_API_KEY", self.as_str().to_ascii_uppercase())
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "openai" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            "google" => Some(Self::Google),
            _ => None,
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
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
}

/// `<provider>_<model-name>`, split on the first underscore.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelIdentifier {
    raw: String,
    provider: ProviderId,
    model_name: String,
}

impl ModelIdentifier {
    pub const SEPARATOR: char = '_';

    pub fn parse(raw: impl Into<String>) -> Result<Self, ProviderError> {
        let raw = raw.into();
        let (token, model_name) = match raw.split_once(Self::SEPARATOR) {
            Some((token, model_name)) => (token, model_name),
            None => (raw.as_str(), ""),
        };

        let provider = ProviderId::from_token(token).ok_or_else(|| {
            ProviderError::configuration(format!("Unsupported AI service: {token}"))
        })?;

        if model_name.trim().is_empty() {
            return Err(ProviderError::configuration(format!(
                "model identifier '{raw}' does not name a model"
            )));
        }

        let model_name = model_name.to_string();
        Ok(Self {
            raw,
            provider,
            model_name,
        })
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Display for ModelIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChoice {
    pub identifier: String,
    pub display_name: String,
}

impl ModelChoice {
    pub fn new(identifier: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: display_name.into(),
        }
    }
}

/// Selectable models offered to users when they open a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    choices: Vec<ModelChoice>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(vec![
            ModelChoice::new("openai_gpt-3.5-turbo", "OpenAI GPT-3.5 Turbo"),
            ModelChoice::new("openai_gpt-4", "OpenAI GPT-4"),
            ModelChoice::new("openai_gpt-4-turbo", "OpenAI GPT-4 Turbo"),
            ModelChoice::new("anthropic_claude-3-opus", "Anthropic Claude 3 Opus"),
            ModelChoice::new("anthropic_claude-3-sonnet", "Anthropic Claude 3 Sonnet"),
            ModelChoice::new("anthropic_claude-3-haiku", "Anthropic Claude 3 Haiku"),
            ModelChoice::new("google_gemini-pro", "Google Gemini Pro"),
            ModelChoice::new(
                "google_gemini-2.5-pro-preview-03-25",
                "google_gemini-2.5-pro-preview-03-25",
            ),
            ModelChoice::new("google_gemini-2.0-flash", "Gemini 2.0 Flash"),
        ])
    }
}

impl ModelCatalog {
    pub fn new(choices: Vec<ModelChoice>) -> Self {
        Self { choices }
    }

    pub fn with_choice(mut self, choice: ModelChoice) -> Self {
        self.choices.retain(|item| item.identifier != choice.identifier);
        self.choices.push(choice);
        self
    }

    pub fn choices(&self) -> &[ModelChoice] {
        &self.choices
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.choices.iter().any(|item| item.identifier == identifier)
    }

    pub fn display_name(&self, identifier: &str) -> Option<&str> {
        self.choices
            .iter()
            .find(|item| item.identifier == identifier)
            .map(|item| item.display_name.as_str())
    }

    /// Parses `identifier` and checks that it is one of the offered choices.
    pub fn validate(&self, identifier: &str) -> Result<ModelIdentifier, ProviderError> {
        if !self.contains(identifier) {
            return Err(ProviderError::invalid_request(format!(
                "'{identifier}' is not a supported model"
            )));
        }

        ModelIdentifier::parse(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn provider_id_tokens_are_stable() {
        assert_eq!(ProviderId::OpenAi.to_string(), "openai");
        assert_eq!(ProviderId::Anthropic.to_string(), "anthropic");
        assert_eq!(ProviderId::Google.to_string(), "google");
        assert_eq!(ProviderId::from_token("google"), Some(ProviderId::Google));
        assert_eq!(ProviderId::from_token("OpenAI"), None);
    }

    #[test]
    fn system_key_var_uses_upper_case_service_name() {
        assert_eq!(ProviderId::OpenAi.system_key_var(), "OPENAI_API_KEY");
        assert_eq!(ProviderId::Anthropic.system_key_var(), "ANTHROPIC_API_KEY");
        assert_eq!(ProviderId::Google.system_key_var(), "GOOGLE_API_KEY");
    }

    #[test]
    fn model_identifier_splits_on_first_separator_only() {
        let model = ModelIdentifier::parse("google_gemini-2.5-pro_preview")
            .expect("identifier should parse");
        assert_eq!(model.provider(), ProviderId::Google);
        assert_eq!(model.model_name(), "gemini-2.5-pro_preview");
        assert_eq!(model.as_str(), "google_gemini-2.5-pro_preview");
    }

    #[test]
    fn model_identifier_rejects_unknown_service_and_missing_model() {
        let unknown = ModelIdentifier::parse("cohere_command").expect_err("unknown service");
        assert_eq!(unknown.kind, ProviderErrorKind::Configuration);
        assert_eq!(unknown.message, "Unsupported AI service: cohere");

        let missing = ModelIdentifier::parse("openai").expect_err("missing model");
        assert_eq!(missing.kind, ProviderErrorKind::Configuration);

        let trailing = ModelIdentifier::parse("openai_").expect_err("empty model");
        assert_eq!(trailing.kind, ProviderErrorKind::Configuration);
    }

    #[test]
    fn role_parse_round_trips_closed_set() {
        for role in [Role::System, Role::User, Role::Assistant] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("tool"), None);
    }

    #[test]
    fn catalog_validates_and_names_models() {
        let catalog = ModelCatalog::default();
        assert_eq!(catalog.display_name("openai_gpt-4"), Some("OpenAI GPT-4"));
        assert!(catalog.validate("anthropic_claude-3-haiku").is_ok());

        let err = catalog
            .validate("openai_gpt-5")
            .expect_err("model outside catalog should fail");
        assert_eq!(err.kind, ProviderErrorKind::InvalidRequest);

        let extended = catalog.with_choice(ModelChoice::new("openai_gpt-5", "OpenAI GPT-5"));
        assert!(extended.contains("openai_gpt-5"));
    }
}
