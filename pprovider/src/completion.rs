//! Formatter output, parse output, and the anomalies both may tolerate.

use std::fmt::{Display, Formatter};

/// Anomaly that was logged and tolerated while shaping a request or reading a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Anthropic history does not open with a user message.
    FirstMessageNotUser,
    /// Anthropic accepts one system prompt; this one came later and was left out.
    ExtraSystemMessageIgnored { index: usize },
    /// Google has no system role.
    SystemMessageDropped { index: usize },
    ConsecutiveAssistantMerged { index: usize },
    AssistantWithoutPrompt { index: usize },
    EndsOnModelTurn,
    UnexpectedContentBlock { block_type: String },
    UnusualFinishReason { reason: String },
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstMessageNotUser => f.write_str("first message is not from the user"),
            Self::ExtraSystemMessageIgnored { index } => {
                write!(f, "system message at {index} ignored")
            }
            Self::SystemMessageDropped { index } => write!(f, "system message at {index} dropped"),
            Self::ConsecutiveAssistantMerged { index } => {
                write!(f, "assistant message at {index} merged into previous model turn")
            }
            Self::AssistantWithoutPrompt { index } => {
                write!(f, "assistant message at {index} has no preceding user turn")
            }
            Self::EndsOnModelTurn => f.write_str("history ends on a model turn"),
            Self::UnexpectedContentBlock { block_type } => {
                write!(f, "unexpected content block type '{block_type}'")
            }
            Self::UnusualFinishReason { reason } => write!(f, "finish reason '{reason}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Formatted<B> {
    pub body: B,
    pub diagnostics: Vec<Diagnostic>,
}

impl<B> Formatted<B> {
    pub fn new(body: B) -> Self {
        Self {
            body,
            diagnostics: Vec::new(),
        }
    }

    pub fn with_diagnostics(body: B, diagnostics: Vec<Diagnostic>) -> Self {
        Self { body, diagnostics }
    }

    pub fn has(&self, diagnostic: &Diagnostic) -> bool {
        self.diagnostics.contains(diagnostic)
    }
}

/// Plain-text result of one provider call. `text` is `None` when the provider answered
/// with nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Completion {
    pub text: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            diagnostics: Vec::new(),
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    /// Trims surrounding whitespace; an empty result becomes absent.
    pub(crate) fn normalized(mut self) -> Self {
        self.text = self
            .text
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        self
    }
}
