//! Shared provider error kinds and error value helpers.
//!
//! ```rust
//! use pprovider::{ErrorClass, ProviderError};
//!
//! let missing = ProviderError::configuration("API key for service 'openai' is missing.");
//! assert_eq!(missing.class(), ErrorClass::Configuration);
//! assert!(!missing.retryable);
//!
//! let blocked = ProviderError::safety_blocked("blocked");
//! assert_eq!(blocked.class(), ErrorClass::Protocol);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Configuration,
    Authentication,
    RateLimited,
    InvalidRequest,
    Timeout,
    Transport,
    Unavailable,
    ProviderReported,
    SafetyBlocked,
    MalformedResponse,
    Other,
}

/// Coarse grouping used when reporting a failed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Missing credential or unsupported provider.
    Configuration,
    /// Network or HTTP failure talking to the provider.
    Transport,
    /// Provider answered, but with an error payload, a block, or an unreadable body.
    Protocol,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Configuration, message, false)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message, false)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message, true)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message, true)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message, true)
    }

    pub fn provider_reported(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::ProviderReported, message, false)
    }

    pub fn safety_blocked(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::SafetyBlocked, message, false)
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::MalformedResponse, message, false)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, message, false)
    }

    pub fn class(&self) -> ErrorClass {
        match self.kind {
            ProviderErrorKind::Configuration => ErrorClass::Configuration,
            ProviderErrorKind::Authentication
            | ProviderErrorKind::RateLimited
            | ProviderErrorKind::InvalidRequest
            | ProviderErrorKind::Timeout
            | ProviderErrorKind::Transport
            | ProviderErrorKind::Unavailable => ErrorClass::Transport,
            ProviderErrorKind::ProviderReported
            | ProviderErrorKind::SafetyBlocked
            | ProviderErrorKind::MalformedResponse => ErrorClass::Protocol,
            ProviderErrorKind::Other => ErrorClass::Other,
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ProviderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_builders_assign_expected_retryability() {
        assert!(!ProviderError::configuration("missing").retryable);
        assert!(!ProviderError::authentication("bad key").retryable);
        assert!(ProviderError::timeout("slow").retryable);
        assert!(ProviderError::rate_limited("later").retryable);
        assert!(!ProviderError::malformed_response("garbled").retryable);
    }

    #[test]
    fn kinds_map_to_reporting_classes() {
        assert_eq!(
            ProviderError::configuration("x").class(),
            ErrorClass::Configuration
        );
        assert_eq!(ProviderError::unavailable("x").class(), ErrorClass::Transport);
        assert_eq!(
            ProviderError::provider_reported("x").class(),
            ErrorClass::Protocol
        );
        assert_eq!(ProviderError::other("x").class(), ErrorClass::Other);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let error = ProviderError::safety_blocked("ratings: []");
        assert_eq!(error.to_string(), "SafetyBlocked: ratings: []");
    }
}
