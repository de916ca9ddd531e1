//! Storage-layer errors and their mapping onto chat and provider errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

use pchat::ChatError;
use pprovider::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryErrorKind {
    Storage,
    NotFound,
    InvalidRequest,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryError {
    pub kind: MemoryErrorKind,
    pub message: String,
}

impl MemoryError {
    pub fn new(kind: MemoryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(MemoryErrorKind::Storage, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(MemoryErrorKind::NotFound, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(MemoryErrorKind::InvalidRequest, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(MemoryErrorKind::Other, message)
    }
}

impl Display for MemoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for MemoryError {}

impl From<MemoryError> for ChatError {
    fn from(value: MemoryError) -> Self {
        match value.kind {
            MemoryErrorKind::NotFound => ChatError::not_found(value.message),
            MemoryErrorKind::InvalidRequest => ChatError::invalid_request(value.message),
            MemoryErrorKind::Storage | MemoryErrorKind::Other => ChatError::store(value.message),
        }
    }
}

impl From<MemoryError> for ProviderError {
    fn from(value: MemoryError) -> Self {
        ProviderError::other(value.message)
    }
}
