//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the reasoning service
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response arrived but its shape was unusable; `body` holds the raw text when captured
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String, body: Option<String> },

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Shorthand for a shape error without a captured body
    pub fn invalid(message: impl Into<String>) -> Self {
        LlmError::InvalidResponse {
            message: message.into(),
            body: None,
        }
    }

    /// Raw response body, if one was captured for diagnostics
    pub fn body(&self) -> Option<&str> {
        match self {
            LlmError::ApiError { message, .. } => Some(message),
            LlmError::InvalidResponse { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    /// Check if this error is worth another attempt
    ///
    /// The session retries every failure class up to the attempt bound; only
    /// configuration errors are pointless to repeat.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LlmError::Config(_))
    }
}
