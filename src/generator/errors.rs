//! # Generator Errors
//!
//! Upstream failures are kept apart from execution failures: the model
//! endpoint is the component most likely to be briefly unavailable, so
//! callers may want a different retry policy for it.

use std::time::Duration;

use thiserror::Error;

use crate::plan::SchemaValidationError;

/// The language-model endpoint failed to produce usable content
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Could not build the HTTP client
    #[error("LLM client setup failed: {0}")]
    Client(String),

    /// Connection or transport failure
    #[error("LLM endpoint unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// No response within the configured timeout
    #[error("LLM request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Non-success HTTP status
    #[error("LLM error: {body} (status {status})")]
    Status { status: u16, body: String },

    /// Body was not a chat-completion response
    #[error("LLM returned an invalid response: {0}")]
    InvalidResponse(String),

    /// First choice carried no content
    #[error("No content from LLM")]
    EmptyContent,
}

impl UpstreamError {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            UpstreamError::Client(_) => "UPSTREAM_CLIENT",
            UpstreamError::Unreachable { .. } => "UPSTREAM_UNREACHABLE",
            UpstreamError::Timeout(_) => "UPSTREAM_TIMEOUT",
            UpstreamError::Status { .. } => "UPSTREAM_STATUS",
            UpstreamError::InvalidResponse(_) => "UPSTREAM_INVALID_RESPONSE",
            UpstreamError::EmptyContent => "UPSTREAM_EMPTY_CONTENT",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Timeout(_))
    }
}

/// Plan generation failed upstream or produced an invalid plan
#[derive(Debug, Clone, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Schema(#[from] SchemaValidationError),
}

/// Result type for plan generation
pub type GenerateResult<T> = Result<T, GenerateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_mention_llm() {
        let errors = [
            UpstreamError::Timeout(Duration::from_secs(5)),
            UpstreamError::Status {
                status: 500,
                body: "boom".into(),
            },
            UpstreamError::EmptyContent,
        ];
        for err in errors {
            assert!(err.to_string().contains("LLM"), "{}", err);
        }
    }

    #[test]
    fn test_timeout_flag() {
        assert!(UpstreamError::Timeout(Duration::from_secs(1)).is_timeout());
        assert!(!UpstreamError::EmptyContent.is_timeout());
        assert_eq!(UpstreamError::EmptyContent.code(), "UPSTREAM_EMPTY_CONTENT");
    }
}
