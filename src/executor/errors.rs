//! Executor error types
//!
//! Error codes:
//! - EXECUTION_DATABASE
//! - EXECUTION_TIMEOUT
//!
//! Store backends report `StoreError`; the dispatcher folds every store
//! failure into `ExecutionError::Database` with the original message kept.

use std::time::Duration;

use thiserror::Error;

/// Failure reported by a `DocumentStore` backend
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Query or update operator the backend does not implement
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    /// Malformed argument (bad operand type, malformed stage, ...)
    #[error("{0}")]
    InvalidArgument(String),

    /// Seed data could not be loaded
    #[error("failed to load seed data from {path}: {reason}")]
    Seed { path: String, reason: String },

    /// Backend-specific failure
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn invalid(message: impl Into<String>) -> Self {
        StoreError::InvalidArgument(message.into())
    }

    pub fn unsupported(operator: impl Into<String>) -> Self {
        StoreError::UnsupportedOperator(operator.into())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Execution of a validated plan failed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    /// The store rejected or failed the operation
    #[error("Database error: {message}")]
    Database { message: String },

    /// The store call did not finish within the execution timeout
    #[error("Database operation timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
}

impl ExecutionError {
    pub fn timeout(after: Duration) -> Self {
        ExecutionError::Timeout {
            after_ms: after.as_millis() as u64,
        }
    }

    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutionError::Database { .. } => "EXECUTION_DATABASE",
            ExecutionError::Timeout { .. } => "EXECUTION_TIMEOUT",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionError::Timeout { .. })
    }
}

impl From<StoreError> for ExecutionError {
    fn from(err: StoreError) -> Self {
        ExecutionError::Database {
            message: err.to_string(),
        }
    }
}

/// Result type for plan execution
pub type ExecutorResult<T> = Result<T, ExecutionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_keeps_original_message() {
        let err = ExecutionError::from(StoreError::unsupported("$lookup"));
        assert_eq!(err.code(), "EXECUTION_DATABASE");
        assert!(err.to_string().contains("unsupported operator: $lookup"));
    }

    #[test]
    fn test_timeout_code() {
        let err = ExecutionError::timeout(Duration::from_millis(1500));
        assert!(err.is_timeout());
        assert_eq!(err, ExecutionError::Timeout { after_ms: 1500 });
        assert_eq!(err.code(), "EXECUTION_TIMEOUT");
    }
}
