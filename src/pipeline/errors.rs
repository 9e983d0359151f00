//! # Pipeline Errors
//!
//! Every component error funnels into `PipelineError`, which also carries
//! the two glue failures (bad request, missing confirmation) and maps each
//! kind to its HTTP status.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::executor::ExecutionError;
use crate::generator::{GenerateError, UpstreamError};
use crate::plan::{Plan, SchemaValidationError};
use crate::safety::SafetyViolation;

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Pipeline errors
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Missing or malformed request input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No token left in the caller's bucket
    #[error("Rate limit exceeded")]
    RateLimited { reset_in_ms: u64 },

    /// Candidate plan failed structural validation
    #[error("{0}")]
    Schema(#[from] SchemaValidationError),

    /// Plan contains a forbidden construct
    #[error("{0}")]
    Safety(#[from] SafetyViolation),

    /// Mutating plan submitted without `confirm`
    #[error("Confirmation required to run {} on '{}'", .plan.action(), .plan.collection())]
    ConfirmationRequired { plan: Box<Plan> },

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Language-model endpoint failed
    #[error("{0}")]
    Upstream(#[from] UpstreamError),

    /// Store failed or timed out
    #[error("{0}")]
    Execution(#[from] ExecutionError),
}

impl From<GenerateError> for PipelineError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Upstream(e) => PipelineError::Upstream(e),
            GenerateError::Schema(e) => PipelineError::Schema(e),
        }
    }
}

impl PipelineError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        PipelineError::InvalidRequest(message.into())
    }

    /// Error family, stable across codes
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidRequest(_) => "invalid_request",
            PipelineError::RateLimited { .. } => "rate_limited",
            PipelineError::Schema(_) => "schema_validation",
            PipelineError::Safety(_) => "safety_violation",
            PipelineError::ConfirmationRequired { .. } => "confirmation_required",
            PipelineError::Upstream(_) => "upstream",
            PipelineError::Execution(_) => "execution",
        }
    }

    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::InvalidRequest(_) => "INVALID_REQUEST",
            PipelineError::RateLimited { .. } => "RATE_LIMITED",
            PipelineError::Schema(e) => e.code().code(),
            PipelineError::Safety(e) => e.code().code(),
            PipelineError::ConfirmationRequired { .. } => "CONFIRMATION_REQUIRED",
            PipelineError::Upstream(e) => e.code(),
            PipelineError::Execution(e) => e.code(),
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PipelineError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            PipelineError::Schema(_) | PipelineError::Safety(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            PipelineError::ConfirmationRequired { .. } => StatusCode::CONFLICT,
            PipelineError::Upstream(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::Upstream(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Execution(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_in_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
}

impl From<PipelineError> for ErrorResponse {
    fn from(err: PipelineError) -> Self {
        let error = err.to_string();
        let code = err.code();
        let kind = err.kind();
        let (retry_in_ms, plan) = match err {
            PipelineError::RateLimited { reset_in_ms } => (Some(reset_in_ms), None),
            PipelineError::ConfirmationRequired { plan } => (None, Some(*plan)),
            _ => (None, None),
        };
        Self {
            error,
            code,
            kind,
            retry_in_ms,
            plan,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retry_after = match &self {
            PipelineError::RateLimited { reset_in_ms } => Some(reset_in_ms.div_ceil(1000).max(1)),
            _ => None,
        };

        let mut response = (status, Json(ErrorResponse::from(self))).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::normalize;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            PipelineError::invalid_request("missing question").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PipelineError::RateLimited { reset_in_ms: 10 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            PipelineError::from(SchemaValidationError::missing_field("collection")).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            PipelineError::from(UpstreamError::EmptyContent).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            PipelineError::from(UpstreamError::Timeout(Duration::from_secs(1))).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            PipelineError::from(ExecutionError::Database {
                message: "boom".into()
            })
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_generate_error_splits_by_family() {
        let err = PipelineError::from(GenerateError::Upstream(UpstreamError::EmptyContent));
        assert_eq!(err.kind(), "upstream");
        assert_eq!(err.code(), "UPSTREAM_EMPTY_CONTENT");

        let err = PipelineError::from(GenerateError::Schema(SchemaValidationError::invalid_json(
            "eof",
        )));
        assert_eq!(err.kind(), "schema_validation");
        assert_eq!(err.code(), "PLAN_INVALID_JSON");
    }

    #[test]
    fn test_rate_limited_body_and_header() {
        let response = PipelineError::RateLimited { reset_in_ms: 1500 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");

        let body = ErrorResponse::from(PipelineError::RateLimited { reset_in_ms: 1500 });
        let body = serde_json::to_value(body).unwrap();
        assert_eq!(body["retryInMs"], 1500);
        assert_eq!(body["code"], "RATE_LIMITED");
        assert!(body.get("plan").is_none());
    }

    #[test]
    fn test_confirmation_body_carries_plan() {
        let plan = normalize(&json!({
            "action": "delete",
            "collection": "temp",
            "filter": {"expired": true}
        }))
        .unwrap();
        let err = PipelineError::ConfirmationRequired {
            plan: Box::new(plan),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.to_string().contains("delete"));

        let body = serde_json::to_value(ErrorResponse::from(err)).unwrap();
        assert_eq!(body["plan"]["action"], "delete");
        assert_eq!(body["plan"]["limit"], 1);
    }
}
