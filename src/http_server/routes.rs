//! Query HTTP Routes
//!
//! Endpoints for schema inspection, plan generation and plan execution.
//! Every `/api/plan` and `/api/query` call is rate-limited per session; the
//! session comes from the `x-session-id` header.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::observability::MetricsSnapshot;
use crate::pipeline::{
    ExecuteRequest, PipelineError, PipelineResult, PlannedQuery, QueryOutcome, QueryPipeline,
};
use crate::plan::SchemaSummary;

/// Header carrying the caller's session id
pub const SESSION_HEADER: &str = "x-session-id";

// ==================
// Shared State
// ==================

pub type ApiState = Arc<QueryPipeline>;

// ==================
// Request/Response Types
// ==================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub question: String,
}

// ==================
// Routers
// ==================

/// Health and metrics routes
pub fn health_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Schema, plan and query routes (nested under `/api`)
pub fn query_routes(state: ApiState) -> Router {
    Router::new()
        .route("/schema", get(schema_handler))
        .route("/plan", post(plan_handler))
        .route("/query", post(query_handler))
        .with_state(state)
}

// ==================
// Handlers
// ==================

async fn health_handler() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}

async fn metrics_handler(State(pipeline): State<ApiState>) -> Json<MetricsSnapshot> {
    Json(pipeline.metrics().snapshot())
}

async fn schema_handler(
    State(pipeline): State<ApiState>,
) -> PipelineResult<Json<SchemaSummary>> {
    pipeline.schema().await.map(Json)
}

async fn plan_handler(
    State(pipeline): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> PipelineResult<Json<PlannedQuery>> {
    let session = session_id(&headers)?;
    let Json(request) = payload.map_err(rejected_body)?;
    pipeline.plan(&session, &request.question).await.map(Json)
}

async fn query_handler(
    State(pipeline): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> PipelineResult<Json<QueryOutcome>> {
    let session = session_id(&headers)?;
    let Json(request) = payload.map_err(rejected_body)?;
    pipeline.execute(&session, request).await.map(Json)
}

// ==================
// Helpers
// ==================

fn session_id(headers: &HeaderMap) -> PipelineResult<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PipelineError::invalid_request(format!("missing {} header", SESSION_HEADER)))
}

fn rejected_body(rejection: JsonRejection) -> PipelineError {
    PipelineError::invalid_request(rejection.body_text())
}
