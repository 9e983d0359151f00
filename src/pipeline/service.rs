//! Query pipeline
//!
//! Control flow (strict order):
//! 1. Rate-limit the session (`q:<session>`)
//! 2. Obtain a plan: re-normalize a caller-supplied one, or generate a fresh
//!    one against the cached schema summary
//! 3. Safety-validate the plan
//! 4. Phase 1 stops here and reports whether confirmation is needed
//! 5. Phase 2 refuses mutating plans without `confirm`, then executes
//!
//! Steps 2 and 3 run again on every phase-2 call, immediately before
//! execution, whatever the plan's origin.
//!
//! The schema summary is discovered on first use and kept until `schema()`
//! is called again.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::errors::{PipelineError, PipelineResult};
use crate::executor::{
    discover_schema, DocumentStore, ExecutionDispatcher, ExecutionMeta, ExecutionError,
};
use crate::generator::{GenerateError, LlmEndpoint, PlanGenerator};
use crate::observability::MetricsRegistry;
use crate::plan::{normalize, Document, Plan, SchemaSummary};
use crate::ratelimit::{RateDecision, RateLimiter};
use crate::safety::SafetyValidator;

/// Phase-1 result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedQuery {
    pub plan: Plan,
    pub requires_confirmation: bool,
}

/// Phase-2 input
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub question: String,
    /// A plan returned by phase 1; re-validated before use
    #[serde(default)]
    pub plan: Option<Value>,
    #[serde(default)]
    pub confirm: bool,
}

impl ExecuteRequest {
    pub fn question(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn with_plan(mut self, plan: Value) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn confirmed(mut self) -> Self {
        self.confirm = true;
        self
    }
}

/// Phase-2 result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub rows: Vec<Document>,
    pub meta: ExecutionMeta,
    pub plan: Plan,
}

/// Question-to-result pipeline over one database
pub struct QueryPipeline {
    generator: PlanGenerator,
    validator: SafetyValidator,
    dispatcher: ExecutionDispatcher,
    limiter: Arc<RateLimiter>,
    metrics: Arc<MetricsRegistry>,
    store: Arc<dyn DocumentStore>,
    db_name: String,
    endpoint: LlmEndpoint,
    schema: RwLock<Option<SchemaSummary>>,
}

impl QueryPipeline {
    pub fn new(
        generator: PlanGenerator,
        store: Arc<dyn DocumentStore>,
        db_name: impl Into<String>,
        endpoint: LlmEndpoint,
    ) -> Self {
        Self {
            generator,
            validator: SafetyValidator::new(),
            dispatcher: ExecutionDispatcher::default(),
            limiter: Arc::new(RateLimiter::default()),
            metrics: Arc::new(MetricsRegistry::new()),
            store,
            db_name: db_name.into(),
            endpoint,
            schema: RwLock::new(None),
        }
    }

    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: ExecutionDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_validator(mut self, validator: SafetyValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Rate-limit key for a session
    pub fn rate_key(session: &str) -> String {
        format!("q:{}", session)
    }

    /// Rediscovers the schema summary and replaces the cached one
    pub async fn schema(&self) -> PipelineResult<SchemaSummary> {
        let summary = discover_schema(self.store.as_ref(), &self.db_name)
            .await
            .map_err(|e| PipelineError::Execution(ExecutionError::from(e)))?;
        *self.schema.write() = Some(summary.clone());
        Ok(summary)
    }

    async fn cached_schema(&self) -> PipelineResult<SchemaSummary> {
        let cached = self.schema.read().clone();
        match cached {
            Some(summary) => Ok(summary),
            None => self.schema().await,
        }
    }

    /// Phase 1: generate and validate a plan without executing it
    pub async fn plan(&self, session: &str, question: &str) -> PipelineResult<PlannedQuery> {
        let question = required_question(question)?;
        self.admit(session)?;

        let plan = self.generate(question).await?;
        self.validate(&plan)?;
        self.metrics.increment_plans_generated();

        info!(
            session,
            action = %plan.action(),
            collection = plan.collection(),
            "plan generated"
        );
        Ok(PlannedQuery {
            requires_confirmation: plan.is_mutating(),
            plan,
        })
    }

    /// Phase 2: validate and execute a supplied or freshly generated plan
    pub async fn execute(&self, session: &str, request: ExecuteRequest) -> PipelineResult<QueryOutcome> {
        let question = required_question(&request.question)?;
        self.admit(session)?;

        let plan = match &request.plan {
            Some(candidate) => normalize(candidate).map_err(|e| {
                self.metrics.increment_plans_rejected();
                warn!(session, error = %e, "supplied plan rejected");
                PipelineError::from(e)
            })?,
            None => self.generate(question).await?,
        };
        self.validate(&plan)?;

        if plan.is_mutating() && !request.confirm {
            info!(
                session,
                action = %plan.action(),
                collection = plan.collection(),
                "confirmation required"
            );
            return Err(PipelineError::ConfirmationRequired {
                plan: Box::new(plan),
            });
        }

        match self
            .dispatcher
            .run(self.store.as_ref(), &self.db_name, &plan)
            .await
        {
            Ok(result) => {
                self.metrics.increment_executions();
                info!(
                    session,
                    action = %plan.action(),
                    collection = plan.collection(),
                    rows = result.rows.len(),
                    ms = result.meta.ms,
                    "execution finished"
                );
                Ok(QueryOutcome {
                    rows: result.rows,
                    meta: result.meta,
                    plan,
                })
            }
            Err(e) => {
                self.metrics.increment_execution_failures();
                warn!(session, code = e.code(), error = %e, "execution failed");
                Err(e.into())
            }
        }
    }

    fn admit(&self, session: &str) -> PipelineResult<()> {
        if session.trim().is_empty() {
            return Err(PipelineError::invalid_request("missing session id"));
        }
        match self.limiter.check(&Self::rate_key(session)) {
            RateDecision::Allowed { .. } => Ok(()),
            RateDecision::Limited { reset_in_ms } => {
                self.metrics.increment_rate_limited();
                warn!(session, reset_in_ms, "rate limited");
                Err(PipelineError::RateLimited { reset_in_ms })
            }
        }
    }

    async fn generate(&self, question: &str) -> PipelineResult<Plan> {
        let schema = self.cached_schema().await?;
        self.generator
            .generate(question, &schema, &self.endpoint)
            .await
            .map_err(|e| {
                match &e {
                    GenerateError::Upstream(_) => self.metrics.increment_upstream_failures(),
                    GenerateError::Schema(_) => self.metrics.increment_plans_rejected(),
                }
                warn!(error = %e, "plan generation failed");
                PipelineError::from(e)
            })
    }

    fn validate(&self, plan: &Plan) -> PipelineResult<()> {
        self.validator.check(plan).map_err(|e| {
            self.metrics.increment_plans_rejected();
            warn!(
                action = %plan.action(),
                collection = plan.collection(),
                code = %e.code(),
                "plan rejected by safety validation"
            );
            PipelineError::from(e)
        })
    }
}

fn required_question(question: &str) -> PipelineResult<&str> {
    let question = question.trim();
    if question.is_empty() {
        return Err(PipelineError::invalid_request("missing question"));
    }
    Ok(question)
}
