//! Plan generator
//!
//! Flow (strict order):
//! 1. Build the system and user messages for the question
//! 2. Send one chat-completion request at temperature 0
//! 3. Extract the first JSON object from the reply
//! 4. Parse it
//! 5. Normalize it into a `Plan`
//!
//! The upstream's structural compliance is never trusted: step 5 is an
//! independent validation pass.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::plan::{candidate_text, normalize, Plan, SchemaSummary, SchemaValidationError};

use super::client::{ChatCompletion, LlmEndpoint};
use super::errors::GenerateResult;
use super::prompt::build_request;

/// Turns a question into a validated plan via the upstream model
#[derive(Clone)]
pub struct PlanGenerator {
    client: Arc<dyn ChatCompletion>,
}

impl PlanGenerator {
    pub fn new(client: Arc<dyn ChatCompletion>) -> Self {
        Self { client }
    }

    /// Generates and validates a plan for `question`.
    ///
    /// # Errors
    ///
    /// - `GenerateError::Upstream` if the endpoint fails or returns no content
    /// - `GenerateError::Schema` if the reply is not JSON or not a valid plan
    pub async fn generate(
        &self,
        question: &str,
        schema: &SchemaSummary,
        endpoint: &LlmEndpoint,
    ) -> GenerateResult<Plan> {
        let request = build_request(question, schema, &endpoint.model);
        let content = self.client.complete(endpoint, &request).await?;

        let text = candidate_text(&content);
        let candidate: Value =
            serde_json::from_str(text).map_err(SchemaValidationError::invalid_json)?;
        let plan = normalize(&candidate)?;

        debug!(
            action = %plan.action(),
            collection = plan.collection(),
            model = %endpoint.model,
            "upstream plan normalized"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::errors::{GenerateError, UpstreamError};
    use crate::generator::prompt::ChatRequest;
    use crate::plan::SchemaErrorCode;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct Canned {
        reply: Result<String, UpstreamError>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl Canned {
        fn new(reply: Result<&str, UpstreamError>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatCompletion for Canned {
        async fn complete(
            &self,
            _endpoint: &LlmEndpoint,
            request: &ChatRequest,
        ) -> Result<String, UpstreamError> {
            self.seen.lock().push(request.clone());
            self.reply.clone()
        }
    }

    fn schema() -> SchemaSummary {
        SchemaSummary::new("shop", Vec::new())
    }

    #[tokio::test]
    async fn test_reply_wrapped_in_prose() {
        let canned = Canned::new(Ok(
            "Sure! {\"action\":\"find\",\"collection\":\"users\"} Hope that helps.",
        ));
        let generator = PlanGenerator::new(canned.clone());
        let endpoint = LlmEndpoint::new("http://llm/v1", "m1");

        let plan = generator.generate("all users", &schema(), &endpoint).await.unwrap();
        assert_eq!(plan.collection(), "users");
        assert_eq!(plan.to_value()["limit"], 100);

        let seen = canned.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "m1");
    }

    #[tokio::test]
    async fn test_non_json_reply_is_schema_error() {
        let generator = PlanGenerator::new(Canned::new(Ok("I cannot help with that")));
        let err = generator
            .generate("q", &schema(), &LlmEndpoint::default())
            .await
            .unwrap_err();
        match err {
            GenerateError::Schema(e) => assert_eq!(e.code(), SchemaErrorCode::InvalidJson),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_plan_is_schema_error() {
        let generator = PlanGenerator::new(Canned::new(Ok(
            r#"{"action":"find","collection":"users","limit":5000}"#,
        )));
        let err = generator
            .generate("q", &schema(), &LlmEndpoint::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Schema(_)));
    }

    #[tokio::test]
    async fn test_upstream_error_passes_through() {
        let generator = PlanGenerator::new(Canned::new(Err(UpstreamError::EmptyContent)));
        let err = generator
            .generate("q", &schema(), &LlmEndpoint::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Upstream(UpstreamError::EmptyContent)
        ));
    }
}
