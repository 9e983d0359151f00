//! Process wiring
//!
//! Builds the shared services from an `AppConfig`. Nothing here is global:
//! every component is constructed once and handed out through `Arc`.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::{AppConfig, ConfigError};
use crate::executor::{DocumentStore, ExecutionDispatcher, MemoryStore, StoreError};
use crate::generator::{ChatCompletion, HttpChatClient, PlanGenerator, UpstreamError};
use crate::observability::MetricsRegistry;
use crate::pipeline::QueryPipeline;
use crate::ratelimit::RateLimiter;

/// Startup failure
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_INVALID",
            AppError::Store(_) => "STORE_INIT_FAILED",
            AppError::Upstream(e) => e.code(),
            AppError::Server(_) => "SERVER_FAILED",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Shared services of one running process
#[derive(Clone)]
pub struct App {
    pub config: AppConfig,
    pub pipeline: Arc<QueryPipeline>,
    pub limiter: Arc<RateLimiter>,
    pub metrics: Arc<MetricsRegistry>,
}

impl App {
    /// Builds the app with the HTTP chat client and a (possibly seeded) memory store
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let store = match &config.data.seed_path {
            Some(path) => {
                let store = MemoryStore::from_seed_file(&config.data.db_name, Path::new(path))?;
                info!(db = %config.data.db_name, seed = %path, "memory store seeded");
                store
            }
            None => MemoryStore::new(),
        };
        let client = HttpChatClient::new(config.llm.timeout())?;

        Ok(Self::with_parts(config, Arc::new(client), Arc::new(store)))
    }

    /// Builds the app around caller-supplied client and store
    pub fn with_parts(
        config: AppConfig,
        client: Arc<dyn ChatCompletion>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.bucket()));
        let metrics = Arc::new(MetricsRegistry::new());
        let endpoint = config.llm.endpoint();

        info!(url = %endpoint.url, model = %endpoint.model, "language model endpoint");

        let pipeline = QueryPipeline::new(
            PlanGenerator::new(client),
            store,
            config.data.db_name.clone(),
            endpoint,
        )
        .with_limiter(limiter.clone())
        .with_metrics(metrics.clone())
        .with_dispatcher(ExecutionDispatcher::new(config.execution.timeout()));

        Self {
            config,
            pipeline: Arc::new(pipeline),
            limiter,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_default_config() {
        let app = App::from_config(AppConfig::default()).unwrap();
        assert_eq!(app.pipeline.db_name(), "docpilot");
        assert!(Arc::ptr_eq(app.pipeline.limiter(), &app.limiter));
        assert!(Arc::ptr_eq(app.pipeline.metrics(), &app.metrics));
    }

    #[test]
    fn test_limiter_uses_configured_bucket() {
        let mut config = AppConfig::default();
        config.rate_limit.capacity = 3;
        let app = App::from_config(config).unwrap();
        assert_eq!(app.limiter.config().capacity, 3);
    }

    #[test]
    fn test_missing_seed_file_fails() {
        let mut config = AppConfig::default();
        config.data.seed_path = Some("/nonexistent/seed.json".to_string());
        let err = App::from_config(config).err().unwrap();
        assert_eq!(err.code(), "STORE_INIT_FAILED");
    }

    #[tokio::test]
    async fn test_seeded_schema_is_visible() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"users": [{{"name": "ada", "age": 36}}]}}"#).unwrap();

        let mut config = AppConfig::default();
        config.data.seed_path = Some(file.path().display().to_string());
        let app = App::from_config(config).unwrap();

        let schema = app.pipeline.schema().await.unwrap();
        let rendered = serde_json::to_value(&schema).unwrap();
        assert!(rendered.to_string().contains("users"));
    }
}
