//! Application configuration
//!
//! Loaded from a JSON file; every field has a default, so `{}` is a valid
//! configuration. The LLM endpoint and model fall back to the
//! `LM_STUDIO_URL` / `LM_STUDIO_MODEL` environment variables when unset.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::LlmEndpoint;
use crate::http_server::HttpServerConfig;
use crate::ratelimit::RateLimitConfig;

/// Configuration load or validation failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Language-model endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API; env or default when unset
    pub url: Option<String>,
    /// Model name; env or default when unset
    pub model: Option<String>,
    /// Request timeout in seconds (default: 120)
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: None,
            model: None,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    pub fn endpoint(&self) -> LlmEndpoint {
        LlmEndpoint::resolve(self.url.as_deref(), self.model.as_deref())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Rate limiter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub capacity: u32,
    pub refill_amount: u32,
    pub interval_ms: u64,
    /// Buckets unchecked for this long are evicted
    pub idle_ttl_secs: u64,
    /// How often the server sweeps idle buckets
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        let bucket = RateLimitConfig::default();
        Self {
            capacity: bucket.capacity,
            refill_amount: bucket.refill_amount,
            interval_ms: bucket.interval_ms,
            idle_ttl_secs: 3_600,
            sweep_interval_secs: 300,
        }
    }
}

impl RateLimitSettings {
    pub fn bucket(&self) -> RateLimitConfig {
        RateLimitConfig {
            capacity: self.capacity,
            refill_amount: self.refill_amount,
            interval_ms: self.interval_ms,
        }
    }

    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Bound on one store call in milliseconds (default: 30000)
    pub timeout_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

impl ExecutionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Data source settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Database name plans run against
    pub db_name: String,
    /// Optional `{collection: [documents]}` JSON file loaded at startup
    pub seed_path: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            db_name: "docpilot".to_string(),
            seed_path: None,
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: HttpServerConfig,
    pub llm: LlmConfig,
    pub rate_limit: RateLimitSettings,
    pub execution: ExecutionConfig,
    pub data: DataConfig,
}

impl AppConfig {
    /// Reads and validates a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: AppConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Rejects zero capacities, intervals and timeouts, and an idle TTL
    /// shorter than the refill interval
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            (self.rate_limit.capacity == 0, "rate_limit.capacity must be > 0"),
            (self.rate_limit.refill_amount == 0, "rate_limit.refill_amount must be > 0"),
            (self.rate_limit.interval_ms == 0, "rate_limit.interval_ms must be > 0"),
            (self.rate_limit.idle_ttl_secs == 0, "rate_limit.idle_ttl_secs must be > 0"),
            (
                self.rate_limit.sweep_interval_secs == 0,
                "rate_limit.sweep_interval_secs must be > 0",
            ),
            (
                self.rate_limit.idle_ttl_secs.saturating_mul(1_000) < self.rate_limit.interval_ms,
                "rate_limit.idle_ttl_secs must cover rate_limit.interval_ms",
            ),
            (self.llm.timeout_secs == 0, "llm.timeout_secs must be > 0"),
            (self.execution.timeout_ms == 0, "execution.timeout_ms must be > 0"),
            (self.data.db_name.trim().is_empty(), "data.db_name must not be empty"),
        ];
        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, message)) => Err(ConfigError::Invalid(message.to_string())),
            None => Ok(()),
        }
    }
}
