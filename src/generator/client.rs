//! Chat-completion client for the upstream model
//!
//! Speaks the OpenAI-compatible `/chat/completions` protocol (LM Studio,
//! Ollama's compatibility layer, hosted endpoints). One request per call,
//! no retries. Every request is bounded by the client timeout, and dropping
//! the returned future cancels it.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::errors::UpstreamError;
use super::prompt::ChatRequest;

/// Environment variable overriding the endpoint base URL
pub const LLM_URL_ENV: &str = "LM_STUDIO_URL";

/// Environment variable overriding the model name
pub const LLM_MODEL_ENV: &str = "LM_STUDIO_MODEL";

pub const DEFAULT_LLM_URL: &str = "http://localhost:1234/v1";
pub const DEFAULT_LLM_MODEL: &str = "openai/gpt-oss-20b";

/// Upstream endpoint base URL and model name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmEndpoint {
    pub url: String,
    pub model: String,
}

impl LlmEndpoint {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            model: model.into(),
        }
    }

    /// Resolves the endpoint.
    ///
    /// Precedence:
    /// 1) explicit value
    /// 2) env var (`LM_STUDIO_URL` / `LM_STUDIO_MODEL`)
    /// 3) default
    pub fn resolve(url: Option<&str>, model: Option<&str>) -> Self {
        Self::new(
            pick(url, LLM_URL_ENV, DEFAULT_LLM_URL),
            pick(model, LLM_MODEL_ENV, DEFAULT_LLM_MODEL),
        )
    }

    /// Full chat-completions URL; a trailing slash on the base is ignored
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.url.trim_end_matches('/'))
    }
}

impl Default for LlmEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_LLM_URL, DEFAULT_LLM_MODEL)
    }
}

fn pick(explicit: Option<&str>, env: &str, default: &str) -> String {
    explicit
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| {
            std::env::var(env)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
        .unwrap_or_else(|| default.to_string())
}

/// Sends one chat-completion request and returns the first message content.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(
        &self,
        endpoint: &LlmEndpoint,
        request: &ChatRequest,
    ) -> Result<String, UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// HTTP implementation backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpChatClient {
    pub fn new(timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl ChatCompletion for HttpChatClient {
    async fn complete(
        &self,
        endpoint: &LlmEndpoint,
        request: &ChatRequest,
    ) -> Result<String, UpstreamError> {
        let url = endpoint.completions_url();

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout(self.timeout)
                } else {
                    UpstreamError::Unreachable {
                        url: url.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(text) if !text.trim().is_empty() => text,
                _ => status.canonical_reason().unwrap_or("request failed").to_string(),
            };
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(self.timeout)
            } else {
                UpstreamError::InvalidResponse(e.to_string())
            }
        })?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(UpstreamError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url_ignores_trailing_slash() {
        let endpoint = LlmEndpoint::new("http://localhost:1234/v1/", "m");
        assert_eq!(
            endpoint.completions_url(),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn test_explicit_values_win() {
        let endpoint = LlmEndpoint::resolve(Some("http://llm:8080/v1"), Some("small"));
        assert_eq!(endpoint, LlmEndpoint::new("http://llm:8080/v1", "small"));
    }

    #[test]
    fn test_blank_explicit_value_is_ignored() {
        let endpoint = LlmEndpoint::resolve(Some("  "), Some("small"));
        assert!(!endpoint.url.trim().is_empty());
        assert_eq!(endpoint.model, "small");
    }

    #[test]
    fn test_client_builds_with_timeout() {
        let client = HttpChatClient::new(Duration::from_secs(3)).unwrap();
        assert_eq!(client.timeout(), Duration::from_secs(3));
    }
}
