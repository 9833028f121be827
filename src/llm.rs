//! Inference provider abstraction
//!
//! One seam for talking to the model: a streaming step call that forwards
//! text deltas over a channel while it accumulates the complete step.

mod error;
mod stream;
mod types;
mod workers_ai;

#[cfg(test)]
mod proptests;

pub use error::{ModelError, ModelErrorKind};
pub use types::*;
pub use workers_ai::{WorkersAiService, DEFAULT_MODEL};

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Provider connection settings, read from the environment.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub account_id: Option<String>,
    pub api_token: Option<String>,
    pub model: String,
    /// Direct run-endpoint override; takes precedence over the account
    /// scheme (gateways, local mocks).
    pub base_url: Option<String>,
}

impl AiConfig {
    pub fn from_env() -> Self {
        Self {
            account_id: std::env::var("CLOUDFLARE_ACCOUNT_ID").ok(),
            api_token: std::env::var("CLOUDFLARE_API_TOKEN").ok(),
            model: std::env::var("WORKERS_AI_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("WORKERS_AI_BASE_URL").ok(),
        }
    }
}

/// Common interface for chat model providers
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one model step. Text deltas go out on `deltas` as they arrive;
    /// the returned step carries the accumulated text, any tool calls, and
    /// usage.
    async fn stream_step(
        &self,
        request: &ModelRequest,
        deltas: mpsc::Sender<String>,
    ) -> Result<StepResponse, ModelError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for chat models
pub struct LoggingModel {
    inner: Arc<dyn ChatModel>,
    model_id: String,
}

impl LoggingModel {
    pub fn new(inner: Arc<dyn ChatModel>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl ChatModel for LoggingModel {
    async fn stream_step(
        &self,
        request: &ModelRequest,
        deltas: mpsc::Sender<String>,
    ) -> Result<StepResponse, ModelError> {
        let start = std::time::Instant::now();
        let result = self.inner.stream_step(request, deltas).await;
        let duration = start.elapsed();

        match &result {
            Ok(step) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    prompt_tokens = step.usage.prompt_tokens,
                    completion_tokens = step.usage.completion_tokens,
                    tool_calls = step.tool_calls.len(),
                    "Model step completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Model step failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
