use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_retry2::strategy::ExponentialBackoff;
use tokio_retry2::{Retry, RetryError};

use crate::config::Config;
use crate::error::{ConfigError, PipelineError, UpstreamError, UpstreamStatus};
use crate::models::{ModelInvocation, ModelResponse};

/// Anything that can turn a [`ModelInvocation`] into raw model text.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, invocation: &ModelInvocation) -> Result<ModelResponse, PipelineError>;
}

/// Chat-completion client for the upstream model.
///
/// One instance is built at startup and shared. Outstanding calls are capped by
/// a semaphore; a permit is held across all retries of a single invocation.
///
/// Each attempt is bounded by the invocation timeout, so one `invoke` can take
/// up to `(max_retries + 1) * timeout` plus the backoff delays before it
/// returns. With the defaults that is 3 x 120 s plus 0.5 s + 1 s of backoff.
pub struct LLMClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    max_retries: u32,
    retry_backoff: Duration,
    permits: Arc<Semaphore>,
}

impl LLMClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(LLMClient {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            retry_backoff: config.retry_backoff,
            permits: Arc::new(Semaphore::new(config.max_concurrency)),
        })
    }

    /// Delays between attempts: `retry_backoff * 2^(n-1)`, one per retry.
    fn backoff_schedule(&self) -> impl Iterator<Item = Duration> + use<> {
        // `ExponentialBackoff` yields `base^n * factor` ms: base 2 gives 2x, 4x,
        // 8x of the backoff, halved to 1x, 2x, 4x.
        let backoff_ms = self.retry_backoff.as_millis() as u64;
        ExponentialBackoff::from_millis(2)
            .factor(backoff_ms)
            .map(|delay| delay / 2)
            .take(self.max_retries as usize)
    }

    async fn send_once(&self, invocation: &ModelInvocation, api_key: &str) -> Result<String, UpstreamError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .timeout(invocation.timeout)
            .json(&json!({
                "model": invocation.model_id,
                "messages": [
                    { "role": "system", "content": invocation.system_instruction },
                    { "role": "user", "content": invocation.user_content }
                ]
            }))
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            let class = if status.is_client_error() {
                UpstreamStatus::ClientError
            } else {
                UpstreamStatus::ServerError
            };
            tracing::warn!(http_status = status.as_u16(), ?class, "upstream model returned an error status");
            return Err(UpstreamError::new(class, &body));
        }

        extract_completion(&body)
    }
}

#[async_trait]
impl ModelInvoker for LLMClient {
    async fn invoke(&self, invocation: &ModelInvocation) -> Result<ModelResponse, PipelineError> {
        let api_key = self.api_key.as_deref().ok_or(ConfigError::MissingApiKey)?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| UpstreamError::new(UpstreamStatus::NetworkError, e.to_string()))?;

        let mut attempt: u32 = 0;
        let result = Retry::spawn(self.backoff_schedule(), || {
            attempt += 1;
            let attempt = attempt;
            async move {
                let started = Instant::now();
                match self.send_once(invocation, api_key).await {
                    Ok(raw_text) => {
                        tracing::debug!(
                            attempt,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            bytes = raw_text.len(),
                            "upstream model call succeeded"
                        );
                        Ok(raw_text)
                    }
                    Err(err) if err.status.is_retryable() && attempt <= self.max_retries => {
                        tracing::warn!(attempt, status = ?err.status, "upstream model call failed, will retry");
                        Err(RetryError::Transient {
                            err,
                            retry_after: None,
                        })
                    }
                    Err(err) => Err(RetryError::Permanent(err)),
                }
            }
        })
        .await;

        match result {
            Ok(raw_text) => Ok(ModelResponse {
                raw_text,
                upstream_status: UpstreamStatus::Ok,
            }),
            Err(err) => {
                tracing::error!(status = ?err.status, detail = %err.detail, "upstream model call failed");
                Err(err.into())
            }
        }
    }
}

fn classify_transport_error(err: reqwest::Error) -> UpstreamError {
    let status = if err.is_timeout() {
        UpstreamStatus::Timeout
    } else {
        UpstreamStatus::NetworkError
    };
    UpstreamError::new(status, err.to_string())
}

/// Pulls `choices[0].message.content` out of a completion envelope.
///
/// Non-string content is re-serialized as JSON text. A missing or null field
/// yields empty text, which later degrades to the fallback result.
fn extract_completion(body: &str) -> Result<String, UpstreamError> {
    let envelope: Value = serde_json::from_str(body).map_err(|e| {
        UpstreamError::new(
            UpstreamStatus::ServerError,
            format!("invalid completion envelope: {e}"),
        )
    })?;

    Ok(match envelope.pointer("/choices/0/message/content") {
        Some(Value::String(text)) => text.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    })
}
