//! LLM completion endpoint client
//!
//! The endpoint takes `{"prompt": ..., "n_predict": ...}` and answers with
//! `{"content": ...}`. Both event extraction and chat go through here.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Trait for prompt completion
///
/// Implementations:
/// - `HttpLlmClient`: completion endpoint over HTTP
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete a prompt, producing at most `n_predict` tokens
    async fn complete(&self, prompt: &str, n_predict: u32) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: String,
}

/// HTTP completion client with retry
pub struct HttpLlmClient {
    client: Client,
    endpoint: String,
    max_retries: u32,
}

impl HttpLlmClient {
    /// Create a client from config
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            max_retries: config.max_retries,
        })
    }

    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        let delay = backoff_delay(attempt);
                        tracing::warn!(
                            "Completion failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::llm("Unknown error")))
    }

    async fn complete_once(&self, prompt: &str, n_predict: u32) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&CompletionRequest { prompt, n_predict })
            .send()
            .await
            .map_err(|e| Error::llm(format!("Completion request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::llm(format!("Failed to read completion body: {}", e)))?;

        if !status.is_success() {
            return Err(Error::llm(format!("Completion failed: HTTP {} - {}", status, body)));
        }

        parse_completion(&body)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str, n_predict: u32) -> Result<String> {
        tracing::debug!(
            "Requesting completion ({} prompt chars, n_predict={})",
            prompt.len(),
            n_predict
        );
        self.retry_request(|| self.complete_once(prompt, n_predict))
            .await
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Longest wait between retries
const MAX_BACKOFF_SECS: u64 = 60;

fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt).min(MAX_BACKOFF_SECS))
}

/// Unwrap the `{"content": ...}` envelope
pub fn parse_completion(body: &str) -> Result<String> {
    serde_json::from_str::<CompletionResponse>(body)
        .map(|r| r.content)
        .map_err(|e| Error::llm(format!("Malformed completion envelope: {}", e)))
}
