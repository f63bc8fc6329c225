//! Embedding client for OpenAI-compatible `/embeddings` endpoints.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const MAX_RETRIES: usize = 3;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("embedding HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding request timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("embedding endpoint rate limited after {retries} attempts")]
    RateLimited { retries: usize },

    #[error("embedding endpoint returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("invalid embedding client configuration: {0}")]
    Config(String),
}

/// Turns text into vectors. Implementations must return one vector per input,
/// in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Async embeddings client that talks to OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: String,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        if api_key.trim().is_empty() {
            return Err(EmbeddingError::Config("missing embedding API key".to_string()));
        }
        if model.trim().is_empty() {
            return Err(EmbeddingError::Config("missing embedding model name".to_string()));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| EmbeddingError::Config("invalid embedding API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(headers).build()?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model,
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_once(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };
        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        into_vectors(parsed, inputs.len())
    }

    fn should_retry(error: &EmbeddingError) -> bool {
        match error {
            EmbeddingError::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            EmbeddingError::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            EmbeddingError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn retry_backoff(attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        Duration::from_millis(500 * (1 << capped))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = with_retries(self.timeout, || self.send_once(inputs)).await?;
        debug!("Embedded {} inputs with {}", inputs.len(), self.model);
        Ok(vectors)
    }
}

/// Runs `send` until it succeeds, fails with a non-retryable error, or
/// `MAX_RETRIES` attempts are spent. Each attempt is bounded by `timeout`.
async fn with_retries<T, F, Fut>(timeout: Duration, mut send: F) -> Result<T, EmbeddingError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EmbeddingError>>,
{
    let mut attempt = 0usize;
    loop {
        let error = match tokio::time::timeout(timeout, send()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => e,
            Err(_) => EmbeddingError::Timeout { after: timeout },
        };

        if !OpenAiEmbedder::should_retry(&error) {
            return Err(error);
        }
        attempt += 1;
        if attempt >= MAX_RETRIES {
            return Err(match error {
                EmbeddingError::Api { status: 429, .. } => {
                    EmbeddingError::RateLimited { retries: attempt }
                }
                other => other,
            });
        }
        let delay = OpenAiEmbedder::retry_backoff(attempt);
        warn!("Embedding attempt {attempt} failed ({error}), retrying after {}ms", delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}

/// Puts the returned vectors back in input order and checks there is one per input.
fn into_vectors(
    mut parsed: EmbeddingResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    parsed.data.sort_by_key(|entry| entry.index);
    if parsed.data.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            got: parsed.data.len(),
        });
    }
    Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
