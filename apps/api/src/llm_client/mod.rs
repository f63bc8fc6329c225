/// LLM Client: the single point of entry for all text-generation calls in Resumatch.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Pipeline code depends on the `TextGenerator` trait, never on `LlmClient`, so
/// extraction and scoring can run against deterministic fakes in tests.
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod json;
pub mod prompts;

use json::{recover_object, JsonRecoveryError};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Model used when `LLM_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM call timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error(transparent)]
    Recovery(#[from] JsonRecoveryError),
}

impl LlmError {
    /// Transient failures that are safe to retry with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Timeout { .. } | LlmError::RateLimited { .. } => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

/// The text-generation collaborator. `generate` returns the model's raw text,
/// which may or may not be well-formed JSON.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        system: &str,
        temperature: f32,
    ) -> Result<String, LlmError>;
}

/// Calls the generator and decodes the recovered JSON object into `T`.
/// The prompt must instruct the model to return a JSON object.
pub async fn generate_json<T: DeserializeOwned>(
    generator: &dyn TextGenerator,
    prompt: &str,
    system: &str,
    temperature: f32,
) -> Result<T, LlmError> {
    let raw = generator.generate(prompt, system, temperature).await?;
    let object = recover_object(&raw)?;
    Ok(serde_json::from_value(serde_json::Value::Object(object))?)
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with a per-attempt timeout and retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().build()?,
            api_key,
            model,
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes a raw call to the Messages API, returning the full response object.
    /// Retries timeouts, 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(
        &self,
        prompt: &str,
        system: &str,
        temperature: f32,
    ) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        with_retries(self.timeout, || self.send_once(&request_body)).await
    }

    async fn send_once(&self, request_body: &AnthropicRequest<'_>) -> Result<LlmResponse, LlmError> {
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request_body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || status.is_server_error() {
                warn!("LLM API returned {}: {}", status, body);
            }
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }
}

/// Runs `send` up to `MAX_RETRIES` times, each attempt bounded by `timeout`.
/// Non-retryable errors end the loop at once; a run that ends on 429 becomes
/// `RateLimited`.
async fn with_retries<T, F, Fut>(timeout: Duration, mut send: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            // Exponential backoff before each retry: 1s, then 2s
            let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
            warn!(
                "LLM call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let error = match tokio::time::timeout(timeout, send()).await {
            Ok(Ok(response)) => return Ok(response),
            Ok(Err(e)) => e,
            Err(_) => LlmError::Timeout { after: timeout },
        };

        if !error.is_retryable() {
            return Err(error);
        }
        last_error = Some(error);
    }

    Err(match last_error {
        Some(LlmError::Api { status: 429, .. }) | None => LlmError::RateLimited {
            retries: MAX_RETRIES,
        },
        Some(e) => e,
    })
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(
        &self,
        prompt: &str,
        system: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let response = self.call(prompt, system, temperature).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn api_error(status: u16) -> LlmError {
        LlmError::Api {
            status,
            message: "upstream says no".to_string(),
        }
    }

    struct CannedGenerator(&'static str);

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, _: &str, _: &str, _: f32) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    #[derive(Debug, Deserialize)]
    struct Verdict {
        match_score: u32,
    }

    #[test]
    fn test_response_text_picks_first_text_block() {
        let response: LlmResponse = serde_json::from_str(
            r#"{
                "content": [{"type": "tool_use"}, {"type": "text", "text": "hello"}],
                "usage": {"input_tokens": 3, "output_tokens": 1}
            }"#,
        )
        .unwrap();
        assert_eq!(response.text(), Some("hello"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::Timeout {
            after: Duration::from_secs(5)
        }
        .is_retryable());
        assert!(LlmError::RateLimited { retries: 3 }.is_retryable());
        assert!(LlmError::Api {
            status: 503,
            message: String::new()
        }
        .is_retryable());
        assert!(!LlmError::Api {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!LlmError::EmptyContent.is_retryable());
    }

    #[tokio::test]
    async fn test_generate_json_tolerates_surrounding_prose() {
        let generator = CannedGenerator("Sure! Here it is:\n{\"match_score\": 42}\nThanks.");
        let verdict: Verdict = generate_json(&generator, "p", "s", 0.3).await.unwrap();
        assert_eq!(verdict.match_score, 42);
    }

    #[tokio::test]
    async fn test_generate_json_reports_missing_object() {
        let generator = CannedGenerator("I cannot help with that.");
        let err = generate_json::<Verdict>(&generator, "p", "s", 0.3)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LlmError::Recovery(JsonRecoveryError::NoJsonFound)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_429_ends_rate_limited_after_backoff() {
        let calls = AtomicUsize::new(0);
        let start = tokio::time::Instant::now();

        let err = with_retries::<(), _, _>(Duration::from_secs(60), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(api_error(429)) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, LlmError::RateLimited { retries: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_call_ends_as_timeout() {
        let calls = AtomicUsize::new(0);

        let err = with_retries::<(), _, _>(Duration::from_millis(250), || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending()
        })
        .await
        .unwrap_err();

        assert!(matches!(err, LlmError::Timeout { after } if after == Duration::from_millis(250)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.to_string(), "LLM call timed out after 250ms");
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_retried() {
        let calls = AtomicUsize::new(0);

        let err = with_retries::<(), _, _>(Duration::from_secs(60), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(api_error(400)) }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, LlmError::Api { status: 400, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_then_success_recovers() {
        let calls = AtomicUsize::new(0);

        let value = with_retries(Duration::from_secs(60), || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(api_error(503))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 1);
    }
}
