//! LLM API interaction with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait defining async LLM interaction; the structurer
//!   only depends on this, so tests substitute canned replies
//! - [`ChatClient`]: OpenAI-compatible `/chat/completions` client
//! - [`RetryAsk`]: decorator that adds retry logic to any `AskAsync` implementation
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at the base delay (1 second by default)
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::config::ModelConfig;
use crate::errors::FetchError;
use rand::{Rng, rng};
use serde_json::{Value, json};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// System turn sent with every request.
pub const SYSTEM_INSTRUCTION: &str = "Always return strictly JSON.";

/// Instruction turn naming the record schema the reply must follow.
pub const SCHEMA_INSTRUCTION: &str = r#"You will receive one Hurricanes news article blob that begins with:
SOURCE_URL, TITLE, AUTHOR, PUBLISHED, followed by the body text.

Return ONLY VALID JSON matching the StructuredRecord schema. No prose, no code fences. Schema:
{
  "id": string,                 // the final path segment of source_url
  "title": string,
  "author": string|null,
  "published_at": string|null,  // ISO8601 if possible, else null
  "summary": string,            // 2-3 sentences
  "tags": string[],             // simple hockey tags if obvious
  "source_url": string,
  "extracted_at": string        // set to now if not provided
}
Output a SINGLE JSON object (not an array)."#;

/// Trait for async LLM interaction.
///
/// Implementors send text to an LLM and return its reply.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, FetchError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// `max_retries` counts retries, not attempts: the default of 2 makes up to
/// three model calls per document. A missing credential is returned at once.
/// This sits below the structurer, so its single re-ask for a truncated reply
/// starts a fresh round of attempts.
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = ChatClient::new(&config.model, api_key)?;
    /// let retry_client = RetryAsk::new(client, 2, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e @ FetchError::NotConfigured(_)) => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "Model call failed; retries exhausted"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let shift = u32::try_from(attempt - 1).unwrap_or(u32::MAX).min(16);
                    let mut delay = self.base_delay.saturating_mul(1 << shift);
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "Model call failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// OpenAI-compatible chat completions client.
///
/// Every request carries the system turn, the schema instruction turn and
/// the document as the user turn, with temperature 0.
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// `{base_url}/chat/completions`, tolerating a trailing slash.
pub fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

impl ChatClient {
    pub fn new(config: &ModelConfig, api_key: String) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            http,
            endpoint: chat_endpoint(&config.base_url),
            api_key,
            model: config.model.clone(),
        })
    }

    fn request_body(&self, text: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_INSTRUCTION },
                { "role": "system", "content": SCHEMA_INSTRUCTION },
                { "role": "user", "content": text },
            ],
            "temperature": 0,
        })
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

/// Reply text of the first choice; a `null` content is an empty reply.
pub fn extract_reply(value: &Value) -> Option<String> {
    let message = value.get("choices")?.get(0)?.get("message")?;
    match message.get("content") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Null) | None => Some(String::new()),
        Some(_) => None,
    }
}

impl AskAsync for ChatClient {
    type Response = String;

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response, FetchError> {
        let t0 = Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        let raw = response.text().await.map_err(|source| FetchError::Request {
            url: self.endpoint.clone(),
            source,
        })?;
        let dt = t0.elapsed();

        if !status.is_success() {
            let message = parse_error_message(&raw).unwrap_or(raw);
            warn!(elapsed_ms = dt.as_millis(), status = status.as_u16(), "API call failed");
            return Err(FetchError::Status {
                url: self.endpoint.clone(),
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = serde_json::from_str(&raw).map_err(|e| FetchError::Body {
            url: self.endpoint.clone(),
            message: e.to_string(),
        })?;
        let reply = extract_reply(&value).ok_or_else(|| FetchError::Body {
            url: self.endpoint.clone(),
            message: "missing choices[0].message.content".to_string(),
        })?;
        debug!(elapsed_ms = dt.as_millis(), chars = reply.len(), "API call succeeded");
        Ok(reply)
    }
}

/// Stand-in used when no API key is configured; every call fails fast so
/// the structurer emits fallback records without touching the network.
#[derive(Debug, Default)]
pub struct Unconfigured;

impl AskAsync for Unconfigured {
    type Response = String;

    async fn ask(&self, _text: &str) -> Result<Self::Response, FetchError> {
        Err(FetchError::NotConfigured("OPENAI_API_KEY"))
    }
}
