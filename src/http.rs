//! HTTP plumbing for talking to the origin site.
//!
//! [`Fetcher`] owns one `reqwest::Client` (custom user agent and timeout)
//! plus a [`Pacer`] that keeps a minimum spacing between requests, so the
//! origin is never hit faster than the configured delay even when several
//! fetches are in flight.

use crate::config::HttpConfig;
use crate::errors::FetchError;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, instrument};

/// Enforces a minimum interval between consecutive requests.
#[derive(Debug)]
pub struct Pacer {
    min_spacing: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last: Mutex::new(None),
        }
    }

    /// Wait until at least `min_spacing` has passed since the previous slot.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let next = prev + self.min_spacing;
            if next > Instant::now() {
                sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    pacer: Pacer,
}

impl Fetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            pacer: Pacer::new(config.request_delay()),
        })
    }

    /// GET a page and return its body, failing on non-2xx statuses.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        self.pacer.wait().await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }
}
