//! Retrying JSON HTTP client shared by every data source.

use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::SourceError;

/// Backoff delay before retry number `retry` (1-based): `base * 2^(retry-1)`.
pub fn exponential_backoff(base: Duration, retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent)
}

/// 429 and 5xx are worth another attempt; other statuses are final.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Retry behaviour of a [`RetryingClient`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Timeout of a single attempt.
    pub attempt_timeout: Duration,
    pub backoff: fn(Duration, u32) -> Duration,
    pub retryable: fn(StatusCode) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(4),
            backoff: exponential_backoff,
            retryable: is_retryable_status,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, retry: u32) -> Duration {
        (self.backoff)(self.base_delay, retry)
    }

    /// Longest one request can take: every attempt timing out plus every backoff.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        let backoff: Duration = (1..attempts).map(|retry| self.delay_for(retry)).sum();
        self.attempt_timeout.saturating_mul(attempts) + backoff
    }
}

/// HTTP client that retries throttled and failed requests per its policy.
#[derive(Clone)]
pub struct RetryingClient {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(policy: RetryPolicy) -> Self {
        let client = Client::builder()
            .user_agent("trend-scanner/0.1")
            .timeout(policy.attempt_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, policy }
    }

    /// GET `url` and decode the JSON body.
    ///
    /// Transport errors and retryable statuses are retried with backoff until
    /// `max_attempts` is reached. Any other non-2xx status fails immediately.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self
                .client
                .get(url)
                .header(ACCEPT, "application/json")
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    return response.json::<T>().await.map_err(|e| {
                        SourceError::Fetch(format!("malformed payload from {}: {}", url, e))
                    });
                }
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    let snippet: String = text.chars().take(200).collect();

                    if !(self.policy.retryable)(status) {
                        return Err(SourceError::Fetch(format!(
                            "HTTP {} from {}: {}",
                            status, url, snippet
                        )));
                    }
                    if attempt >= max_attempts {
                        return Err(SourceError::Fetch(format!(
                            "HTTP {} from {} after {} attempts: {}",
                            status, url, attempt, snippet
                        )));
                    }
                    warn!(
                        "HTTP {} from {}, retrying (attempt {}/{})",
                        status, url, attempt, max_attempts
                    );
                }
                Err(e) => {
                    if attempt >= max_attempts {
                        return Err(SourceError::Fetch(format!(
                            "request to {} failed after {} attempts: {}",
                            url, attempt, e
                        )));
                    }
                    warn!(
                        "Request to {} failed: {}, retrying (attempt {}/{})",
                        url, e, attempt, max_attempts
                    );
                }
            }

            let delay = self.policy.delay_for(attempt);
            debug!("Backing off {:?} before retrying {}", delay, url);
            tokio::time::sleep(delay).await;
        }
    }
}
