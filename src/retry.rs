//! Retry with exponential backoff for rate-limited outbound calls.
//!
//! The executor knows nothing about the call it wraps: the caller hands in a
//! closure that performs exactly one attempt and yields a [`RawResponse`].

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetryError<E> {
    #[error("upstream returned {status}: {message}")]
    Upstream { status: StatusCode, message: String },
    #[error("request failed after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error(transparent)]
    Transport(E),
}

/// Status and body of a single attempt.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Read status and body off a reqwest response.
    pub async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status();
        let body = response.text().await?;
        Ok(Self { status, body })
    }
}

/// How many attempts to make and how long to wait between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub multiplier: u32,
    pub max_attempts: u32,
    /// Statuses that earn another attempt. Anything else non-2xx is terminal.
    pub retryable: fn(StatusCode) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            multiplier: 2,
            max_attempts: 5,
            retryable: is_rate_limited,
        }
    }
}

impl RetryPolicy {
    /// Wait before the attempt following `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(self.multiplier.saturating_pow(attempt))
    }
}

pub fn is_rate_limited(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
}

/// Run `request` under `policy` until it succeeds, hits a terminal status,
/// or the attempt budget runs out.
///
/// Transport errors are retried immediately; the error from the final
/// attempt is returned as-is inside [`RetryError::Transport`].
pub async fn execute<F, Fut, E>(
    policy: &RetryPolicy,
    mut request: F,
) -> Result<RawResponse, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RawResponse, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 0..max_attempts {
        let is_last = attempt + 1 == max_attempts;

        match request().await {
            Ok(response) if response.status.is_success() => return Ok(response),
            Ok(response) if (policy.retryable)(response.status) => {
                if is_last {
                    break;
                }
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    status = %response.status,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Ok(response) => {
                let message = provider_message(&response.body)
                    .unwrap_or_else(|| "request failed".to_string());
                return Err(RetryError::Upstream {
                    status: response.status,
                    message,
                });
            }
            Err(err) => {
                if is_last {
                    return Err(RetryError::Transport(err));
                }
                tracing::warn!(attempt = attempt + 1, error = %err, "transport error, retrying");
            }
        }
    }

    Err(RetryError::Exhausted {
        attempts: max_attempts,
    })
}

/// Pull a human-readable error message out of a provider's error body.
pub fn provider_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value
        .pointer("/error/message")
        .or_else(|| value.get("error").filter(|e| e.is_string()))
        .or_else(|| value.get("message"))?
        .as_str()?
        .trim();

    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}
