//! Opt-in HTTP retry policy with exponential backoff.
//!
//! The backend defines no retry contract of its own, so retrying is a
//! caller decision: [`crate::ApiClient::with_retry`] routes every request
//! through [`send_with_retry`]. The policy retries transport failures and
//! HTTP 408/429/5xx with exponential backoff, down-jitter, and a
//! `Retry-After` override, and keeps one `Idempotency-Key` across all
//! attempts so the backend can deduplicate the oracle POST.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, header::HeaderMap};
use uuid::Uuid;

/// Backoff and attempt limits for [`send_with_retry`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries (not counting the initial request).
    pub max_retries: u32,
    /// Backoff delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on the backoff delay.
    pub max_delay: Duration,
    /// Down-jitter factor (0.25 = delay shortened by up to 25%).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

/// Parse `Retry-After` (seconds) or `Retry-After-Ms` (milliseconds).
///
/// Values outside `(0, 60s)` are ignored so a misbehaving server cannot
/// stall the client.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(value) = headers.get("retry-after-ms")
        && let Ok(text) = value.to_str()
        && let Ok(ms) = text.parse::<f64>()
    {
        let duration = Duration::from_secs_f64(ms / 1000.0);
        if duration > Duration::ZERO && duration < Duration::from_secs(60) {
            return Some(duration);
        }
    }

    if let Some(value) = headers.get("retry-after")
        && let Ok(text) = value.to_str()
        && let Ok(secs) = text.parse::<u64>()
    {
        let duration = Duration::from_secs(secs);
        if duration > Duration::ZERO && duration < Duration::from_secs(60) {
            return Some(duration);
        }
    }

    None
}

#[must_use]
pub fn should_retry(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500..=599)
}

/// Delay before retry number `backoff_step + 1`, honoring `Retry-After`.
#[must_use]
pub fn retry_delay(
    backoff_step: u32,
    config: &RetryConfig,
    headers: Option<&HeaderMap>,
) -> Duration {
    if let Some(headers) = headers
        && let Some(delay) = parse_retry_after(headers)
    {
        return delay;
    }

    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(backoff_step as i32);
    let capped = base.min(config.max_delay.as_secs_f64());
    let jitter = 1.0 - rand::random::<f64>() * config.jitter_factor;
    Duration::from_secs_f64(capped * jitter)
}

#[must_use]
fn idempotency_key() -> String {
    format!("truthweave-{}", Uuid::new_v4())
}

/// Outcome of a retried request.
///
/// Success and failure are structurally distinct so callers cannot treat an
/// error response as a payload by accident.
#[derive(Debug)]
pub enum RetryOutcome {
    /// 2xx response.
    Success(Response),
    /// Non-2xx response after exhausting retries (or a non-retryable
    /// status). Returned whole for error-body inspection.
    HttpError(Response),
    /// Transport failure after exhausting retries.
    ConnectionError {
        attempts: u32,
        source: reqwest::Error,
    },
    /// Transport failure on the first attempt that cannot be retried.
    NonRetryable(reqwest::Error),
}

impl RetryOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Send a request, retrying per `config`.
///
/// `build_request` is invoked once per attempt; reqwest requests are not
/// reusable after send. All attempts carry the same `Idempotency-Key` and
/// an `X-Retry-Count` header.
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let key = idempotency_key();

    for retry_count in 0..=config.max_retries {
        let is_last = retry_count == config.max_retries;
        let request = build_request()
            .header("X-Retry-Count", retry_count.to_string())
            .header("Idempotency-Key", &key);

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return RetryOutcome::Success(response);
                }

                if is_last || !should_retry(status) {
                    return RetryOutcome::HttpError(response);
                }

                let delay = retry_delay(retry_count, config, Some(response.headers()));
                tracing::debug!(
                    status = %status,
                    retry_count = retry_count + 1,
                    delay_ms = delay.as_millis(),
                    "retrying request after error status"
                );
                tokio::time::sleep(delay).await;
            }
            Err(source) => {
                if !is_retryable_error(&source) {
                    return if retry_count == 0 {
                        RetryOutcome::NonRetryable(source)
                    } else {
                        RetryOutcome::ConnectionError {
                            attempts: retry_count + 1,
                            source,
                        }
                    };
                }

                if is_last {
                    return RetryOutcome::ConnectionError {
                        attempts: retry_count + 1,
                        source,
                    };
                }

                let delay = retry_delay(retry_count, config, None);
                tracing::debug!(
                    error = %source,
                    retry_count = retry_count + 1,
                    delay_ms = delay.as_millis(),
                    "retrying request after connection error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    unreachable!("loop always returns on the final attempt")
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}
