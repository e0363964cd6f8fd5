//! Shared HTTP request plumbing for adapters.
//!
//! Centralizes request execution, status mapping, logging, and the retry
//! policy so individual adapters only deal with their own request
//! signatures and response envelopes.
//!
//! Retry policy: transient errors (network, timeout, rate limit) are
//! retried with exponential backoff starting at 500 ms, growing by a
//! factor of 1.5, capped at 30 s, for at most 5 attempts per operation,
//! with random jitter added to each delay. A `Retry-After` header on a
//! 429 response overrides the computed backoff (still capped at 30 s).
//! Permanent errors surface immediately.

use rand::Rng;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::AdapterError;

/// Maximum attempts for one logical operation (1 initial + 4 retries).
pub(crate) const MAX_ATTEMPTS: u32 = 5;
/// First backoff delay.
const BACKOFF_BASE_MS: u64 = 500;
/// Multiplier applied per attempt.
const BACKOFF_FACTOR: f64 = 1.5;
/// Upper bound on any single delay.
const BACKOFF_CAP_MS: u64 = 30_000;
/// Upper bound on the random jitter added to each delay.
const JITTER_MS: u64 = 250;

/// Truncate a response body for debug logging.
pub(crate) fn truncate_for_log(text: &str) -> String {
    const LIMIT: usize = 512;
    if text.len() <= LIMIT {
        return text.to_string();
    }
    // Back off to a char boundary so multi-byte bodies cannot panic.
    let mut cut = LIMIT;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... ({} bytes)", &text[..cut], text.len())
}

/// HTTP utility function set.
pub(crate) struct HttpUtils;

impl HttpUtils {
    /// Perform an HTTP request and return `(status, body)`.
    ///
    /// Maps transport failures and generic HTTP statuses onto
    /// [`AdapterError`]: timeouts to `Timeout`, connection errors to
    /// `Unreachable`, 429 to `RateLimited` (capturing `Retry-After`),
    /// 401/403 to `Unauthorized`, and any 5xx to `Unreachable`. Other
    /// statuses are returned for the adapter to interpret against its
    /// provider's error envelope.
    pub async fn execute_request(
        request_builder: RequestBuilder,
        adapter_name: &str,
        method_name: &str,
        url: &str,
    ) -> Result<(u16, String), AdapterError> {
        log::debug!("[{adapter_name}] {method_name} {url}");

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout {
                    provider: adapter_name.to_string(),
                    detail: e.to_string(),
                }
            } else {
                AdapterError::Unreachable {
                    provider: adapter_name.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        log::debug!("[{adapter_name}] Response status: {status}");

        // Extract Retry-After before consuming the body.
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        if status == 429 {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{adapter_name}] Rate limited (HTTP 429), retry_after={retry_after:?}");
            return Err(AdapterError::RateLimited {
                provider: adapter_name.to_string(),
                retry_after,
                raw_message: Some(body),
            });
        }

        if matches!(status, 401 | 403) {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{adapter_name}] Unauthorized (HTTP {status})");
            return Err(AdapterError::Unauthorized {
                provider: adapter_name.to_string(),
                raw_message: Some(body),
            });
        }

        if status >= 500 {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{adapter_name}] Server error (HTTP {status})");
            return Err(AdapterError::Unreachable {
                provider: adapter_name.to_string(),
                detail: format!("HTTP {status}: {body}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| AdapterError::Unreachable {
                provider: adapter_name.to_string(),
                detail: format!("Failed to read response body: {e}"),
            })?;

        log::debug!("[{adapter_name}] Response body: {}", truncate_for_log(&body));

        Ok((status, body))
    }

    /// Parse a JSON response body.
    pub fn parse_json<T>(response_text: &str, adapter_name: &str) -> Result<T, AdapterError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(response_text).map_err(|e| {
            log::error!("[{adapter_name}] JSON parse failed: {e}");
            log::error!(
                "[{adapter_name}] Raw response: {}",
                truncate_for_log(response_text)
            );
            AdapterError::ParseError {
                provider: adapter_name.to_string(),
                detail: e.to_string(),
            }
        })
    }

    /// Perform an HTTP request with the standard retry policy applied.
    ///
    /// Only transient errors are retried; permanent and conflict errors
    /// surface to the caller on the first occurrence.
    pub async fn execute_request_with_retry(
        request_builder: RequestBuilder,
        adapter_name: &str,
        method_name: &str,
        url: &str,
    ) -> Result<(u16, String), AdapterError> {
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            // RequestBuilder is single-use; clone per attempt.
            let Some(req) = request_builder.try_clone() else {
                log::warn!("[{adapter_name}] Cannot clone request, disabling retry");
                return Self::execute_request(request_builder, adapter_name, method_name, url)
                    .await;
            };

            match Self::execute_request(req, adapter_name, method_name, url).await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt + 1 < MAX_ATTEMPTS && e.is_transient() => {
                    let delay = retry_delay(&e, attempt);
                    log::warn!(
                        "[{}] Request failed (attempt {}/{}), retrying in {:.1}s: {}",
                        adapter_name,
                        attempt + 1,
                        MAX_ATTEMPTS,
                        delay.as_secs_f32(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| AdapterError::Unreachable {
            provider: adapter_name.to_string(),
            detail: "All retries exhausted with no error captured".to_string(),
        }))
    }
}

/// Compute the delay before the next attempt.
///
/// A rate-limit error with `retry_after` uses that value (capped at the
/// backoff ceiling); everything else uses exponential backoff.
fn retry_delay(error: &AdapterError, attempt: u32) -> Duration {
    if let AdapterError::RateLimited {
        retry_after: Some(secs),
        ..
    } = error
    {
        Duration::from_millis((*secs * 1000).min(BACKOFF_CAP_MS))
    } else {
        backoff_delay(attempt)
    }
}

/// Exponential backoff with jitter: 500 ms, 750 ms, 1.125 s, …, capped
/// at 30 s, plus up to 250 ms of random jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = BACKOFF_FACTOR.powi(attempt.min(30) as i32);
    let base = ((BACKOFF_BASE_MS as f64) * exp) as u64;
    let jitter = rand::rng().random_range(0..=JITTER_MS);
    Duration::from_millis(base.min(BACKOFF_CAP_MS) + jitter)
}
