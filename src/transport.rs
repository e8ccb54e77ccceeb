//! HTTP transport retry shared by every outbound call.
//!
//! Retries connection failures, timeouts, and the gateway-style statuses
//! 500/502/503/504 with exponential backoff. The request is rebuilt for each
//! attempt. The last response is handed back as-is, so callers still map a
//! final 5xx to their own error type.

use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;

/// Statuses that are retried at the transport layer.
pub const RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportRetry {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Wait before the first retry; doubles for each later retry.
    pub backoff_base: Duration,
}

impl Default for TransportRetry {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_base: Duration::from_millis(300),
        }
    }
}

impl TransportRetry {
    /// Wait before retry number `retry` (1-based): 0.3s, 0.6s, 1.2s, ...
    pub fn delay(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        self.backoff_base * 2u32.pow(exp)
    }

    /// Send the request built by `build`, retrying transient failures.
    pub async fn send<F>(&self, mut build: F) -> reqwest::Result<Response>
    where
        F: FnMut() -> RequestBuilder,
    {
        let max = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let last = attempt >= max;
            match build().send().await {
                Ok(resp) if !last && is_retry_status(resp.status()) => {
                    tracing::debug!(
                        status = %resp.status(),
                        url = %resp.url(),
                        attempt,
                        "transient HTTP status, retrying"
                    );
                }
                Err(e) if !last && is_retryable_error(&e) => {
                    tracing::debug!(error = %e, attempt, "transport error, retrying");
                }
                other => return other,
            }
            tokio::time::sleep(self.delay(attempt)).await;
        }
    }
}

pub fn is_retry_status(status: StatusCode) -> bool {
    RETRY_STATUSES.contains(&status.as_u16())
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_from_base() {
        let retry = TransportRetry::default();
        assert_eq!(retry.delay(1), Duration::from_millis(300));
        assert_eq!(retry.delay(2), Duration::from_millis(600));
        assert_eq!(retry.delay(3), Duration::from_millis(1200));
    }

    #[test]
    fn only_gateway_statuses_retry() {
        assert!(is_retry_status(StatusCode::BAD_GATEWAY));
        assert!(is_retry_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_retry_status(StatusCode::NOT_IMPLEMENTED));
        assert!(!is_retry_status(StatusCode::CONFLICT));
        assert!(!is_retry_status(StatusCode::TOO_MANY_REQUESTS));
    }
}
