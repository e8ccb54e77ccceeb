//! Remote file store client: optimistic-concurrency reads and writes with
//! conflict-safe retry.
//!
//! [`StoreClient`] wraps any [`ContentApi`] and owns the retry policy.
//!
//! # Write retry
//!
//! | Failure | Action while attempts remain | On exhaustion |
//! |---------|------------------------------|---------------|
//! | `Conflict` | wait, re-read the hash, resend the same bytes | `ConflictExceeded` |
//! | `Transient` | wait, resend with the same hash | `WriteFailed` |
//! | `Rejected` / `Malformed` | none | returned as-is |
//!
//! The wait after attempt `n` (0-based) is `backoff_base * 2^n`, so the
//! defaults give 1 s, 2 s, 4 s, 8 s.
//!
//! Resending the same bytes after a conflict overwrites whatever the other
//! writer committed. That is only correct for callers that do not merge;
//! appends go through [`crate::vault::Vault::append_text`], which re-merges
//! on every attempt.

use std::time::Duration;

use vault_ingest_core::{CommitResult, ContentApi, RemoteFile, StoreError, WriteRequest};

use crate::config::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total write attempts, including the first. Must be >= 1.
    pub max_attempts: u32,
    /// Wait after the first failed attempt; doubles after each further one.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff_base: config.backoff_base(),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.pow(attempt.min(16))
    }

    pub(crate) async fn wait(&self, attempt: u32) {
        tokio::time::sleep(self.backoff(attempt)).await;
    }
}

/// Client for one repository/branch, constructed explicitly and passed by
/// reference to whoever needs it.
pub struct StoreClient<A> {
    api: A,
    policy: RetryPolicy,
}

impl<A: ContentApi> StoreClient<A> {
    pub fn new(api: A) -> Self {
        Self::with_policy(api, RetryPolicy::default())
    }

    pub fn with_policy(api: A, policy: RetryPolicy) -> Self {
        Self { api, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Current content and hash of `path`, or `None` if it does not exist.
    ///
    /// Not retried here; the HTTP transport underneath already retries
    /// idempotent failures.
    pub async fn read_file(&self, path: &str) -> Result<Option<RemoteFile>, StoreError> {
        self.api.read(path).await
    }

    /// One conditional write with no retry.
    pub async fn try_write(&self, request: &WriteRequest) -> Result<CommitResult, StoreError> {
        self.api.write(request).await
    }

    /// Conditional create-or-replace using the client's attempt budget.
    pub async fn write_file(
        &self,
        path: &str,
        content: Vec<u8>,
        message: &str,
        expected_hash: Option<String>,
    ) -> Result<CommitResult, StoreError> {
        self.write_file_with(path, content, message, expected_hash, self.policy.max_attempts)
            .await
    }

    /// Conditional create-or-replace with an explicit attempt budget.
    pub async fn write_file_with(
        &self,
        path: &str,
        content: Vec<u8>,
        message: &str,
        expected_hash: Option<String>,
        max_attempts: u32,
    ) -> Result<CommitResult, StoreError> {
        if max_attempts == 0 {
            return Err(StoreError::WriteFailed {
                path: path.to_string(),
                attempts: 0,
                message: "max_attempts must be at least 1".to_string(),
            });
        }

        let mut request = WriteRequest::new(path, content, message).with_expected_hash(expected_hash);

        let mut attempt = 0;
        loop {
            let err = match self.api.write(&request).await {
                Ok(commit) => return Ok(commit),
                Err(e) if e.is_retryable() => e,
                Err(e) => {
                    tracing::error!(path, error = %e, "write rejected");
                    return Err(e);
                }
            };

            attempt += 1;
            if attempt >= max_attempts {
                tracing::error!(path, attempts = max_attempts, error = %err, "max retries exceeded");
                return Err(err.exhausted(max_attempts));
            }

            tracing::warn!(path, attempt, error = %err, "write failed, retrying");
            self.policy.wait(attempt - 1).await;

            if let StoreError::Conflict { .. } = err {
                match self.api.read(path).await {
                    Ok(current) => request.expected_hash = current.map(|f| f.hash),
                    Err(e) => {
                        tracing::warn!(path, error = %e, "could not refresh hash after conflict");
                    }
                }
            }
        }
    }
}
