//! Append and upload patterns on top of [`StoreClient`].
//!
//! Two write shapes exist:
//!
//! - **append** ([`Vault::append_text`]): read-merge-write on a shared note
//!   file. Every attempt re-reads the file and re-merges before writing, so
//!   an entry committed by a concurrent writer between our read and our
//!   write is carried into the next attempt instead of being overwritten.
//! - **upload** ([`Vault::upload_binary`]): create or replace a uniquely
//!   named asset. No merge; on conflict the store client refreshes the hash
//!   and resends the same bytes.

use vault_ingest_core::merge::merge_append;
use vault_ingest_core::{CommitResult, ContentApi, StoreError, WriteRequest};

use crate::store::StoreClient;

pub struct Vault<'a, A> {
    store: &'a StoreClient<A>,
}

impl<'a, A: ContentApi> Vault<'a, A> {
    pub fn new(store: &'a StoreClient<A>) -> Self {
        Self { store }
    }

    /// Append `new_text` to the text file at `path`, creating it if absent.
    ///
    /// The commit either contains the whole merged content or nothing is
    /// committed. Conflicts and transient failures are retried with the
    /// store client's policy, re-running the read and merge each time.
    pub async fn append_text(
        &self,
        path: &str,
        new_text: &str,
        message: &str,
    ) -> Result<CommitResult, StoreError> {
        let policy = self.store.policy();
        if policy.max_attempts == 0 {
            return Err(StoreError::WriteFailed {
                path: path.to_string(),
                attempts: 0,
                message: "max_attempts must be at least 1".to_string(),
            });
        }

        let mut attempt = 0;
        loop {
            let err = match self.append_once(path, new_text, message).await {
                Ok(commit) => return Ok(commit),
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };

            attempt += 1;
            if attempt >= policy.max_attempts {
                tracing::error!(path, attempts = attempt, error = %err, "append gave up");
                return Err(err.exhausted(policy.max_attempts));
            }

            tracing::warn!(path, attempt, error = %err, "append failed, re-reading and retrying");
            policy.wait(attempt - 1).await;
        }
    }

    async fn append_once(
        &self,
        path: &str,
        new_text: &str,
        message: &str,
    ) -> Result<CommitResult, StoreError> {
        let (content, expected_hash) = match self.store.read_file(path).await? {
            Some(file) => (merge_append(Some(file.text()?), new_text), Some(file.hash)),
            None => (merge_append(None, new_text), None),
        };

        let request = WriteRequest::new(path, content.into_bytes(), message)
            .with_expected_hash(expected_hash);
        self.store.try_write(&request).await
    }

    /// Create or fully replace the file at `path` with `data`.
    pub async fn upload_binary(
        &self,
        path: &str,
        data: Vec<u8>,
        message: &str,
    ) -> Result<CommitResult, StoreError> {
        let expected_hash = self.store.read_file(path).await?.map(|f| f.hash);
        self.store
            .write_file(path, data, message, expected_hash)
            .await
    }
}
