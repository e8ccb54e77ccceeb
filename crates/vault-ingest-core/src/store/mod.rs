//! Content API abstraction over a remote document repository.
//!
//! The [`ContentApi`] trait is the narrow interface the store client and
//! orchestrator are written against: one read and one conditional write,
//! each performed exactly once. Retry policy lives above this layer.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{CommitResult, RemoteFile, WriteRequest};

/// Read and conditionally write files in one repository/branch.
///
/// | Method | Outcome |
/// |--------|---------|
/// | [`read`](ContentApi::read) | `Ok(Some(file))`, `Ok(None)` when absent, or `Transient`/`Malformed`/`Rejected` |
/// | [`write`](ContentApi::write) | `Ok(commit)`, `Conflict` on a stale hash, or `Transient`/`Rejected` |
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Fetch the current content and hash of `path`.
    async fn read(&self, path: &str) -> Result<Option<RemoteFile>, StoreError>;

    /// Submit one create-or-replace. Must fail with [`StoreError::Conflict`]
    /// when `expected_hash` does not match the remote's current version.
    async fn write(&self, request: &WriteRequest) -> Result<CommitResult, StoreError>;
}

#[async_trait]
impl<T: ContentApi + ?Sized> ContentApi for std::sync::Arc<T> {
    async fn read(&self, path: &str) -> Result<Option<RemoteFile>, StoreError> {
        (**self).read(path).await
    }

    async fn write(&self, request: &WriteRequest) -> Result<CommitResult, StoreError> {
        (**self).write(request).await
    }
}
