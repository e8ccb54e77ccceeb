//! Data types for files held in the remote document repository.
//!
//! Nothing here is persisted locally: a [`RemoteFile`] is a snapshot taken
//! by a read, and a [`WriteRequest`] lives only for one logical write.

use crate::error::StoreError;

/// A file as observed in the remote repository at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Path relative to the repository root.
    pub path: String,
    /// Raw bytes, already decoded from the transport encoding.
    pub content: Vec<u8>,
    /// Opaque version token (the upstream API calls it `sha`).
    pub hash: String,
}

impl RemoteFile {
    /// Decode the content as UTF-8 text.
    pub fn text(&self) -> Result<&str, StoreError> {
        std::str::from_utf8(&self.content).map_err(|e| StoreError::Malformed {
            path: self.path.clone(),
            message: format!("content is not valid UTF-8: {}", e),
        })
    }
}

/// One atomic create-or-replace operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// Path relative to the repository root.
    pub path: String,
    /// Full new content of the file; the write replaces it entirely.
    pub content: Vec<u8>,
    /// Commit message recorded in the remote history.
    pub message: String,
    /// Hash the writer last observed. `None` asserts the file does not exist.
    pub expected_hash: Option<String>,
}

impl WriteRequest {
    pub fn new(path: impl Into<String>, content: Vec<u8>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content,
            message: message.into(),
            expected_hash: None,
        }
    }

    /// Require the remote to still hold `hash` for the write to succeed.
    pub fn with_expected_hash(mut self, hash: Option<String>) -> Self {
        self.expected_hash = hash;
        self
    }
}

/// Outcome of a successful write: exactly one new commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResult {
    /// Path that was written.
    pub path: String,
    /// New content hash of the file after the commit.
    pub content_hash: String,
    /// Commit identifier, when the backend reports one.
    pub commit_sha: Option<String>,
}
