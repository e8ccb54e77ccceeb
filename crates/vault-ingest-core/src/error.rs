//! Error taxonomy for reads and conditional writes.
//!
//! A missing file is not an error: reads return `Ok(None)` for it.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The supplied content hash no longer matches the remote version.
    #[error("conflict writing {path}: file was modified concurrently")]
    Conflict { path: String },

    /// Network failure, timeout, or 5xx from the remote.
    #[error("transient error on {path}: {message}")]
    Transient { path: String, message: String },

    /// The remote answered with something that could not be decoded.
    #[error("malformed response for {path}: {message}")]
    Malformed { path: String, message: String },

    /// Any other non-success answer (auth, permissions, bad request).
    #[error("remote rejected {path} with status {status}: {message}")]
    Rejected {
        path: String,
        /// HTTP status returned by the remote.
        status: u16,
        message: String,
    },

    /// Every attempt hit a conflict; the caller should retry later.
    #[error("Conflict updating {path} after {attempts} attempts")]
    ConflictExceeded { path: String, attempts: u32 },

    /// Every attempt failed transiently. `message` is the last failure.
    #[error("failed to write {path} after {attempts} attempts: {message}")]
    WriteFailed {
        path: String,
        attempts: u32,
        message: String,
    },
}

impl StoreError {
    /// Whether a write that failed with this error may be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict { .. } | StoreError::Transient { .. })
    }

    /// Whether this error stems from concurrent modification.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict { .. } | StoreError::ConflictExceeded { .. }
        )
    }

    /// Convert a final retryable failure into its exhausted form.
    pub fn exhausted(self, attempts: u32) -> StoreError {
        match self {
            StoreError::Conflict { path } => StoreError::ConflictExceeded { path, attempts },
            StoreError::Transient { path, message } => StoreError::WriteFailed {
                path,
                attempts,
                message,
            },
            other => other,
        }
    }
}
