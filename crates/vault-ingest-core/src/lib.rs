//! # Vault Ingest Core
//!
//! Runtime-free logic shared by Vault Ingest: the remote file model, the
//! error taxonomy for optimistic-concurrency writes, the [`store::ContentApi`]
//! trait, an in-memory store with compare-and-swap semantics, and the
//! text-merge rules applied by append.
//!
//! This crate contains no tokio, HTTP client, or filesystem I/O.

pub mod error;
pub mod merge;
pub mod models;
pub mod store;

pub use error::StoreError;
pub use models::{CommitResult, RemoteFile, WriteRequest};
pub use store::ContentApi;
