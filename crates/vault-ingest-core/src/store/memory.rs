//! In-memory [`ContentApi`] implementation for tests and local dry runs.
//!
//! Enforces the same compare-and-swap rule as the remote: a write must carry
//! the current hash of an existing file, and no hash for a new one. Every
//! accepted write bumps a global revision, so hashes change on every commit
//! even when the bytes do not.
//!
//! Failures and competing writers can be queued per path to exercise retry
//! paths deterministically.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::models::{CommitResult, RemoteFile, WriteRequest};

use super::ContentApi;

/// A commit accepted by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Path written by the commit.
    pub path: String,
    /// Commit message; `seed` and `concurrent writer` for test-side writes.
    pub message: String,
    /// Content hash assigned by the commit.
    pub content_hash: String,
}

struct StoredFile {
    content: Vec<u8>,
    hash: String,
}

#[derive(Default)]
struct State {
    files: HashMap<String, StoredFile>,
    revision: u64,
    commits: Vec<Commit>,
    reads: u64,
    write_attempts: u64,
    injected_failures: HashMap<String, VecDeque<StoreError>>,
    injected_read_failures: HashMap<String, VecDeque<StoreError>>,
    competing_writes: HashMap<String, VecDeque<Vec<u8>>>,
}

impl State {
    fn commit(&mut self, path: &str, content: Vec<u8>, message: &str) -> CommitResult {
        self.revision += 1;
        let hash = content_hash(self.revision, path, &content);
        let commit_sha = content_hash(self.revision, message, hash.as_bytes());
        self.files.insert(
            path.to_string(),
            StoredFile {
                content,
                hash: hash.clone(),
            },
        );
        self.commits.push(Commit {
            path: path.to_string(),
            message: message.to_string(),
            content_hash: hash.clone(),
        });
        CommitResult {
            path: path.to_string(),
            content_hash: hash,
            commit_sha: Some(commit_sha),
        }
    }
}

fn content_hash(revision: u64, path: &str, content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(revision.to_be_bytes());
    hasher.update(path.as_bytes());
    hasher.update([0u8]);
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// In-memory content store with optimistic concurrency.
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    /// Seed a file directly, recording a commit. Returns the new hash.
    pub fn put(&self, path: &str, content: impl Into<Vec<u8>>) -> String {
        let mut state = self.state.lock().unwrap();
        state.commit(path, content.into(), "seed").content_hash
    }

    /// Current bytes at `path`, bypassing read accounting.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.files.get(path).map(|f| f.content.clone())
    }

    /// Current content at `path` as a lossy UTF-8 string.
    pub fn get_text(&self, path: &str) -> Option<String> {
        self.get(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Make the next write to `path` fail with `error` before any checks.
    pub fn inject_failure(&self, path: &str, error: StoreError) {
        let mut state = self.state.lock().unwrap();
        state
            .injected_failures
            .entry(path.to_string())
            .or_default()
            .push_back(error);
    }

    /// Make the next read of `path` fail with `error`. Queued errors are
    /// returned one per read, oldest first.
    pub fn inject_read_failure(&self, path: &str, error: StoreError) {
        let mut state = self.state.lock().unwrap();
        state
            .injected_read_failures
            .entry(path.to_string())
            .or_default()
            .push_back(error);
    }

    /// Commit `content` to `path` on behalf of another writer immediately
    /// before the next write to `path` is evaluated, so that write observes
    /// a newer version than the one its caller read.
    pub fn inject_concurrent_write(&self, path: &str, content: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().unwrap();
        state
            .competing_writes
            .entry(path.to_string())
            .or_default()
            .push_back(content.into());
    }

    /// All accepted commits, oldest first.
    pub fn commits(&self) -> Vec<Commit> {
        self.state.lock().unwrap().commits.clone()
    }

    /// Number of write calls received, accepted or not.
    pub fn write_attempts(&self) -> u64 {
        self.state.lock().unwrap().write_attempts
    }

    /// Number of read calls received.
    pub fn read_count(&self) -> u64 {
        self.state.lock().unwrap().reads
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentApi for InMemoryStore {
    async fn read(&self, path: &str) -> Result<Option<RemoteFile>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if let Some(err) = state
            .injected_read_failures
            .get_mut(path)
            .and_then(|q| q.pop_front())
        {
            return Err(err);
        }
        Ok(state.files.get(path).map(|f| RemoteFile {
            path: path.to_string(),
            content: f.content.clone(),
            hash: f.hash.clone(),
        }))
    }

    async fn write(&self, request: &WriteRequest) -> Result<CommitResult, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.write_attempts += 1;

        if let Some(content) = state
            .competing_writes
            .get_mut(&request.path)
            .and_then(|q| q.pop_front())
        {
            state.commit(&request.path, content, "concurrent writer");
        }

        if let Some(err) = state
            .injected_failures
            .get_mut(&request.path)
            .and_then(|q| q.pop_front())
        {
            return Err(err);
        }

        let current = state.files.get(&request.path).map(|f| f.hash.as_str());
        let matches = match (current, request.expected_hash.as_deref()) {
            (Some(current), Some(expected)) => current == expected,
            (None, None) => true,
            _ => false,
        };
        if !matches {
            return Err(StoreError::Conflict {
                path: request.path.clone(),
            });
        }

        Ok(state.commit(&request.path, request.content.clone(), &request.message))
    }
}
