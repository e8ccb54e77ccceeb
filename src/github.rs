//! GitHub repository contents client.
//!
//! Implements [`ContentApi`] against the REST contents endpoint of one
//! `owner/repo` on one branch:
//!
//! | Operation | Request | Timeout |
//! |-----------|---------|---------|
//! | read | `GET /repos/{owner}/{repo}/contents/{path}?ref={branch}` | 10 s |
//! | write | `PUT /repos/{owner}/{repo}/contents/{path}` | 30 s |
//!
//! File content travels base64-encoded in both directions. GitHub answers a
//! stale or missing `sha` with 409 or 422, which is surfaced as
//! [`StoreError::Conflict`].
//!
//! # Authentication
//!
//! A personal access token is sent as `Authorization: token <token>`. The
//! token comes from the `GITHUB_TOKEN` environment variable (see
//! [`crate::config::github_token`]).

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use vault_ingest_core::{CommitResult, ContentApi, RemoteFile, StoreError, WriteRequest};

use crate::config::GitHubConfig;
use crate::transport::TransportRetry;

pub const READ_TIMEOUT: Duration = Duration::from_secs(10);
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated handle on one repository branch.
///
/// Holds a single connection pool; construct once and share by reference.
pub struct GitHubContents {
    client: reqwest::Client,
    config: GitHubConfig,
    retry: TransportRetry,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Serialize)]
struct PutContentsBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutContentsResponse {
    content: ShaRef,
    #[serde(default)]
    commit: Option<ShaRef>,
}

#[derive(Deserialize)]
struct ShaRef {
    sha: String,
}

impl GitHubContents {
    pub fn new(config: GitHubConfig, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("token {}", token))
            .context("GitHub token contains characters not allowed in a header")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("vault-ingest/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build GitHub HTTP client")?;

        Ok(Self {
            client,
            config,
            retry: TransportRetry::default(),
        })
    }

    pub fn with_transport_retry(mut self, retry: TransportRetry) -> Self {
        self.retry = retry;
        self
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            encode_path(path)
        )
    }
}

/// Percent-encode each path segment, keeping `/` separators.
fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn transport_error(path: &str, err: reqwest::Error) -> StoreError {
    StoreError::Transient {
        path: path.to_string(),
        message: err.to_string(),
    }
}

/// Map a non-success response to the store taxonomy. `conflict_statuses`
/// lists the codes that mean "hash mismatch" for this operation.
async fn status_error(path: &str, resp: Response, conflict_statuses: &[StatusCode]) -> StoreError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if conflict_statuses.contains(&status) {
        StoreError::Conflict {
            path: path.to_string(),
        }
    } else if status.is_server_error() {
        StoreError::Transient {
            path: path.to_string(),
            message: format!("GitHub API error {}: {}", status, body),
        }
    } else {
        StoreError::Rejected {
            path: path.to_string(),
            status: status.as_u16(),
            message: body,
        }
    }
}

/// Decode the base64 payload of a contents response. GitHub wraps the
/// encoded text at 60 columns.
fn decode_content(path: &str, raw: &ContentsResponse) -> Result<Vec<u8>, StoreError> {
    if let Some(encoding) = raw.encoding.as_deref() {
        if encoding != "base64" {
            return Err(StoreError::Malformed {
                path: path.to_string(),
                message: format!("unsupported content encoding '{}'", encoding),
            });
        }
    }
    let compact: String = raw
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    BASE64.decode(compact).map_err(|e| StoreError::Malformed {
        path: path.to_string(),
        message: format!("invalid base64 content: {}", e),
    })
}

#[async_trait]
impl ContentApi for GitHubContents {
    async fn read(&self, path: &str) -> Result<Option<RemoteFile>, StoreError> {
        let url = self.contents_url(path);
        let resp = self
            .retry
            .send(|| {
                self.client
                    .get(&url)
                    .query(&[("ref", self.config.branch.as_str())])
                    .timeout(READ_TIMEOUT)
            })
            .await
            .map_err(|e| transport_error(path, e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let err = status_error(path, resp, &[]).await;
            tracing::error!(path, error = %err, "failed to read file");
            return Err(err);
        }

        let raw: ContentsResponse = resp.json().await.map_err(|e| StoreError::Malformed {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let content = decode_content(path, &raw)?;

        Ok(Some(RemoteFile {
            path: path.to_string(),
            content,
            hash: raw.sha,
        }))
    }

    async fn write(&self, request: &WriteRequest) -> Result<CommitResult, StoreError> {
        let path = request.path.as_str();
        let url = self.contents_url(path);
        let body = PutContentsBody {
            message: &request.message,
            content: BASE64.encode(&request.content),
            branch: &self.config.branch,
            sha: request.expected_hash.as_deref(),
        };

        let resp = self
            .retry
            .send(|| self.client.put(&url).json(&body).timeout(WRITE_TIMEOUT))
            .await
            .map_err(|e| transport_error(path, e))?;

        if !resp.status().is_success() {
            return Err(status_error(
                path,
                resp,
                &[StatusCode::CONFLICT, StatusCode::UNPROCESSABLE_ENTITY],
            )
            .await);
        }

        let parsed: PutContentsResponse = resp.json().await.map_err(|e| StoreError::Malformed {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        Ok(CommitResult {
            path: path.to_string(),
            content_hash: parsed.content.sha,
            commit_sha: parsed.commit.map(|c| c.sha),
        })
    }
}
