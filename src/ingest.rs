//! Ingestion workflow: post URL → images in the assets folder → one entry
//! appended to the note file.
//!
//! Image uploads run concurrently, each to its own path. A failed image is
//! logged and skipped; it never aborts the run. The note append starts only
//! after every upload has been attempted.

use chrono::NaiveDate;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;

use vault_ingest_core::merge::ensure_trailing_newline;
use vault_ingest_core::{CommitResult, ContentApi, StoreError};

use crate::config::VaultConfig;
use crate::entry::{format_date, image_path, EntryKind, WishlistEntry};
use crate::store::StoreClient;
use crate::tweets::{extract_tweet_id, TweetClient, TweetError};
use crate::vault::Vault;

/// Image uploads in flight at once. vxtwitter reports at most four per post.
const MAX_CONCURRENT_UPLOADS: usize = 4;

/// Longest note accepted with a submission, in characters.
pub const MAX_NOTE_CHARS: usize = 500;

const ALLOWED_URL_PREFIXES: [&str; 6] = [
    "https://twitter.com/",
    "https://x.com/",
    "https://mobile.twitter.com/",
    "https://mobile.x.com/",
    "https://www.twitter.com/",
    "https://www.x.com/",
];

/// One post to ingest.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Twitter/X status URL, trimmed.
    pub url: String,
    /// Free-form note attached to the entry; `None` when blank.
    pub note: Option<String>,
    /// Which note file and assets folder receive the post.
    pub kind: EntryKind,
}

impl IngestRequest {
    /// Build a request from user input, applying the same checks to the
    /// webhook and the CLI: the URL is trimmed and must start with one of
    /// the accepted `https://` prefixes, the note is trimmed, dropped when
    /// blank, and limited to [`MAX_NOTE_CHARS`].
    pub fn validated(url: &str, note: Option<&str>, kind: EntryKind) -> Result<Self, IngestError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(IngestError::InvalidRequest("URL is required".to_string()));
        }
        if !ALLOWED_URL_PREFIXES.iter().any(|p| url.starts_with(p)) {
            return Err(IngestError::InvalidRequest(
                "Invalid Twitter/X URL".to_string(),
            ));
        }

        let note = note.map(str::trim).filter(|n| !n.is_empty());
        if note.is_some_and(|n| n.chars().count() > MAX_NOTE_CHARS) {
            return Err(IngestError::InvalidRequest(format!(
                "Note is too long (max {} characters)",
                MAX_NOTE_CHARS
            )));
        }

        Ok(Self {
            url: url.to_string(),
            note: note.map(str::to_string),
            kind,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Id of the ingested post.
    pub tweet_id: String,
    /// Paths written, images first and the note file last.
    pub commits: Vec<String>,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Failed to fetch tweet data")]
    FetchFailed {
        tweet_id: String,
        #[source]
        source: TweetError,
    },
    #[error("Tweet has no text or images")]
    EmptyPost { tweet_id: String },
    #[error("Concurrent update conflict, please retry")]
    Conflict {
        tweet_id: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to update note file: {source}")]
    Store {
        tweet_id: String,
        #[source]
        source: StoreError,
    },
}

impl IngestError {
    pub fn tweet_id(&self) -> Option<&str> {
        match self {
            IngestError::InvalidRequest(_) => None,
            IngestError::FetchFailed { tweet_id, .. }
            | IngestError::EmptyPost { tweet_id }
            | IngestError::Conflict { tweet_id, .. }
            | IngestError::Store { tweet_id, .. } => Some(tweet_id),
        }
    }
}

pub struct Ingestor<A> {
    store: StoreClient<A>,
    tweets: TweetClient,
    vault: VaultConfig,
}

impl<A: ContentApi> Ingestor<A> {
    pub fn new(store: StoreClient<A>, tweets: TweetClient, vault: VaultConfig) -> Self {
        Self {
            store,
            tweets,
            vault,
        }
    }

    pub async fn ingest(&self, request: &IngestRequest) -> Result<IngestReport, IngestError> {
        self.ingest_on(request, chrono::Local::now().date_naive())
            .await
    }

    /// Run the workflow as if today were `date`.
    pub async fn ingest_on(
        &self,
        request: &IngestRequest,
        date: NaiveDate,
    ) -> Result<IngestReport, IngestError> {
        let tweet_id = extract_tweet_id(&request.url)
            .map_err(|e| IngestError::InvalidRequest(e.to_string()))?;
        tracing::info!(tweet_id = %tweet_id, kind = request.kind.as_str(), "processing tweet");

        let tweet = self.tweets.fetch(&request.url).await.map_err(|source| {
            tracing::error!(tweet_id = %tweet_id, error = %source, "failed to fetch tweet");
            IngestError::FetchFailed {
                tweet_id: tweet_id.clone(),
                source,
            }
        })?;

        if tweet.text.trim().is_empty() && tweet.images.is_empty() {
            return Err(IngestError::EmptyPost { tweet_id });
        }

        let vault = Vault::new(&self.store);
        let assets_dir = self.vault.assets_dir(request.kind);
        let image_message = format!("chore: add tweet images {}", tweet_id);

        let uploads = tweet.images.iter().map(|image| {
            let path = image_path(date, &image.filename, &assets_dir);
            let vault = &vault;
            let image_message = &image_message;
            async move {
                let result = self
                    .upload_image(vault, &image.url, &path, image_message)
                    .await;
                (path, image, result)
            }
        }).collect::<Vec<_>>();

        let mut commits = Vec::new();
        let results: Vec<_> = stream::iter(uploads)
            .buffered(MAX_CONCURRENT_UPLOADS)
            .collect()
            .await;
        for (path, image, result) in results {
            match result {
                Ok(_) => commits.push(path),
                Err(e) => {
                    tracing::error!(image_url = %image.url, path = %path, error = %e, "failed to process image");
                }
            }
        }

        let entry = WishlistEntry {
            date,
            title: format!(
                "@{}",
                tweet.author_username.as_deref().unwrap_or("unknown")
            ),
            url: request.url.clone(),
            note: request.note.clone().filter(|n| !n.is_empty()),
            text: tweet.text.clone(),
            images: tweet.images.clone(),
        };
        let note_path = self.vault.note_path(request.kind);
        let message = format!(
            "chore: append {} {} ({})",
            request.kind.commit_label(),
            format_date(date),
            tweet_id
        );

        match vault
            .append_text(
                &note_path,
                &ensure_trailing_newline(entry.to_markdown(&assets_dir)),
                &message,
            )
            .await
        {
            Ok(_) => commits.push(note_path),
            Err(source) => {
                tracing::error!(path = %note_path, error = %source, "failed to update note file");
                return Err(if source.is_conflict() {
                    IngestError::Conflict { tweet_id, source }
                } else {
                    IngestError::Store { tweet_id, source }
                });
            }
        }

        tracing::info!(tweet_id = %tweet_id, commits = commits.len(), "tweet ingested");
        Ok(IngestReport { tweet_id, commits })
    }

    async fn upload_image(
        &self,
        vault: &Vault<'_, A>,
        url: &str,
        path: &str,
        message: &str,
    ) -> anyhow::Result<CommitResult> {
        tracing::info!(url, "downloading image");
        let data = self.tweets.download_image(url).await?;
        tracing::info!(path, bytes = data.len(), "uploading image");
        Ok(vault.upload_binary(path, data, message).await?)
    }
}
