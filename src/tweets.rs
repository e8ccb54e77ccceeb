//! Post fetcher backed by the vxtwitter JSON API.
//!
//! Resolves a Twitter/X status URL to its text, author, and image URLs,
//! and downloads image bytes. All requests go through the shared
//! [`TransportRetry`].
//!
//! # Accepted URLs
//!
//! `http(s)://` on `twitter.com` or `x.com`, optionally prefixed with
//! `www.`, `m.`, or `mobile.`, with a path of `/{user}/status/{id}` or
//! `/i/web/status/{id}`. Query strings are ignored.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::transport::TransportRetry;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Error)]
pub enum TweetError {
    #[error("Invalid Twitter/X URL format: {0}")]
    InvalidUrl(String),
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },
    #[error("No text found for tweet {0}")]
    NoText(String),
}

/// One image attached to a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetImage {
    /// Download URL, upgraded to the original size when possible.
    pub url: String,
    /// Vault filename, `{tweet_id}_{sequence}.{ext}`.
    pub filename: String,
}

/// A fetched post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tweet {
    /// Numeric status id, as a string.
    pub id: String,
    /// Raw post text. Literal `\n` sequences are left for the formatter.
    pub text: String,
    /// Images in post order. Entries without a URL are already skipped.
    pub images: Vec<TweetImage>,
    /// Author handle without the `@` (`user_screen_name`).
    pub author_username: Option<String>,
}

/// Identifiers extracted from a status URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUrl {
    /// `None` for `/i/web/status/{id}` links.
    pub username: Option<String>,
    /// Numeric status id.
    pub tweet_id: String,
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

pub fn parse_status_url(raw: &str) -> Result<StatusUrl, TweetError> {
    let invalid = || TweetError::InvalidUrl(raw.to_string());
    let parsed = url::Url::parse(raw.trim()).map_err(|_| invalid())?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid());
    }
    let host = parsed.host_str().ok_or_else(invalid)?.to_ascii_lowercase();
    let bare = ["www.", "m.", "mobile."]
        .iter()
        .find_map(|p| host.strip_prefix(p))
        .unwrap_or(&host);
    if bare != "twitter.com" && bare != "x.com" {
        return Err(invalid());
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();
    match segments.as_slice() {
        ["i", "web", "status", id, ..] if is_digits(id) => Ok(StatusUrl {
            username: None,
            tweet_id: id.to_string(),
        }),
        [user, "status", id, ..] if is_word(user) && is_digits(id) => Ok(StatusUrl {
            username: Some(user.to_string()),
            tweet_id: id.to_string(),
        }),
        _ => Err(invalid()),
    }
}

pub fn extract_tweet_id(url: &str) -> Result<String, TweetError> {
    parse_status_url(url).map(|s| s.tweet_id)
}

/// Image extension from the URL path; `jpg` when none is recognised.
pub fn image_extension(url: &str) -> &'static str {
    let path = match url::Url::parse(url) {
        Ok(u) => u.path().to_ascii_lowercase(),
        Err(_) => url.split('?').next().unwrap_or("").to_ascii_lowercase(),
    };
    IMAGE_EXTENSIONS
        .iter()
        .find(|ext| path.ends_with(&format!(".{}", ext)))
        .copied()
        .unwrap_or("jpg")
}

/// `{tweet_id}_{sequence}.{ext}`, sequence starting at 1.
pub fn image_filename(tweet_id: &str, sequence: usize, url: &str) -> String {
    format!("{}_{}.{}", tweet_id, sequence, image_extension(url))
}

fn upgrade_to_original(url: &str) -> String {
    url.replace("name=small", "name=orig")
        .replace("name=medium", "name=orig")
        .replace("name=large", "name=orig")
}

/// Pull image references out of a vxtwitter response.
///
/// Prefers `media_extended`; falls back to the flat `mediaURLs` list.
pub fn extract_images(data: &serde_json::Value, tweet_id: &str) -> Vec<TweetImage> {
    let extended: Vec<&serde_json::Value> = data
        .get("media_extended")
        .and_then(|m| m.as_array())
        .map(|a| a.iter().collect())
        .unwrap_or_default();

    let candidates: Vec<(String, bool)> = if extended.is_empty() {
        data.get("mediaURLs")
            .and_then(|m| m.as_array())
            .map(|a| {
                a.iter()
                    .map(|u| (u.as_str().unwrap_or("").to_string(), false))
                    .collect()
            })
            .unwrap_or_default()
    } else {
        extended
            .iter()
            .map(|m| {
                let url = m.get("url").and_then(|u| u.as_str()).unwrap_or("");
                (url.to_string(), m.get("altText").is_some())
            })
            .collect()
    };

    candidates
        .into_iter()
        .enumerate()
        .filter(|(_, (url, _))| !url.is_empty())
        .map(|(idx, (url, has_alt))| {
            let url = if has_alt { upgrade_to_original(&url) } else { url };
            TweetImage {
                filename: image_filename(tweet_id, idx + 1, &url),
                url,
            }
        })
        .collect()
}

fn non_empty_str(data: &serde_json::Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub struct TweetClient {
    client: reqwest::Client,
    base_url: String,
    retry: TransportRetry,
}

impl TweetClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            retry: TransportRetry::default(),
        }
    }

    pub fn with_transport_retry(mut self, retry: TransportRetry) -> Self {
        self.retry = retry;
        self
    }

    pub async fn fetch(&self, url: &str) -> Result<Tweet, TweetError> {
        let status_url = parse_status_url(url)?;
        let tweet_id = status_url.tweet_id;
        let user = status_url.username.as_deref().unwrap_or("i");
        tracing::info!(tweet_id = %tweet_id, "fetching tweet");

        let api_url = format!(
            "{}/{}/status/{}",
            self.base_url.trim_end_matches('/'),
            user,
            tweet_id
        );
        let resp = self
            .retry
            .send(|| self.client.get(&api_url).timeout(FETCH_TIMEOUT))
            .await
            .map_err(|source| TweetError::Http {
                url: api_url.clone(),
                source,
            })?;
        if !resp.status().is_success() {
            return Err(TweetError::Status {
                url: api_url,
                status: resp.status(),
            });
        }
        let data: serde_json::Value = resp.json().await.map_err(|source| TweetError::Http {
            url: api_url.clone(),
            source,
        })?;

        let text = non_empty_str(&data, "text").ok_or_else(|| TweetError::NoText(tweet_id.clone()))?;
        let images = extract_images(&data, &tweet_id);

        Ok(Tweet {
            text,
            images,
            author_username: non_empty_str(&data, "user_screen_name"),
            id: tweet_id,
        })
    }

    pub async fn download_image(&self, url: &str) -> Result<Vec<u8>, TweetError> {
        let http_err = |source| TweetError::Http {
            url: url.to_string(),
            source,
        };
        let resp = self
            .retry
            .send(|| self.client.get(url).timeout(DOWNLOAD_TIMEOUT))
            .await
            .map_err(http_err)?;
        if !resp.status().is_success() {
            return Err(TweetError::Status {
                url: url.to_string(),
                status: resp.status(),
            });
        }
        let bytes = resp.bytes().await.map_err(http_err)?;
        Ok(bytes.to_vec())
    }
}
