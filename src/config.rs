//! TOML configuration for the ingestion service.
//!
//! Secrets never live in the file: the GitHub token is read from
//! `GITHUB_TOKEN` and the optional webhook key from `VAULT_INGEST_API_KEY`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::entry::EntryKind;

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const API_KEY_ENV: &str = "VAULT_INGEST_API_KEY";

/// Top-level configuration, one section per concern.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Target repository. Required.
    pub github: GitHubConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tweets: TweetsConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GitHubConfig {
    /// Repository owner (user or organisation).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch every read and commit targets. Default: `main`.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// REST API root. Default: `https://api.github.com`.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_branch() -> String {
    "main".to_string()
}
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Webhook listen address. Default: `127.0.0.1:8080`.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TweetsConfig {
    /// vxtwitter-compatible API root. Default: `https://api.vxtwitter.com`.
    #[serde(default = "default_tweets_base_url")]
    pub base_url: String,
}

impl Default for TweetsConfig {
    fn default() -> Self {
        Self {
            base_url: default_tweets_base_url(),
        }
    }
}

fn default_tweets_base_url() -> String {
    "https://api.vxtwitter.com".to_string()
}

/// Destination paths inside the vault repository. Unset fields fall back
/// to the defaults carried by [`EntryKind`].
#[derive(Debug, Deserialize, Clone, Default)]
pub struct VaultConfig {
    /// Note file for `/` and `/book`. Default: `wishlist.md`.
    pub wishlist_path: Option<String>,
    /// Image folder for `/` and `/book`. Default: `assets`.
    pub assets_dir: Option<String>,
    /// Note file for `/liked`. Default: `Liked/tweets.md`.
    pub liked_path: Option<String>,
    /// Image folder for `/liked`. Default: `Liked/assets`.
    pub liked_assets_dir: Option<String>,
}

impl VaultConfig {
    pub fn note_path(&self, kind: EntryKind) -> String {
        let configured = match kind {
            EntryKind::Book => &self.wishlist_path,
            EntryKind::Liked => &self.liked_path,
        };
        configured
            .clone()
            .unwrap_or_else(|| kind.default_note_path().to_string())
    }

    pub fn assets_dir(&self, kind: EntryKind) -> String {
        let configured = match kind {
            EntryKind::Book => &self.assets_dir,
            EntryKind::Liked => &self.liked_assets_dir,
        };
        configured
            .clone()
            .unwrap_or_else(|| kind.default_assets_dir().to_string())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Write attempts per file, including the first. Default: 5.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First conflict backoff in milliseconds; doubles per retry. Default: 1000.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}
fn default_backoff_base_ms() -> u64 {
    1000
}

impl RetryConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.github.owner.trim().is_empty() {
        bail!("github.owner must not be empty");
    }
    if config.github.repo.trim().is_empty() {
        bail!("github.repo must not be empty");
    }
    if config.github.branch.trim().is_empty() {
        bail!("github.branch must not be empty");
    }
    if config.retry.max_attempts < 1 {
        bail!("retry.max_attempts must be >= 1");
    }

    Ok(config)
}

/// Read the GitHub token from the environment.
pub fn github_token() -> Result<String> {
    match std::env::var(GITHUB_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => Ok(token),
        _ => bail!("{} environment variable not set", GITHUB_TOKEN_ENV),
    }
}

/// Read the optional webhook API key from the environment.
pub fn api_key() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty())
}
