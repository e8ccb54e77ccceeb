//! # Vault Ingest
//!
//! Webhook-triggered ingestion of social posts into a personal notes vault
//! stored in a GitHub repository.
//!
//! Given a Twitter/X status URL, the service fetches the post's text and
//! images, uploads the images into the vault's assets folder, and appends a
//! markdown entry to a note file, all through the GitHub contents API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ Webhook  │──▶│  Ingestor  │──▶│    Vault     │──▶│ StoreClient │──▶ GitHub
//! │ (axum)   │   │ fetch+fmt  │   │ append/upload│   │ CAS + retry │
//! └──────────┘   └────────────┘   └──────────────┘   └─────────────┘
//! ```
//!
//! Every write is a compare-and-swap on the file's content hash. Appends
//! re-read and re-merge on each retry, so concurrent entries are never lost.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment secrets |
//! | [`transport`] | HTTP retry for 5xx and network failures |
//! | [`github`] | GitHub contents API client |
//! | [`store`] | Conditional writes with conflict retry |
//! | [`vault`] | Append-with-merge and upload patterns |
//! | [`tweets`] | Post fetching and image download |
//! | [`entry`] | Entry kinds and markdown formatting |
//! | [`ingest`] | End-to-end ingestion workflow |
//! | [`server`] | Webhook HTTP server |

pub mod config;
pub mod entry;
pub mod github;
pub mod ingest;
pub mod server;
pub mod store;
pub mod transport;
pub mod tweets;
pub mod vault;
