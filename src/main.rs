//! # Vault Ingest CLI (`vault-ingest`)
//!
//! ```bash
//! vault-ingest --config ./config/vault-ingest.toml serve
//! vault-ingest --config ./config/vault-ingest.toml ingest https://x.com/user/status/123 --note "later"
//! vault-ingest --config ./config/vault-ingest.toml ingest https://x.com/user/status/123 --liked
//! ```
//!
//! Requires `GITHUB_TOKEN` in the environment. `VAULT_INGEST_API_KEY`
//! protects the webhook when set. Log verbosity follows `RUST_LOG`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vault_ingest::config;
use vault_ingest::entry::EntryKind;
use vault_ingest::ingest::IngestRequest;
use vault_ingest::server;

#[derive(Parser)]
#[command(
    name = "vault-ingest",
    about = "Ingest social posts into a GitHub-hosted notes vault",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/vault-ingest.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server.
    Serve,

    /// Ingest a single post URL without going through the webhook.
    Ingest {
        /// Twitter/X status URL.
        url: String,

        /// Free-form note attached to the entry (max 500 characters).
        #[arg(long)]
        note: Option<String>,

        /// File the post under liked posts instead of the wishlist.
        #[arg(long)]
        liked: bool,
    },

    /// Validate the configuration file and print the resolved targets.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vault_ingest=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Ingest { url, note, liked } => {
            let kind = if liked {
                EntryKind::Liked
            } else {
                EntryKind::Book
            };
            let request = IngestRequest::validated(&url, note.as_deref(), kind)?;
            let ingestor = server::build_ingestor(&cfg)?;
            let report = ingestor.ingest(&request).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Check => {
            println!(
                "repository: {}/{}@{} via {}",
                cfg.github.owner, cfg.github.repo, cfg.github.branch, cfg.github.api_base
            );
            for kind in [EntryKind::Book, EntryKind::Liked] {
                println!(
                    "  {:<6} note: {:<20} assets: {}",
                    kind.as_str(),
                    cfg.vault.note_path(kind),
                    cfg.vault.assets_dir(kind)
                );
            }
            println!(
                "retry: {} attempts, {} ms base backoff",
                cfg.retry.max_attempts, cfg.retry.backoff_base_ms
            );
        }
    }

    Ok(())
}
