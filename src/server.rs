//! Webhook HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/`, `/book` | Ingest a post into the wishlist note |
//! | `POST` | `/liked` | Ingest a post into the liked-posts note |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Request
//!
//! ```json
//! { "url": "https://x.com/user/status/123", "note": "optional, max 500 chars" }
//! ```
//!
//! When an API key is configured, requests must carry it in `x-api-key`.
//!
//! # Responses
//!
//! | Status | When |
//! |--------|------|
//! | 200 | entry appended; body lists every committed path |
//! | 400 | malformed body, missing/invalid URL, note too long |
//! | 401 | API key missing or wrong |
//! | 409 | note file kept changing underneath us; safe to retry |
//! | 422 | post has neither text nor images |
//! | 502 | post could not be fetched |
//! | 500 | anything else |
//!
//! Errors use `{ "status": "error", "message": "...", "tweetId": "..." }`.

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use vault_ingest_core::ContentApi;

use crate::config::{self, Config};
use crate::entry::EntryKind;
use crate::github::GitHubContents;
use crate::ingest::{IngestError, IngestRequest, Ingestor};
use crate::store::{RetryPolicy, StoreClient};
use crate::tweets::TweetClient;

pub type SharedIngestor = Ingestor<Arc<dyn ContentApi>>;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    ingestor: Arc<SharedIngestor>,
    api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(ingestor: SharedIngestor, api_key: Option<String>) -> Self {
        Self {
            ingestor: Arc::new(ingestor),
            api_key: api_key.map(Arc::from),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handle_ingest))
        .route("/book", post(handle_ingest))
        .route("/liked", post(handle_ingest))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the production ingestor from config and environment secrets.
pub fn build_ingestor(config: &Config) -> anyhow::Result<SharedIngestor> {
    let token = config::github_token()?;
    let github: Arc<dyn ContentApi> = Arc::new(GitHubContents::new(config.github.clone(), &token)?);
    let store = StoreClient::with_policy(github, RetryPolicy::from(&config.retry));
    let tweets = TweetClient::new(config.tweets.base_url.clone());
    Ok(Ingestor::new(store, tweets, config.vault.clone()))
}

/// Start the webhook server on `[server].bind` and run until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let ingestor = build_ingestor(config)?;
    let api_key = config::api_key();
    if api_key.is_none() {
        tracing::warn!("{} not set; webhook accepts unauthenticated requests", config::API_KEY_ENV);
    }
    let app = router(AppState::new(ingestor, api_key));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!(
        "vault-ingest listening on http://{} ({}/{}@{})",
        config.server.bind,
        config.github.owner,
        config.github.repo,
        config.github.branch
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tweet_id: Option<String>,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
    tweet_id: Option<String>,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            tweet_id: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            status: "error",
            message: self.message,
            tweet_id: self.tweet_id,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, message)
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        let status = match &err {
            IngestError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            IngestError::FetchFailed { .. } => StatusCode::BAD_GATEWAY,
            IngestError::EmptyPost { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::Conflict { .. } => StatusCode::CONFLICT,
            IngestError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &err {
            IngestError::Store { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        };
        AppError {
            status,
            message,
            tweet_id: err.tweet_id().map(str::to_string),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST / | /book | /liked ============

#[derive(Deserialize)]
struct IngestBody {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IngestResponse {
    status: &'static str,
    message: &'static str,
    tweet_id: String,
    commits: Vec<String>,
}

fn check_api_key(headers: &HeaderMap, expected: Option<&str>) -> bool {
    let Some(expected) = expected else {
        return true;
    };
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|provided| provided == expected)
}

/// Parse the raw request body into a validated [`IngestRequest`].
fn validate_body(body: &[u8], kind: EntryKind) -> Result<IngestRequest, AppError> {
    let parsed: IngestBody = if body.iter().all(|b| b.is_ascii_whitespace()) {
        IngestBody {
            url: None,
            note: None,
        }
    } else {
        serde_json::from_slice(body).map_err(|_| bad_request("Invalid JSON in request body"))?
    };

    IngestRequest::validated(
        parsed.url.as_deref().unwrap_or_default(),
        parsed.note.as_deref(),
        kind,
    )
    .map_err(AppError::from)
}

async fn handle_ingest(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestResponse>, AppError> {
    if !check_api_key(&headers, state.api_key.as_deref()) {
        return Err(AppError::new(StatusCode::UNAUTHORIZED, "Unauthorized"));
    }

    let kind = EntryKind::from_request_path(uri.path());
    let request = validate_body(&body, kind)?;
    tracing::info!(kind = kind.as_str(), "ingest request");

    let report = state.ingestor.ingest(&request).await?;

    Ok(Json(IngestResponse {
        status: "success",
        message: "Tweet added to wishlist",
        tweet_id: report.tweet_id,
        commits: report.commits,
    }))
}
