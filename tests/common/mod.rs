//! Fake upstream APIs for integration tests.
//!
//! One axum app serves three surfaces on a random local port:
//!
//! - `/repos/{owner}/{repo}/contents/{*path}`: GitHub contents API with sha
//!   compare-and-swap, token check, and injectable failures.
//! - `/tweets/{user}/status/{id}`: vxtwitter-shaped post JSON.
//! - `/images/{name}`: image bytes.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vault_ingest::config::{GitHubConfig, VaultConfig};
use vault_ingest::github::GitHubContents;
use vault_ingest::ingest::Ingestor;
use vault_ingest::server::SharedIngestor;
use vault_ingest::store::{RetryPolicy, StoreClient};
use vault_ingest::transport::TransportRetry;
use vault_ingest::tweets::TweetClient;
use vault_ingest_core::ContentApi;

pub const TOKEN: &str = "test-token";
pub const OWNER: &str = "me";
pub const REPO: &str = "vault";

#[derive(Default)]
pub struct FakeState {
    files: HashMap<String, (Vec<u8>, String)>,
    revision: u64,
    put_statuses: HashMap<String, VecDeque<u16>>,
    get_statuses: HashMap<String, VecDeque<u16>>,
    competing_writes: HashMap<String, VecDeque<Vec<u8>>>,
    pub puts: Vec<PutRecord>,
    pub gets: u64,
    tweets: HashMap<String, Value>,
    images: HashMap<String, Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct PutRecord {
    pub path: String,
    pub message: String,
    pub branch: String,
    pub sha: Option<String>,
    pub status: u16,
}

impl FakeState {
    fn commit(&mut self, path: &str, content: Vec<u8>) -> String {
        self.revision += 1;
        let sha = format!("{:040x}", self.revision);
        self.files.insert(path.to_string(), (content, sha.clone()));
        sha
    }
}

#[derive(Clone, Default)]
pub struct Fake {
    pub state: Arc<Mutex<FakeState>>,
}

impl Fake {
    pub fn seed(&self, path: &str, content: impl Into<Vec<u8>>) -> String {
        self.state.lock().unwrap().commit(path, content.into())
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(path)
            .map(|(c, _)| c.clone())
    }

    pub fn text(&self, path: &str) -> Option<String> {
        self.file(path)
            .map(|b| String::from_utf8(b).expect("utf-8 file"))
    }

    pub fn fail_put(&self, path: &str, status: u16) {
        let mut state = self.state.lock().unwrap();
        state
            .put_statuses
            .entry(path.to_string())
            .or_default()
            .push_back(status);
    }

    pub fn fail_get(&self, path: &str, status: u16) {
        let mut state = self.state.lock().unwrap();
        state
            .get_statuses
            .entry(path.to_string())
            .or_default()
            .push_back(status);
    }

    pub fn competing_write(&self, path: &str, content: impl Into<Vec<u8>>) {
        let mut state = self.state.lock().unwrap();
        state
            .competing_writes
            .entry(path.to_string())
            .or_default()
            .push_back(content.into());
    }

    pub fn add_tweet(&self, id: &str, data: Value) {
        self.state
            .lock()
            .unwrap()
            .tweets
            .insert(id.to_string(), data);
    }

    pub fn add_image(&self, name: &str, bytes: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .images
            .insert(name.to_string(), bytes);
    }

    pub fn puts(&self) -> Vec<PutRecord> {
        self.state.lock().unwrap().puts.clone()
    }

    pub fn gets(&self) -> u64 {
        self.state.lock().unwrap().gets
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(
                "/repos/{owner}/{repo}/contents/{*path}",
                get(get_contents).put(put_contents),
            )
            .route("/tweets/{user}/status/{id}", get(get_tweet))
            .route("/images/{name}", get(get_image))
            .with_state(self.clone())
    }

    /// Serve the fake on 127.0.0.1 and return its base URL.
    pub async fn spawn(&self) -> String {
        let addr = spawn(self.router()).await;
        format!("http://{}", addr)
    }
}

pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("token {}", TOKEN))
}

fn github_error(status: u16, message: &str) -> Response {
    (
        StatusCode::from_u16(status).unwrap(),
        Json(json!({ "message": message })),
    )
        .into_response()
}

async fn get_contents(
    State(fake): State<Fake>,
    Path((owner, repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return github_error(401, "Bad credentials");
    }
    if owner != OWNER || repo != REPO {
        return github_error(404, "Not Found");
    }
    let mut state = fake.state.lock().unwrap();
    state.gets += 1;
    if let Some(status) = state.get_statuses.get_mut(&path).and_then(|q| q.pop_front()) {
        return github_error(status, "injected");
    }
    match state.files.get(&path) {
        None => github_error(404, "Not Found"),
        Some((content, sha)) => {
            // GitHub wraps base64 at 60 columns.
            let encoded = BASE64.encode(content);
            let wrapped: Vec<String> = encoded
                .as_bytes()
                .chunks(60)
                .map(|c| String::from_utf8(c.to_vec()).unwrap())
                .collect();
            Json(json!({
                "path": path,
                "sha": sha,
                "encoding": "base64",
                "content": wrapped.join("\n") + "\n",
            }))
            .into_response()
        }
    }
}

#[derive(Deserialize)]
struct PutBody {
    message: String,
    content: String,
    branch: String,
    sha: Option<String>,
}

async fn put_contents(
    State(fake): State<Fake>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !authorized(&headers) {
        return github_error(401, "Bad credentials");
    }
    let body: PutBody = match serde_json::from_slice(&body) {
        Ok(b) => b,
        Err(_) => return github_error(400, "Problems parsing JSON"),
    };
    let mut state = fake.state.lock().unwrap();

    if let Some(content) = state.competing_writes.get_mut(&path).and_then(|q| q.pop_front()) {
        state.commit(&path, content);
    }

    let mut record = PutRecord {
        path: path.clone(),
        message: body.message.clone(),
        branch: body.branch.clone(),
        sha: body.sha.clone(),
        status: 0,
    };

    if let Some(status) = state.put_statuses.get_mut(&path).and_then(|q| q.pop_front()) {
        record.status = status;
        state.puts.push(record);
        return github_error(status, "injected");
    }

    let current = state.files.get(&path).map(|(_, sha)| sha.clone());
    let outcome = match (&current, &body.sha) {
        (Some(cur), Some(given)) if cur == given => Ok(200),
        (None, None) => Ok(201),
        (Some(_), None) => Err((422, "Invalid request.\n\n\"sha\" wasn't supplied.")),
        _ => Err((409, "is at a different sha")),
    };

    match outcome {
        Err((status, message)) => {
            record.status = status;
            state.puts.push(record);
            github_error(status, message)
        }
        Ok(status) => {
            let content = BASE64.decode(body.content.as_bytes()).unwrap();
            let sha = state.commit(&path, content);
            record.status = status;
            state.puts.push(record);
            (
                StatusCode::from_u16(status).unwrap(),
                Json(json!({
                    "content": { "path": path, "sha": sha },
                    "commit": { "sha": format!("c{}", sha) },
                })),
            )
                .into_response()
        }
    }
}

async fn get_tweet(
    State(fake): State<Fake>,
    Path((_user, id)): Path<(String, String)>,
) -> Response {
    let state = fake.state.lock().unwrap();
    match state.tweets.get(&id) {
        Some(data) => Json(data.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "no such tweet").into_response(),
    }
}

async fn get_image(State(fake): State<Fake>, Path(name): Path<String>) -> Response {
    let state = fake.state.lock().unwrap();
    match state.images.get(&name) {
        Some(bytes) => bytes.clone().into_response(),
        None => (StatusCode::NOT_FOUND, "no such image").into_response(),
    }
}

pub fn fast_transport() -> TransportRetry {
    TransportRetry {
        attempts: 3,
        backoff_base: Duration::from_millis(1),
    }
}

pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        backoff_base: Duration::from_millis(1),
    }
}

pub fn github_config(base: &str) -> GitHubConfig {
    GitHubConfig {
        owner: OWNER.to_string(),
        repo: REPO.to_string(),
        branch: "main".to_string(),
        api_base: base.to_string(),
    }
}

pub fn github(base: &str) -> GitHubContents {
    GitHubContents::new(github_config(base), TOKEN)
        .unwrap()
        .with_transport_retry(fast_transport())
}

pub fn ingestor(base: &str, max_attempts: u32) -> SharedIngestor {
    let api: Arc<dyn ContentApi> = Arc::new(github(base));
    let store = StoreClient::with_policy(api, fast_policy(max_attempts));
    let tweets =
        TweetClient::new(format!("{}/tweets", base)).with_transport_retry(fast_transport());
    Ingestor::new(store, tweets, VaultConfig::default())
}
