//! Shared fixtures: an in-memory drive provider and a fully wired test application.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use http_body_util::BodyExt;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::provider::{
    DriveProvider, EntryKind, FailureKind, ProviderCallFailed, RemoteDrive, RemoteEntry, RemoteFolder,
};
use crate::state::AppState;

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Drives { token: String },
    Folders { drive_id: String, parent_id: Option<String> },
    Children { drive_id: String, parent_id: String },
}

/// Drive provider backed by fixed listings.
///
/// Drives are keyed by token; folder and child listings by drive id, so every token in a
/// test should own distinct drive ids. Unknown listings are empty.
#[derive(Default)]
pub struct MockProvider {
    drives: HashMap<String, Vec<RemoteDrive>>,
    folders: HashMap<(String, Option<String>), Vec<RemoteFolder>>,
    children: HashMap<(String, String), Vec<RemoteEntry>>,
    failing_tokens: HashMap<String, u16>,
    failing_folders: HashMap<(String, Option<String>), u16>,
    hanging_tokens: Vec<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drive(mut self, token: &str, id: &str, name: &str) -> Self {
        self.drives
            .entry(token.to_string())
            .or_default()
            .push(RemoteDrive { id: id.to_string(), name: name.to_string() });
        self
    }

    /// Folder listing of `parent` (`None` = drive root). Entries are `(id, name, has_folders)`.
    pub fn folders(mut self, drive_id: &str, parent: Option<&str>, entries: &[(&str, &str, bool)]) -> Self {
        let records = entries
            .iter()
            .map(|(id, name, has_folders)| RemoteFolder {
                id: id.to_string(),
                name: name.to_string(),
                has_folders: *has_folders,
            })
            .collect();
        self.folders.insert((drive_id.to_string(), parent.map(str::to_string)), records);
        self
    }

    pub fn children(mut self, drive_id: &str, parent: &str, entries: &[(&str, &str, EntryKind)]) -> Self {
        let records = entries
            .iter()
            .map(|(id, name, kind)| RemoteEntry { id: id.to_string(), name: name.to_string(), kind: *kind })
            .collect();
        self.children.insert((drive_id.to_string(), parent.to_string()), records);
        self
    }

    /// `list_drives` for `token` answers with HTTP `status`.
    pub fn fail_token(mut self, token: &str, status: u16) -> Self {
        self.failing_tokens.insert(token.to_string(), status);
        self
    }

    pub fn fail_folders(mut self, drive_id: &str, parent: Option<&str>, status: u16) -> Self {
        self.failing_folders.insert((drive_id.to_string(), parent.map(str::to_string)), status);
        self
    }

    /// `list_drives` for `token` never completes.
    pub fn hang_token(mut self, token: &str) -> Self {
        self.hanging_tokens.push(token.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, call: Call) -> InFlight<'_> {
        self.calls.lock().unwrap().push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        guard
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DriveProvider for MockProvider {
    async fn list_drives(&self, token: &str) -> Result<Vec<RemoteDrive>, ProviderCallFailed> {
        let _guard = self.enter(Call::Drives { token: token.to_string() }).await;
        if self.hanging_tokens.iter().any(|t| t == token) {
            std::future::pending::<()>().await;
        }
        if let Some(status) = self.failing_tokens.get(token) {
            return Err(ProviderCallFailed::status("/drives", *status, "rejected by mock"));
        }
        Ok(self.drives.get(token).cloned().unwrap_or_default())
    }

    async fn list_folders(
        &self,
        _token: &str,
        drive_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<RemoteFolder>, ProviderCallFailed> {
        let key = (drive_id.to_string(), parent_id.map(str::to_string));
        let _guard = self.enter(Call::Folders { drive_id: key.0.clone(), parent_id: key.1.clone() }).await;
        if let Some(status) = self.failing_folders.get(&key) {
            let endpoint = format!("/drives/{}/files", drive_id);
            return Err(ProviderCallFailed::status(endpoint, *status, "folder listing failed"));
        }
        Ok(self.folders.get(&key).cloned().unwrap_or_default())
    }

    async fn list_children(
        &self,
        _token: &str,
        drive_id: &str,
        parent_id: &str,
    ) -> Result<Vec<RemoteEntry>, ProviderCallFailed> {
        let key = (drive_id.to_string(), parent_id.to_string());
        let _guard = self.enter(Call::Children { drive_id: key.0.clone(), parent_id: key.1.clone() }).await;
        Ok(self.children.get(&key).cloned().unwrap_or_default())
    }
}

/// Provider whose every call fails at the transport level.
pub struct UnreachableProvider;

#[async_trait]
impl DriveProvider for UnreachableProvider {
    async fn list_drives(&self, _token: &str) -> Result<Vec<RemoteDrive>, ProviderCallFailed> {
        Err(ProviderCallFailed::new(FailureKind::Transport, "/drives", "connection refused"))
    }

    async fn list_folders(
        &self,
        _token: &str,
        _drive_id: &str,
        _parent_id: Option<&str>,
    ) -> Result<Vec<RemoteFolder>, ProviderCallFailed> {
        Err(ProviderCallFailed::new(FailureKind::Transport, "/drives", "connection refused"))
    }

    async fn list_children(
        &self,
        _token: &str,
        _drive_id: &str,
        _parent_id: &str,
    ) -> Result<Vec<RemoteEntry>, ProviderCallFailed> {
        Err(ProviderCallFailed::new(FailureKind::Transport, "/drives", "connection refused"))
    }
}

/// Two-level fixture for `token`:
///
/// ```text
/// <drive_id> "Private"
/// └── A (hasFolders)
///     ├── f0 (file)
///     └── B
///         └── f1 (file)
/// ```
pub fn sample_provider(provider: MockProvider, token: &str, drive_id: &str) -> MockProvider {
    provider
        .drive(token, drive_id, "Private")
        .folders(drive_id, None, &[("A", "Folder A", true)])
        .folders(drive_id, Some("A"), &[("B", "Folder B", false)])
        .children(drive_id, "A", &[("f0", "readme.md", EntryKind::File), ("B", "Folder B", EntryKind::Folder)])
        .children(drive_id, "B", &[("f1", "report.pdf", EntryKind::File)])
}

pub const ALICE_SESSION: &str = "sess-alice";
pub const BOB_SESSION: &str = "sess-bob";
pub const EXPIRED_SESSION: &str = "sess-expired";

/// Single-connection in-memory database with schema and two users (ids 1 and 2).
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    crate::db::init_db(&pool).await.unwrap();

    sqlx::query("INSERT INTO users (id, email, name) VALUES (1, 'alice@example.com', 'Alice'), (2, 'bob@example.com', 'Bob')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO sessions (token, user_id, expires_at) VALUES \
         (?1, 1, NULL), (?2, 2, '2999-01-01T00:00:00Z'), (?3, 1, '2000-01-01T00:00:00Z')",
    )
    .bind(ALICE_SESSION)
    .bind(BOB_SESSION)
    .bind(EXPIRED_SESSION)
    .execute(&pool)
    .await
    .unwrap();
    pool
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub provider: Arc<MockProvider>,
}

pub async fn test_app(provider: MockProvider) -> TestApp {
    test_app_with_config(provider, AppConfig::default()).await
}

pub async fn test_app_with_config(provider: MockProvider, config: AppConfig) -> TestApp {
    let pool = test_pool().await;
    let provider = Arc::new(provider);
    let state = AppState::new(pool, config, provider.clone());
    TestApp { app: crate::app(state.clone()), state, provider }
}

/// Sends `request` and returns status, headers and the body parsed as JSON (`Null` if empty or not JSON).
pub async fn send(
    app: &Router,
    request: Request<Body>,
) -> (axum::http::StatusCode, axum::http::HeaderMap, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, headers, body)
}

pub fn authed(method: &str, uri: &str, session: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri).header("authorization", format!("Bearer {}", session))
}
