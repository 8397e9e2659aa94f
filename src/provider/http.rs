use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::model::{Envelope, RemoteDrive, RemoteEntry, RemoteFolder};
use super::{DriveProvider, FailureKind, ProviderCallFailed};
use crate::config::ProviderConfig;

/// `DriveProvider` over the provider's REST API.
///
/// Cloning is cheap; all clones share one `reqwest::Client` and its connection pool.
#[derive(Clone, Debug)]
pub struct HttpDriveClient {
    http: reqwest::Client,
    base_url: Url,
    auth_scheme: String,
    drive_type: String,
    max_response_bytes: usize,
}

impl HttpDriveClient {
    pub fn new(cfg: &ProviderConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .connect_timeout(cfg.connect_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(http, cfg)
    }

    pub fn with_client(http: reqwest::Client, cfg: &ProviderConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&cfg.base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("provider base url cannot carry path segments: {}", cfg.base_url);
        }
        Ok(Self {
            http,
            base_url,
            auth_scheme: cfg.auth_scheme.clone(),
            drive_type: cfg.drive_type.clone(),
            max_response_bytes: cfg.max_response_bytes,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in with_client
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// One authenticated GET. Returns the response body as a JSON object.
    pub async fn get_json(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        token: &str,
    ) -> Result<Map<String, Value>, ProviderCallFailed> {
        let url = self.endpoint(segments);
        let endpoint = url.path().to_string();

        let mut response = self
            .http
            .get(url)
            .query(query)
            .header(AUTHORIZATION, format!("{} {}", self.auth_scheme, token))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(endpoint = %endpoint, status = status.as_u16(), "provider returned error status");
            return Err(ProviderCallFailed::status(endpoint, status.as_u16(), &body));
        }

        let limit = self.max_response_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(body_too_large(&endpoint, limit));
        }
        // chunked bodies carry no length up front
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(&endpoint, e))? {
            if body.len() + chunk.len() > limit {
                return Err(body_too_large(&endpoint, limit));
            }
            body.extend_from_slice(&chunk);
        }
        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ProviderCallFailed::new(
                FailureKind::Decode,
                endpoint,
                format!("expected a JSON object, got {}", json_type(&other)),
            )),
            Err(e) => Err(ProviderCallFailed::new(FailureKind::Decode, endpoint, format!("invalid JSON: {}", e))),
        }
    }

    /// `get_json` followed by decoding the `result` list into typed records.
    async fn get_records<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        token: &str,
    ) -> Result<Vec<T>, ProviderCallFailed> {
        let endpoint = self.endpoint(segments).path().to_string();
        let body = self.get_json(segments, query, token).await?;
        let envelope: Envelope<T> = serde_json::from_value(Value::Object(body)).map_err(|e| {
            ProviderCallFailed::new(FailureKind::Decode, endpoint.clone(), format!("unexpected response shape: {}", e))
        })?;
        envelope
            .into_records()
            .map_err(|msg| ProviderCallFailed::new(FailureKind::Rejected, endpoint, msg))
    }
}

#[async_trait]
impl DriveProvider for HttpDriveClient {
    async fn list_drives(&self, token: &str) -> Result<Vec<RemoteDrive>, ProviderCallFailed> {
        self.get_records(&["drives"], &[("type", self.drive_type.as_str())], token).await
    }

    async fn list_folders(
        &self,
        token: &str,
        drive_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<RemoteFolder>, ProviderCallFailed> {
        let mut query = vec![("type", "folder")];
        if let Some(parent) = parent_id {
            query.push(("parentId", parent));
        }
        self.get_records(&["drives", drive_id, "files"], &query, token).await
    }

    async fn list_children(
        &self,
        token: &str,
        drive_id: &str,
        parent_id: &str,
    ) -> Result<Vec<RemoteEntry>, ProviderCallFailed> {
        self.get_records(&["drives", drive_id, "files"], &[("parentId", parent_id)], token).await
    }
}

fn transport_error(endpoint: &str, err: reqwest::Error) -> ProviderCallFailed {
    let kind = if err.is_timeout() { FailureKind::Timeout } else { FailureKind::Transport };
    // without_url: the query string may carry ids we don't want in logs twice
    ProviderCallFailed::new(kind, endpoint, err.without_url().to_string())
}

fn body_too_large(endpoint: &str, limit: usize) -> ProviderCallFailed {
    ProviderCallFailed::new(FailureKind::Decode, endpoint, format!("response body exceeds {} bytes", limit))
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
