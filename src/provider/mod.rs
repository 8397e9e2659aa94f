//! Remote drive provider access.
//!
//! [`DriveProvider`] is the seam between the tree walk and the network. The production
//! implementation is [`HttpDriveClient`]; tests plug in an in-memory provider.

pub mod http;
pub mod model;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpDriveClient;
pub use model::{EntryKind, RemoteDrive, RemoteEntry, RemoteFolder};

/// Maximum number of bytes of an upstream body kept in an error message.
pub const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection, TLS or body read failure.
    Transport,
    Timeout,
    /// Upstream answered with a non-2xx status.
    Status,
    /// Body was not the expected JSON shape.
    Decode,
    /// Upstream envelope reported `isSuccessful = false`.
    Rejected,
}

/// Any failure while talking to the remote drive API.
#[derive(Debug, Clone, Error)]
#[error("provider call to {endpoint} failed{}: {message}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
pub struct ProviderCallFailed {
    pub kind: FailureKind,
    pub endpoint: String,
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderCallFailed {
    pub fn new(kind: FailureKind, endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self { kind, endpoint: endpoint.into(), status: None, message: message.into() }
    }

    pub fn status(endpoint: impl Into<String>, status: u16, body: &str) -> Self {
        Self {
            kind: FailureKind::Status,
            endpoint: endpoint.into(),
            status: Some(status),
            message: truncate_body(body),
        }
    }

    /// True when the provider refused the credential itself.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
    }
}

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Read access to one provider account, addressed by its bearer token.
///
/// Implementations must be stateless per call so one instance can serve every credential
/// branch concurrently.
#[async_trait]
pub trait DriveProvider: Send + Sync {
    /// Drives visible to `token`.
    async fn list_drives(&self, token: &str) -> Result<Vec<RemoteDrive>, ProviderCallFailed>;

    /// Folders directly under `parent_id`, or under the drive root when `parent_id` is `None`.
    async fn list_folders(
        &self,
        token: &str,
        drive_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<RemoteFolder>, ProviderCallFailed>;

    /// All entries (files and folders) directly under `parent_id`.
    async fn list_children(
        &self,
        token: &str,
        drive_id: &str,
        parent_id: &str,
    ) -> Result<Vec<RemoteEntry>, ProviderCallFailed>;
}
