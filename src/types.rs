use serde::{Deserialize, Serialize};

/// Identity of an authenticated user, resolved by the session collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored provider token linked to one user.
///
/// Field names on the wire follow the original frontend contract (`apiIdx`, `apiURL`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "apiIdx")]
    pub id: i64,
    #[serde(rename = "userIdx")]
    pub user_id: UserId,
    #[serde(rename = "apiTitle")]
    pub title: String,
    #[serde(rename = "apiURL")]
    pub token: String,
    #[serde(rename = "isConnected")]
    pub is_connected: bool,
    #[serde(rename = "createdDate")]
    pub created_at: String,
}

// Tree nodes. Rebuilt from the provider on every request, never persisted.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Drive,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub folders: Vec<FolderNode>,
}

impl DriveNode {
    pub fn new(id: String, name: String, folders: Vec<FolderNode>) -> Self {
        Self { id, name, kind: NodeKind::Drive, folders }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderNode {
    pub id: String,
    pub name: String,
    pub has_folders: bool,
    pub sub_folders: Vec<FolderNode>,
    pub files: Vec<FileNode>,
}

impl FolderNode {
    /// Number of folders in this subtree, including `self`.
    pub fn folder_count(&self) -> usize {
        1 + self.sub_folders.iter().map(FolderNode::folder_count).sum::<usize>()
    }

    /// Number of files in this subtree.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.sub_folders.iter().map(FolderNode::file_count).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

impl FileNode {
    pub fn new(id: String, name: String) -> Self {
        Self { id, name, kind: NodeKind::File }
    }
}

// Aggregation wire format

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drive_id: Option<String>,
}

/// One element of the multi-credential response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEntry {
    #[serde(rename = "apiTitle")]
    pub api_title: String,
    #[serde(rename = "apiIdx")]
    pub api_idx: i64,
    #[serde(rename = "apiURL")]
    pub api_url: String,
    pub status: EntryStatus,
    pub drives: Vec<DriveNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EntryError>,
}

// Request payloads

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUrlQuery {
    #[serde(rename = "apiURL")]
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddCredentialRequest {
    #[serde(rename = "apiTitle")]
    pub api_title: Option<String>,
    #[serde(rename = "apiURL")]
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
