use serde::Deserialize;

/// Response envelope shared by every provider endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub header: Option<EnvelopeHeader>,
    pub result: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeHeader {
    pub is_successful: Option<bool>,
    pub result_code: Option<i64>,
    pub result_message: Option<String>,
}

impl<T> Envelope<T> {
    /// Records of a successful envelope. `Err` carries the provider's own failure message.
    pub fn into_records(self) -> Result<Vec<T>, String> {
        if let Some(header) = &self.header {
            if header.is_successful == Some(false) {
                let msg = header.result_message.clone().unwrap_or_else(|| "request rejected".to_string());
                return Err(match header.result_code {
                    Some(code) => format!("{} (code {})", msg, code),
                    None => msg,
                });
            }
        }
        Ok(self.result.unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteDrive {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFolder {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub has_folders: bool,
}

/// Closed set of entry types; anything else fails decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}
