use serde::{Deserialize, Serialize};

/// Body for both the one-shot and the streaming send endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyRequest {
    pub message: String,
    pub session_id: String,
    pub user_id: String,
}

/// Response of the one-shot (non-stream) send endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyResponse {
    pub response: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub message_id: Option<String>,
}

/// File metadata as it appears inside stored messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: u64,
    pub path: String,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// Extra per-message metadata the backend tucks files into for older
/// records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalData {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub files: Option<Vec<WireFile>>,
}

/// One stored message from the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub files: Option<Vec<WireFile>>,
    #[serde(default)]
    pub additional_data: Option<AdditionalData>,
}

impl HistoryMessage {
    /// Attached files, preferring the top-level field and falling back to
    /// `additional_data.files` for records that only carry the latter.
    pub fn resolved_files(&self) -> &[WireFile] {
        if let Some(files) = &self.files {
            return files;
        }
        self.additional_data
            .as_ref()
            .and_then(|data| data.files.as_deref())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryEnvelope {
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
}

/// One row of the session-list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub last_message: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionsEnvelope {
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
}

/// Server-assigned metadata for one uploaded file, in submission order.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub original_name: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_size: u64,
    pub file_path: String,
    #[serde(default)]
    pub preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadEnvelope {
    #[serde(default)]
    pub files: Vec<UploadedFile>,
}

/// A file selected client-side, before upload.
#[derive(Debug, Clone)]
pub struct LocalAttachment {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl LocalAttachment {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// One multipart upload call: all files of a send, plus identity fields.
#[derive(Debug, Clone)]
pub struct UploadBatch {
    pub files: Vec<LocalAttachment>,
    pub session_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub session_id: String,
    pub user_id: String,
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct SessionsQuery {
    pub user_id: String,
    pub limit: u32,
}
