use chrono::Utc;
use lexchat_transport::{HistoryMessage, LocalAttachment, UploadedFile, WireFile};

/// Stable identifier for one message.
///
/// Locally generated ids use the `temp_`/`msg_` prefixes; ids loaded from
/// history keep whatever the backend assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Chat speaker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Maps the wire role string, treating anything unrecognized as
    /// assistant output.
    pub fn from_wire(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("user") {
            Self::User
        } else {
            Self::Assistant
        }
    }
}

/// File metadata attached to a message.
///
/// Built from a local selection before upload, then re-identified with the
/// server's metadata once the upload batch succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub storage_path: String,
    pub preview_url: Option<String>,
}

impl AttachedFile {
    /// Placeholder metadata for a file that has not been uploaded yet.
    pub fn from_local(attachment: &LocalAttachment) -> Self {
        Self {
            id: String::new(),
            name: attachment.name.clone(),
            size: attachment.size(),
            mime_type: attachment.mime_type.clone(),
            storage_path: String::new(),
            preview_url: None,
        }
    }

    /// Replaces the local placeholder fields with server-assigned metadata.
    pub fn apply_upload(&mut self, uploaded: &UploadedFile) {
        self.id = uploaded.id.clone();
        self.name = uploaded.original_name.clone();
        self.size = uploaded.file_size;
        if !uploaded.file_type.is_empty() {
            self.mime_type = uploaded.file_type.clone();
        }
        self.storage_path = uploaded.file_path.clone();
        self.preview_url = uploaded.preview_url.clone();
    }

    pub fn from_wire(file: &WireFile) -> Self {
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            size: file.size,
            mime_type: file.file_type.clone(),
            storage_path: file.path.clone(),
            preview_url: file.preview_url.clone(),
        }
    }
}

/// One entry of the ordered conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    pub files: Vec<AttachedFile>,
}

impl Message {
    /// Immutable optimistic user message, appended before anything is sent.
    pub fn user(id: MessageId, content: impl Into<String>, files: Vec<AttachedFile>) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into(),
            timestamp: now_iso(),
            files,
        }
    }

    /// Empty assistant placeholder; its content is overwritten with the
    /// running total while a reply streams in.
    pub fn assistant_placeholder(id: MessageId) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            timestamp: now_iso(),
            files: Vec::new(),
        }
    }

    pub fn from_history(record: &HistoryMessage) -> Self {
        Self {
            id: MessageId::new(record.id.clone()),
            role: Role::from_wire(&record.role),
            content: record.content.clone(),
            timestamp: record.timestamp.clone(),
            files: record.resolved_files().iter().map(AttachedFile::from_wire).collect(),
        }
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}
