use snafu::Snafu;

use crate::message::MessageId;

/// What the session tells its consumer after each atomic mutation.
///
/// Events fire synchronously, in mutation order, so a renderer can mirror
/// the message list without polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    MessageAppended(MessageId),
    /// `content` is always the full running total, never a delta.
    AssistantContentUpdated { id: MessageId, content: String },
    StreamCompleted(MessageId),
    StreamFailed { id: MessageId, notice: String },
    /// Lightweight non-fatal information (clipboard failures and the like).
    Notice(String),
}

pub type SessionObserver = Box<dyn Fn(&SessionEvent) + Send>;

#[derive(Debug, Snafu)]
#[snafu(display("clipboard write failed: {message}"))]
pub struct ClipboardError {
    pub message: String,
}

/// Seam for the host clipboard. Failures are never fatal to the session.
pub trait Clipboard: Send {
    fn copy(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Default collaborator for hosts without a clipboard.
pub struct NoClipboard;

impl Clipboard for NoClipboard {
    fn copy(&self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError {
            message: "no clipboard available".to_string(),
        })
    }
}
