use crate::message::MessageId;

/// Upload-then-stream phases of one send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPhase {
    Uploading,
    AwaitingFirstByte,
}

/// Lifecycle state of one chat session.
///
/// `Streaming` carries the placeholder id so stale writes can be rejected;
/// the id is also handed to the chunk loop directly and never read back from
/// here mid-stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Sending(SendPhase),
    Streaming(MessageId),
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// State transition input for the send lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    /// A send was accepted; `uploading` when the batch carries files.
    BeginSend { uploading: bool },
    UploadFinished,
    StreamOpened(MessageId),
    /// Terminal for success, failure, and aborted sends alike.
    Finish,
}

/// Rejection reason for illegal transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionRejection {
    SendInProgress,
    NotUploading,
    NotSending,
    NothingActive,
}

pub type TransitionResult = Result<SessionState, TransitionRejection>;

impl SessionState {
    /// Applies one transition deterministically.
    ///
    /// Only `Idle` accepts a new send; concurrent sends are rejected, never
    /// queued. `Finish` is legal from any non-idle state so failures at any
    /// phase return to `Idle` through the same edge.
    pub fn apply(&self, transition: SessionTransition) -> TransitionResult {
        match transition {
            SessionTransition::BeginSend { uploading } => self.apply_begin(uploading),
            SessionTransition::UploadFinished => self.apply_upload_finished(),
            SessionTransition::StreamOpened(id) => self.apply_stream_opened(id),
            SessionTransition::Finish => self.apply_finish(),
        }
    }

    fn apply_begin(&self, uploading: bool) -> TransitionResult {
        match self {
            Self::Idle => Ok(Self::Sending(if uploading {
                SendPhase::Uploading
            } else {
                SendPhase::AwaitingFirstByte
            })),
            Self::Sending(_) | Self::Streaming(_) => Err(TransitionRejection::SendInProgress),
        }
    }

    fn apply_upload_finished(&self) -> TransitionResult {
        match self {
            Self::Sending(SendPhase::Uploading) => {
                Ok(Self::Sending(SendPhase::AwaitingFirstByte))
            }
            Self::Idle | Self::Sending(_) | Self::Streaming(_) => {
                Err(TransitionRejection::NotUploading)
            }
        }
    }

    fn apply_stream_opened(&self, id: MessageId) -> TransitionResult {
        match self {
            Self::Sending(SendPhase::AwaitingFirstByte) => Ok(Self::Streaming(id)),
            Self::Idle | Self::Sending(_) | Self::Streaming(_) => {
                Err(TransitionRejection::NotSending)
            }
        }
    }

    fn apply_finish(&self) -> TransitionResult {
        match self {
            Self::Sending(_) | Self::Streaming(_) => Ok(Self::Idle),
            Self::Idle => Err(TransitionRejection::NothingActive),
        }
    }
}
