pub mod directory;
pub mod error;
pub mod events;
pub mod identity;
pub mod message;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use directory::{DirectoryConfig, SessionDirectory};
pub use error::{SessionError, SessionResult};
pub use events::{Clipboard, ClipboardError, NoClipboard, SessionEvent, SessionObserver};
pub use identity::{ClientIdentity, IdentityStore, fresh_session_id, fresh_user_id};
pub use message::{AttachedFile, Message, MessageId, Role};
pub use session::{ChatSession, SendOutcome, SendRejection};
pub use state::{SendPhase, SessionState, SessionTransition, TransitionRejection};
