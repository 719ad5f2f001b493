pub mod backend;
pub mod chunk;
pub mod error;
pub mod http;
pub mod stream;
pub mod wire;

pub use backend::{BoxFuture, ChatBackend};
pub use chunk::StreamChunk;
pub use error::{TransportError, TransportResult};
pub use http::{HttpBackend, TransportConfig};
pub use stream::ReplyStream;
pub use wire::{
    HistoryMessage, HistoryQuery, LocalAttachment, ReplyRequest, ReplyResponse, SessionSummary,
    SessionsQuery, UploadBatch, UploadedFile, WireFile,
};
