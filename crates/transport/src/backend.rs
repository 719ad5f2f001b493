use std::future::Future;
use std::pin::Pin;

use crate::error::TransportResult;
use crate::stream::ReplyStream;
use crate::wire::{
    HistoryMessage, HistoryQuery, ReplyRequest, ReplyResponse, SessionSummary, SessionsQuery,
    UploadBatch, UploadedFile,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything the chat session needs from the server, as one seam so
/// session logic can run against a scripted double.
pub trait ChatBackend: Send + Sync {
    /// One-shot send: the full reply comes back in a single response.
    fn request_reply<'a>(
        &'a self,
        request: ReplyRequest,
    ) -> BoxFuture<'a, TransportResult<ReplyResponse>>;

    /// Streaming send: opens the event stream for an in-flight reply.
    fn open_reply_stream<'a>(
        &'a self,
        request: ReplyRequest,
    ) -> BoxFuture<'a, TransportResult<ReplyStream>>;

    /// Uploads all files of a send in one multipart call. The returned
    /// metadata is in submission order.
    fn upload_attachments<'a>(
        &'a self,
        batch: UploadBatch,
    ) -> BoxFuture<'a, TransportResult<Vec<UploadedFile>>>;

    fn chat_history<'a>(
        &'a self,
        query: HistoryQuery,
    ) -> BoxFuture<'a, TransportResult<Vec<HistoryMessage>>>;

    fn user_sessions<'a>(
        &'a self,
        query: SessionsQuery,
    ) -> BoxFuture<'a, TransportResult<Vec<SessionSummary>>>;

    fn delete_session<'a>(
        &'a self,
        session_id: &'a str,
        user_id: &'a str,
    ) -> BoxFuture<'a, TransportResult<()>>;
}
