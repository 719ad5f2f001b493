use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use lexchat_transport::backend::{BoxFuture, ChatBackend};
use lexchat_transport::{
    HistoryMessage, HistoryQuery, ReplyRequest, ReplyResponse, ReplyStream, SessionSummary,
    SessionsQuery, StreamChunk, TransportError, TransportResult, UploadBatch, UploadedFile,
};

/// Scripted backend double for session and directory tests.
#[derive(Default)]
pub(crate) struct MockBackend {
    stream_scripts: Mutex<VecDeque<Result<Vec<StreamChunk>, TransportError>>>,
    upload_scripts: Mutex<VecDeque<Result<Vec<UploadedFile>, TransportError>>>,
    reply_scripts: Mutex<VecDeque<Result<ReplyResponse, TransportError>>>,
    history: Mutex<Vec<HistoryMessage>>,
    sessions: Mutex<Vec<SessionSummary>>,
    pub history_calls: AtomicUsize,
    pub sessions_calls: AtomicUsize,
    pub deleted: Mutex<Vec<String>>,
    pub sent_requests: Mutex<Vec<ReplyRequest>>,
    pub upload_batches: Mutex<Vec<(usize, String, String)>>,
}

impl MockBackend {
    pub fn push_stream(&self, chunks: Vec<StreamChunk>) {
        self.stream_scripts.lock().unwrap().push_back(Ok(chunks));
    }

    pub fn push_stream_error(&self, error: TransportError) {
        self.stream_scripts.lock().unwrap().push_back(Err(error));
    }

    pub fn push_upload(&self, result: Result<Vec<UploadedFile>, TransportError>) {
        self.upload_scripts.lock().unwrap().push_back(result);
    }

    pub fn push_reply(&self, result: Result<ReplyResponse, TransportError>) {
        self.reply_scripts.lock().unwrap().push_back(result);
    }

    pub fn set_history(&self, messages: Vec<HistoryMessage>) {
        *self.history.lock().unwrap() = messages;
    }

    pub fn set_sessions(&self, sessions: Vec<SessionSummary>) {
        *self.sessions.lock().unwrap() = sessions;
    }

    fn unscripted() -> TransportError {
        TransportError::UnexpectedStatus {
            stage: "unscripted_call",
            status: 599,
        }
    }
}

impl ChatBackend for MockBackend {
    fn request_reply<'a>(
        &'a self,
        request: ReplyRequest,
    ) -> BoxFuture<'a, TransportResult<ReplyResponse>> {
        Box::pin(async move {
            self.sent_requests.lock().unwrap().push(request);
            self.reply_scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Self::unscripted()))
        })
    }

    fn open_reply_stream<'a>(
        &'a self,
        request: ReplyRequest,
    ) -> BoxFuture<'a, TransportResult<ReplyStream>> {
        Box::pin(async move {
            self.sent_requests.lock().unwrap().push(request);
            match self.stream_scripts.lock().unwrap().pop_front() {
                Some(Ok(chunks)) => Ok(ReplyStream::from_chunks(chunks)),
                Some(Err(error)) => Err(error),
                None => Err(Self::unscripted()),
            }
        })
    }

    fn upload_attachments<'a>(
        &'a self,
        batch: UploadBatch,
    ) -> BoxFuture<'a, TransportResult<Vec<UploadedFile>>> {
        Box::pin(async move {
            self.upload_batches.lock().unwrap().push((
                batch.files.len(),
                batch.session_id,
                batch.user_id,
            ));
            self.upload_scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Self::unscripted()))
        })
    }

    fn chat_history<'a>(
        &'a self,
        _query: HistoryQuery,
    ) -> BoxFuture<'a, TransportResult<Vec<HistoryMessage>>> {
        Box::pin(async move {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.history.lock().unwrap().clone())
        })
    }

    fn user_sessions<'a>(
        &'a self,
        _query: SessionsQuery,
    ) -> BoxFuture<'a, TransportResult<Vec<SessionSummary>>> {
        Box::pin(async move {
            self.sessions_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.sessions.lock().unwrap().clone())
        })
    }

    fn delete_session<'a>(
        &'a self,
        session_id: &'a str,
        _user_id: &'a str,
    ) -> BoxFuture<'a, TransportResult<()>> {
        Box::pin(async move {
            self.deleted.lock().unwrap().push(session_id.to_string());
            Ok(())
        })
    }
}
