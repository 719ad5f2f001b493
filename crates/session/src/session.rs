use std::sync::Arc;

use chrono::Utc;
use lexchat_transport::{ChatBackend, LocalAttachment, ReplyRequest, ReplyStream, StreamChunk, UploadBatch};
use snafu::{ResultExt, ensure};
use tracing::{debug, warn};

use crate::directory::SessionDirectory;
use crate::error::{SessionBusySnafu, SessionResult, UploadSnafu};
use crate::events::{Clipboard, NoClipboard, SessionEvent, SessionObserver};
use crate::identity::{ClientIdentity, fresh_session_id};
use crate::message::{AttachedFile, Message, MessageId, Role};
use crate::state::{SessionState, SessionTransition};

/// Why a send was refused without doing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejection {
    EmptyInput,
    SendInProgress,
    MissingIdentity,
}

/// How an accepted send ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Rejected(SendRejection),
    Completed,
    /// The reply failed after the placeholder existed; the placeholder now
    /// carries a failure notice and the session is idle again.
    Failed,
}

/// One conversation: the ordered message list, the send lifecycle, and the
/// collaborators that move messages in and out.
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    directory: SessionDirectory,
    identity: ClientIdentity,
    messages: Vec<Message>,
    state: SessionState,
    observer: Option<SessionObserver>,
    clipboard: Box<dyn Clipboard>,
    next_seq: u64,
}

impl ChatSession {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        directory: SessionDirectory,
        identity: ClientIdentity,
    ) -> Self {
        Self {
            backend,
            directory,
            identity,
            messages: Vec::new(),
            state: SessionState::Idle,
            observer: None,
            clipboard: Box::new(NoClipboard),
            next_seq: 0,
        }
    }

    pub fn set_observer(&mut self, observer: SessionObserver) {
        self.observer = Some(observer);
    }

    pub fn set_clipboard(&mut self, clipboard: Box<dyn Clipboard>) {
        self.clipboard = clipboard;
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Sends one user turn through the streaming path.
    ///
    /// The optimistic user message is appended before any network call and
    /// never rolled back. Upload failures abort before the placeholder
    /// exists and are the only hard error; every later failure lands in the
    /// placeholder as a notice and returns `SendOutcome::Failed`.
    pub async fn send(
        &mut self,
        text: &str,
        files: Vec<LocalAttachment>,
    ) -> SessionResult<SendOutcome> {
        let text = text.trim();
        if text.is_empty() && files.is_empty() {
            return Ok(SendOutcome::Rejected(SendRejection::EmptyInput));
        }
        if !self.state.is_idle() {
            debug!("send refused, another send is active");
            return Ok(SendOutcome::Rejected(SendRejection::SendInProgress));
        }
        if !self.identity.is_complete() {
            return Ok(SendOutcome::Rejected(SendRejection::MissingIdentity));
        }

        let uploading = !files.is_empty();
        self.transition(SessionTransition::BeginSend { uploading });

        let user_message_id = self.alloc_id("temp");
        let attached = files.iter().map(AttachedFile::from_local).collect();
        self.messages
            .push(Message::user(user_message_id.clone(), text, attached));
        self.emit(SessionEvent::MessageAppended(user_message_id.clone()));

        if uploading {
            let count = files.len();
            let batch = UploadBatch {
                files,
                session_id: self.identity.session_id.clone(),
                user_id: self.identity.user_id.clone(),
            };
            let upload_result = self.backend.upload_attachments(batch).await;
            match upload_result {
                Ok(uploaded) => {
                    if let Some(message) = self.find_message_mut(&user_message_id) {
                        for (file, meta) in message.files.iter_mut().zip(&uploaded) {
                            file.apply_upload(meta);
                        }
                    }
                    self.transition(SessionTransition::UploadFinished);
                }
                Err(source) => {
                    warn!(error = %source, count, "attachment upload failed, send aborted");
                    self.transition(SessionTransition::Finish);
                    return Err(source).context(UploadSnafu {
                        stage: "upload_attachments",
                        count,
                    });
                }
            }
        }

        let assistant_id = self.alloc_id("msg");
        self.messages
            .push(Message::assistant_placeholder(assistant_id.clone()));
        self.emit(SessionEvent::MessageAppended(assistant_id.clone()));

        let request = ReplyRequest {
            message: text.to_string(),
            session_id: self.identity.session_id.clone(),
            user_id: self.identity.user_id.clone(),
        };
        let open_result = self.backend.open_reply_stream(request).await;
        let mut stream = match open_result {
            Ok(stream) => stream,
            Err(error) => {
                warn!(error = %error, "could not open reply stream");
                self.fail_stream(&assistant_id, failure_notice(&error.to_string()));
                return Ok(SendOutcome::Failed);
            }
        };
        self.transition(SessionTransition::StreamOpened(assistant_id.clone()));

        let outcome = self.consume_stream(&mut stream, &assistant_id).await;
        self.directory
            .invalidate_for(&self.identity.session_id, &self.identity.user_id);
        Ok(outcome)
    }

    /// Folds the reply stream into the placeholder identified by
    /// `assistant_id`. The id is a parameter on purpose: it is fixed for
    /// the whole fold and never re-read from session state.
    async fn consume_stream(
        &mut self,
        stream: &mut ReplyStream,
        assistant_id: &MessageId,
    ) -> SendOutcome {
        let mut total = String::new();
        loop {
            match stream.next_chunk().await {
                Some(StreamChunk::Content { content }) => {
                    total.push_str(&content);
                    self.overwrite_assistant(assistant_id, &total);
                }
                Some(StreamChunk::Done) => {
                    self.overwrite_assistant(assistant_id, &total);
                    self.transition(SessionTransition::Finish);
                    self.emit(SessionEvent::StreamCompleted(assistant_id.clone()));
                    return SendOutcome::Completed;
                }
                Some(StreamChunk::Error { message }) => {
                    self.fail_stream(assistant_id, failure_notice(&message));
                    return SendOutcome::Failed;
                }
                // The decoder always ends with a terminal chunk; a bare end
                // still fails the send rather than freezing a partial reply.
                None => {
                    self.fail_stream(
                        assistant_id,
                        failure_notice("reply stream ended before completion"),
                    );
                    return SendOutcome::Failed;
                }
            }
        }
    }

    /// Sends one user turn through the non-streaming endpoint. Retained for
    /// hosts that cannot consume a stream; the streaming path is the
    /// primary one.
    pub async fn ask(&mut self, text: &str) -> SessionResult<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SendOutcome::Rejected(SendRejection::EmptyInput));
        }
        if !self.state.is_idle() {
            return Ok(SendOutcome::Rejected(SendRejection::SendInProgress));
        }
        if !self.identity.is_complete() {
            return Ok(SendOutcome::Rejected(SendRejection::MissingIdentity));
        }

        self.transition(SessionTransition::BeginSend { uploading: false });
        let user_message_id = self.alloc_id("temp");
        self.messages
            .push(Message::user(user_message_id.clone(), text, Vec::new()));
        self.emit(SessionEvent::MessageAppended(user_message_id));

        let request = ReplyRequest {
            message: text.to_string(),
            session_id: self.identity.session_id.clone(),
            user_id: self.identity.user_id.clone(),
        };
        let reply_result = self.backend.request_reply(request).await;
        let outcome = match reply_result {
            Ok(reply) => {
                let assistant_id = self.alloc_id("msg");
                let mut message = Message::assistant_placeholder(assistant_id.clone());
                message.content = reply.response.clone();
                self.messages.push(message);
                self.transition(SessionTransition::Finish);
                self.emit(SessionEvent::MessageAppended(assistant_id.clone()));
                self.emit(SessionEvent::AssistantContentUpdated {
                    id: assistant_id.clone(),
                    content: reply.response,
                });
                self.emit(SessionEvent::StreamCompleted(assistant_id));
                SendOutcome::Completed
            }
            Err(error) => {
                warn!(error = %error, "one-shot reply failed");
                let assistant_id = self.alloc_id("msg");
                let notice = failure_notice(&error.to_string());
                let mut message = Message::assistant_placeholder(assistant_id.clone());
                message.content = notice.clone();
                self.messages.push(message);
                self.transition(SessionTransition::Finish);
                self.emit(SessionEvent::StreamFailed {
                    id: assistant_id,
                    notice,
                });
                SendOutcome::Failed
            }
        };
        self.directory
            .invalidate_for(&self.identity.session_id, &self.identity.user_id);
        Ok(outcome)
    }

    /// Replaces the whole message list from stored history. Only legal while
    /// idle; history and sends never interleave.
    pub async fn load_history(&mut self) -> SessionResult<usize> {
        ensure!(self.state.is_idle(), SessionBusySnafu { stage: "load_history" });
        let records = self
            .directory
            .chat_history(&self.identity.session_id, &self.identity.user_id)
            .await?;
        self.messages = records.iter().map(Message::from_history).collect();
        Ok(self.messages.len())
    }

    /// Switches to an existing session and loads its history.
    pub async fn resume(&mut self, session_id: &str) -> SessionResult<usize> {
        ensure!(self.state.is_idle(), SessionBusySnafu { stage: "resume" });
        self.identity.session_id = session_id.to_string();
        self.messages.clear();
        self.load_history().await
    }

    /// Rotates to a fresh session id and an empty message list. Session ids
    /// are never reused.
    pub fn new_conversation(&mut self) -> SessionResult<()> {
        ensure!(self.state.is_idle(), SessionBusySnafu { stage: "new_conversation" });
        self.identity.session_id = fresh_session_id();
        self.messages.clear();
        Ok(())
    }

    /// Deletes a stored session. Deleting the current one rotates to a
    /// fresh conversation.
    pub async fn delete_conversation(&mut self, session_id: &str) -> SessionResult<()> {
        ensure!(self.state.is_idle(), SessionBusySnafu { stage: "delete_conversation" });
        self.directory
            .delete_session(session_id, &self.identity.user_id)
            .await?;
        if session_id == self.identity.session_id {
            self.identity.session_id = fresh_session_id();
            self.messages.clear();
        }
        Ok(())
    }

    /// Best-effort clipboard write; failure becomes a notice, never an
    /// error.
    pub fn copy_to_clipboard(&self, text: &str) {
        if let Err(error) = self.clipboard.copy(text) {
            warn!(error = %error, "clipboard copy failed");
            self.emit(SessionEvent::Notice(format!(
                "could not copy to clipboard: {error}"
            )));
        }
    }

    /// Content of the newest assistant message, for copy commands.
    pub fn last_assistant_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::Assistant)
            .map(|message| message.content.as_str())
    }

    fn overwrite_assistant(&mut self, id: &MessageId, total: &str) {
        if let Some(message) = self.find_message_mut(id) {
            message.content = total.to_string();
        }
        self.emit(SessionEvent::AssistantContentUpdated {
            id: id.clone(),
            content: total.to_string(),
        });
    }

    fn fail_stream(&mut self, id: &MessageId, notice: String) {
        if let Some(message) = self.find_message_mut(id) {
            message.content = notice.clone();
        }
        self.transition(SessionTransition::Finish);
        self.emit(SessionEvent::StreamFailed {
            id: id.clone(),
            notice,
        });
    }

    fn find_message_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|message| &message.id == id)
    }

    fn transition(&mut self, transition: SessionTransition) {
        match self.state.apply(transition) {
            Ok(next) => self.state = next,
            Err(rejection) => warn!(?rejection, "illegal session transition ignored"),
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }

    fn alloc_id(&mut self, prefix: &str) -> MessageId {
        self.next_seq += 1;
        MessageId::new(format!(
            "{prefix}_{}_{}",
            Utc::now().timestamp_millis(),
            self.next_seq
        ))
    }

    #[cfg(test)]
    fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }
}

fn failure_notice(detail: &str) -> String {
    format!("Sorry, something went wrong while handling your request: {detail}")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    use lexchat_cache::LocalCache;
    use lexchat_transport::{HistoryMessage, SessionSummary, TransportError, UploadedFile};

    use super::*;
    use crate::directory::DirectoryConfig;
    use crate::error::SessionError;
    use crate::events::ClipboardError;
    use crate::state::SendPhase;
    use crate::testing::MockBackend;

    struct Harness {
        backend: Arc<MockBackend>,
        session: ChatSession,
        events: Arc<Mutex<Vec<SessionEvent>>>,
        _tmp: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let backend = Arc::new(MockBackend::default());
        let tmp = tempfile::tempdir().unwrap();
        let directory = SessionDirectory::new(
            backend.clone(),
            LocalCache::new(tmp.path().join("cache")),
            DirectoryConfig::default(),
        );
        let mut session = ChatSession::new(
            backend.clone(),
            directory,
            ClientIdentity::new("user_abc123def", "session_1700000000000"),
        );
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        session.set_observer(Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
        }));
        Harness {
            backend,
            session,
            events,
            _tmp: tmp,
        }
    }

    fn content(text: &str) -> StreamChunk {
        StreamChunk::Content {
            content: text.to_string(),
        }
    }

    fn attachment(name: &str) -> LocalAttachment {
        LocalAttachment {
            name: name.to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: b"%PDF".to_vec(),
        }
    }

    fn assistant_updates(events: &Arc<Mutex<Vec<SessionEvent>>>) -> Vec<String> {
        events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::AssistantContentUpdated { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn streamed_reply_is_the_concatenation_of_chunks_in_order() {
        let mut h = harness();
        h.backend
            .push_stream(vec![content("Hel"), content("lo"), content("!"), StreamChunk::Done]);

        let outcome = h.session.send("hi", Vec::new()).await.unwrap();

        assert_eq!(outcome, SendOutcome::Completed);
        assert_eq!(h.session.messages().len(), 2);
        assert_eq!(h.session.messages()[1].content, "Hello!");
        assert!(h.session.is_idle());
    }

    #[tokio::test]
    async fn every_content_update_is_the_full_running_total() {
        let mut h = harness();
        h.backend
            .push_stream(vec![content("a"), content("b"), content("c"), StreamChunk::Done]);

        h.session.send("hi", Vec::new()).await.unwrap();

        let updates = assistant_updates(&h.events);
        assert_eq!(updates, ["a", "ab", "abc", "abc"]);
        for pair in updates.windows(2) {
            assert!(pair[1].starts_with(&pair[0]));
        }
    }

    #[tokio::test]
    async fn user_message_is_appended_before_the_placeholder() {
        let mut h = harness();
        h.backend.push_stream(vec![StreamChunk::Done]);

        h.session.send("hi", Vec::new()).await.unwrap();

        let events = h.events.lock().unwrap();
        let appended: Vec<&MessageId> = events
            .iter()
            .filter_map(|event| match event {
                SessionEvent::MessageAppended(id) => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(appended.len(), 2);
        assert!(appended[0].as_str().starts_with("temp_"));
        assert!(appended[1].as_str().starts_with("msg_"));
    }

    #[tokio::test]
    async fn blank_input_is_rejected_without_side_effects() {
        let mut h = harness();
        let outcome = h.session.send("   ", Vec::new()).await.unwrap();
        assert_eq!(outcome, SendOutcome::Rejected(SendRejection::EmptyInput));
        assert!(h.session.messages().is_empty());
        assert!(h.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_while_active_is_a_rejected_no_op() {
        let mut h = harness();
        h.session
            .set_state(SessionState::Streaming(MessageId::new("msg_live")));

        let outcome = h.session.send("second", Vec::new()).await.unwrap();

        assert_eq!(outcome, SendOutcome::Rejected(SendRejection::SendInProgress));
        assert!(h.session.messages().is_empty());
    }

    #[tokio::test]
    async fn missing_identity_is_rejected() {
        let backend = Arc::new(MockBackend::default());
        let tmp = tempfile::tempdir().unwrap();
        let directory = SessionDirectory::new(
            backend.clone(),
            LocalCache::new(tmp.path().join("cache")),
            DirectoryConfig::default(),
        );
        let mut session =
            ChatSession::new(backend, directory, ClientIdentity::new("", "session_1"));

        let outcome = session.send("hi", Vec::new()).await.unwrap();
        assert_eq!(outcome, SendOutcome::Rejected(SendRejection::MissingIdentity));
    }

    #[tokio::test]
    async fn upload_failure_leaves_exactly_the_user_message() {
        let mut h = harness();
        h.backend.push_upload(Err(TransportError::UploadRejected {
            count: 1,
            status: 500,
        }));

        let result = h.session.send("see attached", vec![attachment("brief.pdf")]).await;

        assert!(matches!(result, Err(SessionError::Upload { count: 1, .. })));
        assert_eq!(h.session.messages().len(), 1);
        assert_eq!(h.session.messages()[0].role, Role::User);
        assert!(h.session.is_idle());
    }

    #[tokio::test]
    async fn successful_upload_reidentifies_the_user_files() {
        let mut h = harness();
        h.backend.push_upload(Ok(vec![UploadedFile {
            id: "66f".to_string(),
            original_name: "brief.pdf".to_string(),
            file_type: "application/pdf".to_string(),
            file_size: 4,
            file_path: "/uploads/s1/brief.pdf".to_string(),
            preview_url: None,
        }]));
        h.backend.push_stream(vec![content("ok"), StreamChunk::Done]);

        let outcome = h
            .session
            .send("see attached", vec![attachment("brief.pdf")])
            .await
            .unwrap();

        assert_eq!(outcome, SendOutcome::Completed);
        let files = &h.session.messages()[0].files;
        assert_eq!(files[0].id, "66f");
        assert_eq!(files[0].storage_path, "/uploads/s1/brief.pdf");

        let batches = h.backend.upload_batches.lock().unwrap();
        assert_eq!(
            batches.as_slice(),
            [(
                1,
                "session_1700000000000".to_string(),
                "user_abc123def".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn error_chunk_overwrites_the_placeholder_and_recovers() {
        let mut h = harness();
        h.backend
            .push_stream(vec![content("part"), StreamChunk::Error {
                message: "rate limited".to_string(),
            }]);

        let outcome = h.session.send("first", Vec::new()).await.unwrap();
        assert_eq!(outcome, SendOutcome::Failed);
        assert_eq!(h.session.messages().len(), 2);
        assert!(h.session.messages()[1].content.contains("rate limited"));
        assert!(h.session.is_idle());

        h.backend.push_stream(vec![content("fine now"), StreamChunk::Done]);
        let outcome = h.session.send("second", Vec::new()).await.unwrap();
        assert_eq!(outcome, SendOutcome::Completed);
        assert_eq!(h.session.messages().len(), 4);
        assert_eq!(h.session.messages()[3].content, "fine now");
    }

    #[tokio::test]
    async fn failed_stream_open_lands_in_the_placeholder() {
        let mut h = harness();
        h.backend.push_stream_error(TransportError::UnexpectedStatus {
            stage: "open_reply_stream",
            status: 503,
        });

        let outcome = h.session.send("hi", Vec::new()).await.unwrap();

        assert_eq!(outcome, SendOutcome::Failed);
        assert_eq!(h.session.messages().len(), 2);
        assert!(h.session.messages()[1].content.contains("503"));
        assert!(h.session.is_idle());
    }

    #[tokio::test]
    async fn load_history_replaces_the_message_list() {
        let mut h = harness();
        let record: HistoryMessage = serde_json::from_str(
            r#"{"_id": "m1", "role": "user", "content": "earlier", "timestamp": "2026-01-05T10:00:00Z"}"#,
        )
        .unwrap();
        h.backend.set_history(vec![record]);

        let count = h.session.load_history().await.unwrap();

        assert_eq!(count, 1);
        assert_eq!(h.session.messages()[0].content, "earlier");
        assert_eq!(h.session.messages()[0].role, Role::User);
    }

    #[tokio::test]
    async fn load_history_refuses_to_interleave_with_a_send() {
        let mut h = harness();
        h.session
            .set_state(SessionState::Sending(SendPhase::AwaitingFirstByte));

        let result = h.session.load_history().await;
        assert!(matches!(result, Err(SessionError::SessionBusy { .. })));
    }

    #[tokio::test]
    async fn completed_send_invalidates_cached_directory_views() {
        let mut h = harness();
        h.backend.set_sessions(vec![SessionSummary {
            session_id: "session_1700000000000".to_string(),
            last_message: String::new(),
            timestamp: String::new(),
        }]);

        let user_id = h.session.identity().user_id.clone();
        h.session.directory().user_sessions(&user_id).await.unwrap();
        h.session.directory().user_sessions(&user_id).await.unwrap();
        assert_eq!(h.backend.sessions_calls.load(Ordering::SeqCst), 1);

        h.backend.push_stream(vec![StreamChunk::Done]);
        h.session.send("hi", Vec::new()).await.unwrap();

        h.session.directory().user_sessions(&user_id).await.unwrap();
        assert_eq!(h.backend.sessions_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_stream_open_keeps_cached_directory_views() {
        let mut h = harness();
        h.backend.set_sessions(vec![SessionSummary {
            session_id: "session_1700000000000".to_string(),
            last_message: String::new(),
            timestamp: String::new(),
        }]);

        let user_id = h.session.identity().user_id.clone();
        h.session.directory().user_sessions(&user_id).await.unwrap();

        // Nothing reached the server, so the cached views are still accurate.
        h.backend.push_stream_error(TransportError::UnexpectedStatus {
            stage: "open_reply_stream",
            status: 503,
        });
        let outcome = h.session.send("hi", Vec::new()).await.unwrap();
        assert_eq!(outcome, SendOutcome::Failed);

        h.session.directory().user_sessions(&user_id).await.unwrap();
        assert_eq!(h.backend.sessions_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn new_conversation_rotates_the_session_id() {
        let mut h = harness();
        h.backend.push_stream(vec![content("x"), StreamChunk::Done]);
        h.session.send("hi", Vec::new()).await.unwrap();
        let before = h.session.identity().session_id.clone();

        h.session.new_conversation().unwrap();

        assert_ne!(h.session.identity().session_id, before);
        assert!(h.session.identity().session_id.starts_with("session_"));
        assert!(h.session.messages().is_empty());
    }

    #[tokio::test]
    async fn deleting_the_current_conversation_rotates_too() {
        let mut h = harness();
        let before = h.session.identity().session_id.clone();

        h.session.delete_conversation(&before).await.unwrap();

        assert_eq!(h.backend.deleted.lock().unwrap().as_slice(), [before.clone()]);
        assert_ne!(h.session.identity().session_id, before);
    }

    #[tokio::test]
    async fn one_shot_ask_appends_the_full_reply() {
        let mut h = harness();
        h.backend.push_reply(Ok(lexchat_transport::ReplyResponse {
            response: "full answer".to_string(),
            session_id: "session_1700000000000".to_string(),
            message_id: Some("srv_1".to_string()),
        }));

        let outcome = h.session.ask("question").await.unwrap();

        assert_eq!(outcome, SendOutcome::Completed);
        assert_eq!(h.session.messages().len(), 2);
        assert_eq!(h.session.messages()[1].content, "full answer");
        assert_eq!(h.session.last_assistant_content(), Some("full answer"));
        // Observers must see the reply text too, not just the append.
        assert_eq!(assistant_updates(&h.events), ["full answer"]);
    }

    #[tokio::test]
    async fn one_shot_ask_failure_appends_a_notice() {
        let mut h = harness();
        h.backend.push_reply(Err(TransportError::UnexpectedStatus {
            stage: "request_reply",
            status: 500,
        }));

        let outcome = h.session.ask("question").await.unwrap();

        assert_eq!(outcome, SendOutcome::Failed);
        assert!(h.session.messages()[1].content.contains("500"));
        assert!(h.session.is_idle());
    }

    #[tokio::test]
    async fn clipboard_failure_becomes_a_notice() {
        struct FailingClipboard;
        impl Clipboard for FailingClipboard {
            fn copy(&self, _text: &str) -> Result<(), ClipboardError> {
                Err(ClipboardError {
                    message: "denied".to_string(),
                })
            }
        }

        let mut h = harness();
        h.session.set_clipboard(Box::new(FailingClipboard));
        h.session.copy_to_clipboard("text");

        let events = h.events.lock().unwrap();
        assert!(matches!(events.as_slice(), [SessionEvent::Notice(notice)] if notice.contains("denied")));
    }
}
