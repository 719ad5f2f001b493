use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use snafu::{ResultExt, ensure};
use tracing::debug;

use crate::backend::{BoxFuture, ChatBackend};
use crate::error::{
    BuildClientSnafu, DecodeBodySnafu, EmptyUploadBatchSnafu, NetworkSnafu, NotEventStreamSnafu,
    TransportError, TransportResult, UnexpectedStatusSnafu, UploadCountMismatchSnafu,
    UploadRejectedSnafu, UploadTransportSnafu,
};
use crate::stream::ReplyStream;
use crate::wire::{
    HistoryEnvelope, HistoryMessage, HistoryQuery, ReplyRequest, ReplyResponse, SessionSummary,
    SessionsEnvelope, SessionsQuery, UploadBatch, UploadEnvelope, UploadedFile,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub base_url: String,
    /// Applies to one-shot calls only. Streamed replies use the idle
    /// timeout instead, since a healthy stream can outlive any fixed
    /// request deadline.
    pub request_timeout: Duration,
    pub stream_idle_timeout: Duration,
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            stream_idle_timeout: DEFAULT_STREAM_IDLE_TIMEOUT,
        }
    }
}

/// `ChatBackend` over HTTP, matching the server's REST and SSE surface.
pub struct HttpBackend {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpBackend {
    pub fn new(config: TransportConfig) -> TransportResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context(BuildClientSnafu { stage: "build_client" })?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.config.base_url, path)
    }

    fn check_status(
        response: &reqwest::Response,
        stage: &'static str,
    ) -> Result<(), TransportError> {
        ensure!(
            response.status().is_success(),
            UnexpectedStatusSnafu {
                stage,
                status: response.status().as_u16(),
            }
        );
        Ok(())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// No partial-success contract: the server must return metadata for every
/// submitted file, in submission order.
fn check_upload_count(
    submitted: usize,
    files: Vec<UploadedFile>,
) -> TransportResult<Vec<UploadedFile>> {
    ensure!(
        files.len() == submitted,
        UploadCountMismatchSnafu {
            submitted,
            returned: files.len(),
        }
    );
    Ok(files)
}

impl ChatBackend for HttpBackend {
    fn request_reply<'a>(
        &'a self,
        request: ReplyRequest,
    ) -> BoxFuture<'a, TransportResult<ReplyResponse>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.url("/api/chat"))
                .timeout(self.config.request_timeout)
                .json(&request)
                .send()
                .await
                .context(NetworkSnafu { stage: "request_reply" })?;
            Self::check_status(&response, "request_reply")?;
            response
                .json::<ReplyResponse>()
                .await
                .context(DecodeBodySnafu { stage: "request_reply" })
        })
    }

    fn open_reply_stream<'a>(
        &'a self,
        request: ReplyRequest,
    ) -> BoxFuture<'a, TransportResult<ReplyStream>> {
        Box::pin(async move {
            debug!(session_id = %request.session_id, "opening reply stream");
            let response = self
                .client
                .post(self.url("/api/chat/stream"))
                .json(&request)
                .send()
                .await
                .context(NetworkSnafu { stage: "open_reply_stream" })?;
            Self::check_status(&response, "open_reply_stream")?;

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("")
                .to_string();
            ensure!(
                content_type.starts_with("text/event-stream"),
                NotEventStreamSnafu { content_type }
            );

            Ok(ReplyStream::from_response(response)
                .with_idle_timeout(self.config.stream_idle_timeout))
        })
    }

    fn upload_attachments<'a>(
        &'a self,
        batch: UploadBatch,
    ) -> BoxFuture<'a, TransportResult<Vec<UploadedFile>>> {
        Box::pin(async move {
            ensure!(!batch.files.is_empty(), EmptyUploadBatchSnafu { stage: "upload" });
            let submitted = batch.files.len();

            let mut form = Form::new()
                .text("session_id", batch.session_id)
                .text("user_id", batch.user_id);
            for file in batch.files {
                let part = Part::bytes(file.bytes)
                    .file_name(file.name)
                    .mime_str(&file.mime_type)
                    .context(UploadTransportSnafu { stage: "upload_part" })?;
                form = form.part("files", part);
            }

            let response = self
                .client
                .post(self.url("/api/upload"))
                .timeout(self.config.request_timeout)
                .multipart(form)
                .send()
                .await
                .context(UploadTransportSnafu { stage: "upload" })?;
            ensure!(
                response.status().is_success(),
                UploadRejectedSnafu {
                    count: submitted,
                    status: response.status().as_u16(),
                }
            );

            let envelope = response
                .json::<UploadEnvelope>()
                .await
                .context(DecodeBodySnafu { stage: "upload" })?;
            check_upload_count(submitted, envelope.files)
        })
    }

    fn chat_history<'a>(
        &'a self,
        query: HistoryQuery,
    ) -> BoxFuture<'a, TransportResult<Vec<HistoryMessage>>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url("/api/chat/history"))
                .timeout(self.config.request_timeout)
                .query(&[
                    ("session_id", query.session_id.as_str()),
                    ("user_id", query.user_id.as_str()),
                    ("limit", &query.limit.to_string()),
                ])
                .send()
                .await
                .context(NetworkSnafu { stage: "chat_history" })?;
            Self::check_status(&response, "chat_history")?;
            let envelope = response
                .json::<HistoryEnvelope>()
                .await
                .context(DecodeBodySnafu { stage: "chat_history" })?;
            Ok(envelope.messages)
        })
    }

    fn user_sessions<'a>(
        &'a self,
        query: SessionsQuery,
    ) -> BoxFuture<'a, TransportResult<Vec<SessionSummary>>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.url("/api/chat/sessions"))
                .timeout(self.config.request_timeout)
                .query(&[
                    ("user_id", query.user_id.as_str()),
                    ("limit", &query.limit.to_string()),
                ])
                .send()
                .await
                .context(NetworkSnafu { stage: "user_sessions" })?;
            Self::check_status(&response, "user_sessions")?;
            let envelope = response
                .json::<SessionsEnvelope>()
                .await
                .context(DecodeBodySnafu { stage: "user_sessions" })?;
            Ok(envelope.sessions)
        })
    }

    fn delete_session<'a>(
        &'a self,
        session_id: &'a str,
        user_id: &'a str,
    ) -> BoxFuture<'a, TransportResult<()>> {
        Box::pin(async move {
            let response = self
                .client
                .delete(self.url(&format!("/api/chat/sessions/{session_id}")))
                .timeout(self.config.request_timeout)
                .query(&[("user_id", user_id)])
                .send()
                .await
                .context(NetworkSnafu { stage: "delete_session" })?;
            Self::check_status(&response, "delete_session")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("http://localhost:8000/", "/api/chat"),
            "http://localhost:8000/api/chat"
        );
        assert_eq!(
            join_url("http://localhost:8000", "api/chat"),
            "http://localhost:8000/api/chat"
        );
    }

    #[test]
    fn upload_response_must_list_every_submitted_file() {
        let returned = vec![UploadedFile {
            id: "66f".to_string(),
            original_name: "brief.pdf".to_string(),
            file_type: "application/pdf".to_string(),
            file_size: 4,
            file_path: "/uploads/s1/brief.pdf".to_string(),
            preview_url: None,
        }];

        let accepted = check_upload_count(1, returned.clone()).expect("count matches");
        assert_eq!(accepted.len(), 1);

        let error = check_upload_count(2, returned).expect_err("one file short");
        assert!(matches!(
            error,
            TransportError::UploadCountMismatch {
                submitted: 2,
                returned: 1,
            }
        ));
    }

    #[test]
    fn config_defaults_keep_streams_off_the_request_deadline() {
        let config = TransportConfig::new("http://localhost:8000");
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert!(config.stream_idle_timeout > config.request_timeout);
    }
}
