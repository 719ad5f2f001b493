use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("failed to build HTTP client: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request failed on `{stage}`: {source}"))]
    Network {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("backend returned status {status} on `{stage}`"))]
    UnexpectedStatus { stage: &'static str, status: u16 },
    #[snafu(display("failed to decode response body on `{stage}`: {source}"))]
    DecodeBody {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("reply stream has content type '{content_type}', expected text/event-stream"))]
    NotEventStream { content_type: String },
    #[snafu(display("upload batch is empty"))]
    EmptyUploadBatch { stage: &'static str },
    #[snafu(display("upload of {count} file(s) was rejected with status {status}"))]
    UploadRejected { count: usize, status: u16 },
    #[snafu(display("upload failed on `{stage}`: {source}"))]
    UploadTransport {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("upload response listed {returned} file(s) for {submitted} submitted"))]
    UploadCountMismatch { submitted: usize, returned: usize },
}

pub type TransportResult<T> = Result<T, TransportError>;
