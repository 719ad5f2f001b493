use lexchat_transport::TransportError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("upload of {count} file(s) failed: {source}"))]
    Upload {
        stage: &'static str,
        count: usize,
        source: TransportError,
    },
    #[snafu(display("failed to fetch history for '{session_id}': {source}"))]
    HistoryFetch {
        stage: &'static str,
        session_id: String,
        source: TransportError,
    },
    #[snafu(display("failed to fetch session list: {source}"))]
    SessionsFetch {
        stage: &'static str,
        source: TransportError,
    },
    #[snafu(display("failed to delete session '{session_id}': {source}"))]
    SessionDelete {
        stage: &'static str,
        session_id: String,
        source: TransportError,
    },
    #[snafu(display("identity store failed on `{stage}`: {source}"))]
    IdentityStore {
        stage: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("operation requires an idle session"))]
    SessionBusy { stage: &'static str },
}

pub type SessionResult<T> = Result<T, SessionError>;
