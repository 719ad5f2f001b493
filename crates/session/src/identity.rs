use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use tracing::{debug, warn};

use crate::error::{IdentityStoreSnafu, SessionResult};

pub const USER_ID_SUFFIX_LEN: usize = 9;

/// Who this client is: a durable per-installation user id and a
/// per-conversation session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub user_id: String,
    pub session_id: String,
}

impl ClientIdentity {
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.user_id.is_empty() && !self.session_id.is_empty()
    }
}

/// `user_` plus nine random lowercase alphanumerics.
pub fn fresh_user_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(|byte| (byte as char).to_ascii_lowercase())
        .take(USER_ID_SUFFIX_LEN)
        .collect();
    format!("user_{suffix}")
}

/// `session_` plus the current unix-millisecond timestamp. Fresh per
/// conversation, never reused.
pub fn fresh_session_id() -> String {
    format!("session_{}", Utc::now().timestamp_millis())
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredIdentity {
    user_id: String,
}

/// Persists the user id across runs in a small JSON file.
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the persisted user id, minting and saving a fresh one when the
    /// file is absent or unreadable. Pairs it with a new session id.
    pub fn load_or_create(&self) -> SessionResult<ClientIdentity> {
        let user_id = match self.load_user_id() {
            Some(user_id) => user_id,
            None => {
                let user_id = fresh_user_id();
                self.save_user_id(&user_id)?;
                debug!(user_id = %user_id, "minted new client identity");
                user_id
            }
        };
        Ok(ClientIdentity::new(user_id, fresh_session_id()))
    }

    fn load_user_id(&self) -> Option<String> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<StoredIdentity>(&raw) {
            Ok(stored) if !stored.user_id.is_empty() => Some(stored.user_id),
            Ok(_) => None,
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "identity file is corrupt, reminting");
                None
            }
        }
    }

    fn save_user_id(&self, user_id: &str) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context(IdentityStoreSnafu { stage: "create_dir" })?;
        }
        let stored = StoredIdentity {
            user_id: user_id.to_string(),
        };
        let body = serde_json::to_string_pretty(&stored)
            .map_err(std::io::Error::other)
            .context(IdentityStoreSnafu { stage: "encode" })?;
        fs::write(&self.path, body).context(IdentityStoreSnafu { stage: "write" })
    }
}
