use std::sync::Arc;
use std::time::Duration;

use lexchat_cache::LocalCache;
use lexchat_transport::{ChatBackend, HistoryMessage, HistoryQuery, SessionSummary, SessionsQuery};
use snafu::ResultExt;
use tracing::debug;

use crate::error::{HistoryFetchSnafu, SessionDeleteSnafu, SessionResult, SessionsFetchSnafu};

pub const DEFAULT_DIRECTORY_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub history_ttl: Duration,
    pub sessions_ttl: Duration,
    pub history_limit: u32,
    pub sessions_limit: u32,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            history_ttl: DEFAULT_DIRECTORY_TTL,
            sessions_ttl: DEFAULT_DIRECTORY_TTL,
            history_limit: 50,
            sessions_limit: 20,
        }
    }
}

/// Cache-fronted reads of the per-user conversation directory.
///
/// The cache has no change subscriptions, so writers (sends, deletes) must
/// invalidate through here.
pub struct SessionDirectory {
    backend: Arc<dyn ChatBackend>,
    cache: LocalCache,
    config: DirectoryConfig,
}

fn history_key(session_id: &str) -> String {
    format!("chat_history_{session_id}")
}

fn sessions_key(user_id: &str) -> String {
    format!("user_sessions_{user_id}")
}

impl SessionDirectory {
    pub fn new(backend: Arc<dyn ChatBackend>, cache: LocalCache, config: DirectoryConfig) -> Self {
        Self {
            backend,
            cache,
            config,
        }
    }

    /// Stored messages for one session, newest fetch cached for the
    /// configured TTL.
    pub async fn chat_history(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> SessionResult<Vec<HistoryMessage>> {
        let key = history_key(session_id);
        if let Some(cached) = self.cache.get::<Vec<HistoryMessage>>(&key) {
            debug!(session_id, "history served from cache");
            return Ok(cached);
        }

        let messages = self
            .backend
            .chat_history(HistoryQuery {
                session_id: session_id.to_string(),
                user_id: user_id.to_string(),
                limit: self.config.history_limit,
            })
            .await
            .context(HistoryFetchSnafu {
                stage: "chat_history",
                session_id,
            })?;
        self.cache.set(&key, &messages, self.config.history_ttl);
        Ok(messages)
    }

    /// The user's recent sessions, cached like history.
    pub async fn user_sessions(&self, user_id: &str) -> SessionResult<Vec<SessionSummary>> {
        let key = sessions_key(user_id);
        if let Some(cached) = self.cache.get::<Vec<SessionSummary>>(&key) {
            debug!(user_id, "session list served from cache");
            return Ok(cached);
        }

        let sessions = self
            .backend
            .user_sessions(SessionsQuery {
                user_id: user_id.to_string(),
                limit: self.config.sessions_limit,
            })
            .await
            .context(SessionsFetchSnafu { stage: "user_sessions" })?;
        self.cache.set(&key, &sessions, self.config.sessions_ttl);
        Ok(sessions)
    }

    pub async fn delete_session(&self, session_id: &str, user_id: &str) -> SessionResult<()> {
        self.backend
            .delete_session(session_id, user_id)
            .await
            .context(SessionDeleteSnafu {
                stage: "delete_session",
                session_id,
            })?;
        self.invalidate_for(session_id, user_id);
        Ok(())
    }

    /// Drops both cached views of this identity. Called after every send
    /// and delete so the next read refetches.
    pub fn invalidate_for(&self, session_id: &str, user_id: &str) {
        self.cache.remove(&history_key(session_id));
        self.cache.remove(&sessions_key(user_id));
    }
}
