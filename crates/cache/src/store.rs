use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// One cached value with its absolute expiry, as stored on disk.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CacheEntry<T> {
    data: T,
    stored_at: i64,
    expires_at: i64,
}

/// Time-boxed key/value store over a directory of JSON entry files.
///
/// Every failure path degrades to a cache miss (or a logged no-op on write)
/// so callers never have to handle storage errors; staleness is bounded by
/// the per-entry TTL and explicit `remove` calls.
pub struct LocalCache {
    root: Option<PathBuf>,
}

impl LocalCache {
    /// Opens a cache rooted at `root`, creating the directory if needed.
    ///
    /// If the directory cannot be created the cache is marked unavailable
    /// and behaves as permanently empty.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        match fs::create_dir_all(&root) {
            Ok(()) => Self { root: Some(root) },
            Err(error) => {
                tracing::warn!(path = %root.display(), error = %error, "cache storage unavailable");
                Self { root: None }
            }
        }
    }

    /// Builds a cache that never stores anything (storage disabled).
    pub fn unavailable() -> Self {
        Self { root: None }
    }

    pub fn is_available(&self) -> bool {
        self.root.is_some()
    }

    /// Stores `value` under `key` with absolute expiry `now + ttl`,
    /// overwriting any existing entry. A failed write sweeps expired
    /// entries to reclaim space and is otherwise a no-op.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let Some(path) = self.entry_path(key) else {
            return;
        };

        let now = now_millis();
        let entry = CacheEntry {
            data: value,
            stored_at: now,
            expires_at: now.saturating_add(ttl.as_millis() as i64),
        };

        let payload = match serde_json::to_vec(&entry) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(key, error = %error, "failed to encode cache entry");
                return;
            }
        };

        if let Err(error) = fs::write(&path, payload) {
            tracing::warn!(key, error = %error, "cache write failed, sweeping expired entries");
            self.sweep_expired();
        }
    }

    /// Returns the value for `key` if present and unexpired.
    ///
    /// Expired entries are evicted on read. Missing storage, unreadable
    /// files, and undecodable payloads all report a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.entry_path(key)?;
        let raw = fs::read_to_string(&path).ok()?;

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(key, error = %error, "discarding undecodable cache entry");
                let _ = fs::remove_file(&path);
                return None;
            }
        };

        if now_millis() >= entry.expires_at {
            let _ = fs::remove_file(&path);
            return None;
        }

        Some(entry.data)
    }

    /// Removes the entry for `key`, if any.
    pub fn remove(&self, key: &str) {
        if let Some(path) = self.entry_path(key) {
            let _ = fs::remove_file(path);
        }
    }

    /// Deletes every expired entry file. Files that do not parse as cache
    /// entries are left alone.
    pub fn sweep_expired(&self) {
        let Some(root) = &self.root else {
            return;
        };
        let Ok(entries) = fs::read_dir(root) else {
            return;
        };

        let now = now_millis();
        for dir_entry in entries.flatten() {
            let path = dir_entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if let Some(expires_at) = read_expiry(&path)
                && now >= expires_at
            {
                let _ = fs::remove_file(&path);
            }
        }
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        let root = self.root.as_ref()?;
        Some(root.join(format!("{}.json", sanitize_key(key))))
    }
}

fn read_expiry(path: &Path) -> Option<i64> {
    let raw = fs::read_to_string(path).ok()?;
    let entry: CacheEntry<serde_json::Value> = serde_json::from_str(&raw).ok()?;
    Some(entry.expires_at)
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Maps an arbitrary key onto a filesystem-safe file stem.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
