//! Session token storage.
//!
//! # Design
//! - The gateway reads the token on every call so externally refreshed
//!   tokens are picked up without a restart.
//! - Storage is injected so tests can swap in [`MemoryTokenStore`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::{Map, Value};
use tracing::warn;

/// Source of the current bearer token.
pub trait TokenStore: Send + Sync {
    /// Current token, or `None` when no session exists.
    fn token(&self) -> Option<String>;
}

/// In-memory token holder, primarily for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    /// Create a store pre-populated with `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Replace the stored token.
    pub fn set(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        let guard = match self.token.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone().filter(|token| !token.trim().is_empty())
    }
}

/// Token persisted in a JSON key/value file under a fixed key.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    key: String,
}

impl FileTokenStore {
    /// Create a store backed by `path`, reading the token under `key`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `token`, preserving any other keys in the file.
    ///
    /// # Errors
    /// Returns an IO error when the file cannot be written.
    pub fn save(&self, token: &str) -> io::Result<()> {
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(self.key.clone(), Value::String(token.to_string()));
        self.write_entries(&entries)
    }

    /// Remove the token, preserving any other keys in the file.
    ///
    /// # Errors
    /// Returns an IO error when the file cannot be written.
    pub fn clear(&self) -> io::Result<()> {
        let Some(mut entries) = self.read_entries() else {
            return Ok(());
        };
        entries.remove(&self.key);
        self.write_entries(&entries)
    }

    fn read_entries(&self) -> Option<Map<String, Value>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "session store unreadable");
                return None;
            }
        };
        match serde_json::from_slice::<Map<String, Value>>(&raw) {
            Ok(entries) => Some(entries),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "session store is not valid JSON");
                None
            }
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> io::Result<()> {
        let body = serde_json::to_vec_pretty(entries).map_err(io::Error::other)?;
        fs::write(&self.path, body)
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> Option<String> {
        self.read_entries()?
            .get(&self.key)
            .and_then(Value::as_str)
            .filter(|token| !token.trim().is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_treats_blank_tokens_as_missing() {
        let store = MemoryTokenStore::default();
        assert_eq!(store.token(), None);
        store.set(Some("  ".into()));
        assert_eq!(store.token(), None);
        store.set(Some("abc".into()));
        assert_eq!(store.token().as_deref(), Some("abc"));
    }

    #[test]
    fn file_store_reads_fresh_value_each_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileTokenStore::new(&path, "auth_token");
        assert_eq!(store.token(), None);

        store.save("first").unwrap();
        assert_eq!(store.token().as_deref(), Some("first"));

        fs::write(&path, r#"{"auth_token":"rotated","theme":"dark"}"#).unwrap();
        assert_eq!(store.token().as_deref(), Some("rotated"));

        store.clear().unwrap();
        assert_eq!(store.token(), None);
        let remaining = fs::read_to_string(&path).unwrap();
        assert!(remaining.contains("theme"));
    }

    #[test]
    fn file_store_keeps_non_string_neighbours() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"theme":1,"flags":{"beta":true},"auth_token":null}"#).unwrap();
        let store = FileTokenStore::new(&path, "auth_token");
        assert_eq!(store.token(), None);

        store.save("fresh").unwrap();
        assert_eq!(store.token().as_deref(), Some("fresh"));
        store.clear().unwrap();

        let remaining: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            remaining,
            serde_json::json!({ "theme": 1, "flags": { "beta": true } })
        );
    }

    #[test]
    fn file_store_ignores_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();
        let store = FileTokenStore::new(&path, "auth_token");
        assert_eq!(store.token(), None);
        store.save("fresh").unwrap();
        assert_eq!(store.token().as_deref(), Some("fresh"));
    }
}
