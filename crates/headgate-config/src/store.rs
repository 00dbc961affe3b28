//! Persisted session: which account is signed in on this machine.
//!
//! The backend issues no tokens; the stored user name IS the session.
//! One small TOML file in the platform data directory, written on
//! login and removed on logout.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session file is unreadable: {reason}")]
    Corrupt { reason: String },

    #[error("failed to serialize session: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The persisted session payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoredSession {
    pub user_name: String,
}

impl StoredSession {
    pub fn new(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
        }
    }
}

/// Loads, saves, and clears the persisted session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// A store at an explicit path (tests, unusual setups).
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The store at the platform data directory.
    pub fn default_location() -> Self {
        Self::at(session_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session. A missing file means nobody is signed
    /// in and is not an error; a present-but-unreadable file is.
    pub fn load(&self) -> Result<Option<StoredSession>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let session: StoredSession = toml::from_str(&raw).map_err(|e| StoreError::Corrupt {
            reason: e.to_string(),
        })?;
        Ok(Some(session))
    }

    /// Persist a session, replacing any previous one. On failure the
    /// previous file state is undefined, so callers must treat the
    /// user as signed out until a save succeeds.
    pub fn save(&self, session: &StoredSession) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(session)?;
        std::fs::write(&self.path, toml_str)?;
        Ok(())
    }

    /// Remove the stored session. Clearing an already-clear store is
    /// a no-op, so logout can be retried freely.
    pub fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Session file path via XDG / platform conventions.
fn session_path() -> PathBuf {
    ProjectDirs::from("com", "hyperbliss", "headgate").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".local");
            p.push("share");
            p.push("headgate");
            p.push("session.toml");
            p
        },
        |dirs| dirs.data_dir().join("session.toml"),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::at(dir.path().join("nested").join("session.toml"))
    }

    #[test]
    fn load_missing_file_is_nobody_signed_in() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.save(&StoredSession::new("farm1")).unwrap();

        assert_eq!(store.load().unwrap(), Some(StoredSession::new("farm1")));
    }

    #[test]
    fn save_overwrites_previous_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.save(&StoredSession::new("farm1")).unwrap();
        store.save(&StoredSession::new("farm2")).unwrap();

        assert_eq!(store.load().unwrap().unwrap().user_name, "farm2");
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        store.clear().unwrap();
        store.save(&StoredSession::new("farm1")).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();

        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "user_name = [this is not toml").unwrap();

        let err = SessionStore::at(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
