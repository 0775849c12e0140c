//! Saved-session persistence, the localStorage analogue.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What survives a restart: who you are and the room you were in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSession {
    pub username: String,
    pub room_id: String,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved session. A missing or unreadable file means
    /// "nothing saved", never an error.
    pub fn load(&self) -> Option<SavedSession> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read session file {}: {}", self.path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Ignoring corrupt session file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, session: &SavedSession) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing session file {}", self.path.display()))
    }

    /// Forget the saved session. A file that is already gone is fine.
    pub fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("removing session file {}", self.path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(name: &str) -> SessionStore {
        let dir = std::env::temp_dir().join("parley_session_tests");
        let _ = fs::create_dir_all(&dir);
        SessionStore::new(dir.join(name))
    }

    #[test]
    fn save_load_clear_roundtrip() {
        let store = store("roundtrip.json");
        let session = SavedSession {
            username: "alice".into(),
            room_id: "lobby".into(),
        };

        store.save(&session).unwrap();
        assert_eq!(store.load(), Some(session));

        store.clear().unwrap();
        assert_eq!(store.load(), None);
        // Clearing twice must not error.
        store.clear().unwrap();
    }

    #[test]
    fn missing_file_loads_as_none() {
        let store = store("never-written.json");
        let _ = fs::remove_file(store.path());
        assert_eq!(store.load(), None);
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let store = store("corrupt.json");
        fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn file_uses_camel_case_keys() {
        let store = store("keys.json");
        store
            .save(&SavedSession {
                username: "alice".into(),
                room_id: "lobby".into(),
            })
            .unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"roomId\""));
        assert!(raw.contains("\"username\""));
    }
}
