use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::UserId;

/// The session cookie value kept between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub user_id: UserId,
    pub saved_at: DateTime<Utc>,
}

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

    pub fn load(&self) -> Result<Option<StoredSession>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read session file '{}'", self.path.display())
                })
            }
        };
        let session = serde_json::from_str(&raw).with_context(|| {
            format!(
                "session file '{}' is corrupt; run `kantanmemo logout` and log in again",
                self.path.display()
            )
        })?;
        Ok(Some(session))
    }

    pub fn save(&self, user_id: UserId) -> Result<StoredSession> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create session directory '{}'", parent.display())
            })?;
        }

        let session = StoredSession {
            user_id,
            saved_at: Utc::now(),
        };
        fs::write(&self.path, serde_json::to_vec_pretty(&session)?)
            .with_context(|| format!("failed to write session file '{}'", self.path.display()))?;
        Ok(session)
    }

    /// Returns whether a session file existed.
    pub fn clear(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).with_context(|| {
                format!("failed to remove session file '{}'", self.path.display())
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        env,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn temp_root(label: &str) -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        env::temp_dir().join(format!("kantanmemo_{label}_{suffix}"))
    }

    #[test]
    fn save_creates_parent_dir_and_round_trips() {
        let root = temp_root("session_save");
        let store = SessionStore::new(root.join("nested").join("session.json"));

        let saved = store.save(UserId(42)).expect("save");
        let loaded = store.load().expect("load").expect("session present");
        assert_eq!(loaded, saved);

        fs::remove_dir_all(root).expect("cleanup");
    }

    #[test]
    fn missing_file_means_no_session() {
        let store = SessionStore::new(temp_root("session_missing").join("session.json"));
        assert_eq!(store.load().expect("load"), None);
        assert!(!store.clear().expect("clear"));
    }

    #[test]
    fn clear_removes_saved_session() {
        let root = temp_root("session_clear");
        let store = SessionStore::new(root.join("session.json"));
        store.save(UserId(1)).expect("save");

        assert!(store.clear().expect("clear"));
        assert_eq!(store.load().expect("load"), None);

        fs::remove_dir_all(root).expect("cleanup");
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let root = temp_root("session_corrupt");
        fs::create_dir_all(&root).expect("root");
        let path = root.join("session.json");
        fs::write(&path, "not json").expect("write");

        let err = SessionStore::new(&path).load().expect_err("corrupt");
        assert!(err.to_string().contains("corrupt"));

        fs::remove_dir_all(root).expect("cleanup");
    }
}
