use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Namespaced collection keys, one JSON document each. The spellings match
/// every historical revision of the on-disk layout.
pub mod keys {
    pub const JOURNAL: &str = "dm_journal";
    pub const TODOS: &str = "dm_todos";
    pub const SETTINGS: &str = "dm_settings";
    pub const LOGS: &str = "dm_labLogs";
    pub const RATINGS: &str = "dm_dayRatings";
    pub const LEDGER: &str = "dm_ledger";
    pub const LEDGER_HISTORY: &str = "dm_ledgerHistory";
    pub const WORKSPACE: &str = "dm_workspace";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create data directory: {0}")]
    DirectoryError(String),
    #[error("Failed to write {key}: {source}")]
    WriteError {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize {key}: {source}")]
    SerializeError {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One-JSON-document-per-key persistence rooted at a data directory.
pub struct Store {
    dir: PathBuf,
}

impl Store {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: &Path) -> Result<Self, StoreError> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| StoreError::DirectoryError(e.to_string()))?;
        }
        Ok(Store { dir: dir.to_path_buf() })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Load the raw document stored under `key`. A missing file reads as
    /// None; a malformed one is logged and also reads as None so the
    /// collection falls back to its empty default without affecting the
    /// rest of the load.
    pub fn load(&self, key: &str) -> Option<Value> {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(key, error = %e, "failed to read stored document");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "stored document is not valid JSON, using defaults");
                None
            }
        }
    }

    /// Serialize `value` under `key`. Write failures propagate; there is
    /// no retry logic.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value).map_err(|source| StoreError::SerializeError {
            key: key.to_string(),
            source,
        })?;
        fs::write(self.path_for(key), json).map_err(|source| StoreError::WriteError {
            key: key.to_string(),
            source,
        })
    }
}
