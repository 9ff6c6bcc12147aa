//! Persisted activation state.

use crate::storage::sqlite::acquire_lock;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// What is remembered about the license between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationState {
    /// Last key submitted, accepted or not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_key: Option<String>,
    /// Whether the key was accepted.
    #[serde(default)]
    pub activated: bool,
    /// Unix time of the last successful activation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<u64>,
}

/// Storage for [`ActivationState`].
pub trait ActivationStore: Send + Sync {
    /// Loads the state; a store that was never written yields the default.
    ///
    /// # Errors
    ///
    /// Returns an error if stored state exists but cannot be read.
    fn load(&self) -> Result<ActivationState>;

    /// Replaces the state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be written.
    fn save(&self, state: &ActivationState) -> Result<()>;

    /// Forgets everything.
    ///
    /// # Errors
    ///
    /// Returns an error if stored state cannot be removed.
    fn clear(&self) -> Result<()>;
}

/// Activation state kept as a JSON file.
#[derive(Debug, Clone)]
pub struct FileActivationStore {
    path: PathBuf,
}

impl FileActivationStore {
    /// File name used inside the data directory.
    pub const FILE_NAME: &'static str = "license.json";

    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store in `data_dir`.
    #[must_use]
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(Self::FILE_NAME))
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, operation: &str, e: &dyn std::fmt::Display) -> Error {
        Error::OperationFailed {
            operation: operation.to_string(),
            cause: format!("{}: {e}", self.path.display()),
        }
    }
}

impl ActivationStore for FileActivationStore {
    fn load(&self) -> Result<ActivationState> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| self.io_error("parse_license_state", &e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ActivationState::default()),
            Err(e) => Err(self.io_error("read_license_state", &e)),
        }
    }

    fn save(&self, state: &ActivationState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error("create_license_dir", &e))?;
        }
        let raw = serde_json::to_string_pretty(state)
            .map_err(|e| self.io_error("serialize_license_state", &e))?;
        std::fs::write(&self.path, raw).map_err(|e| self.io_error("write_license_state", &e))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error("remove_license_state", &e)),
        }
    }
}

/// Activation state held in memory.
#[derive(Debug, Default)]
pub struct MemoryActivationStore {
    state: Mutex<ActivationState>,
}

impl MemoryActivationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActivationStore for MemoryActivationStore {
    fn load(&self) -> Result<ActivationState> {
        Ok(acquire_lock(&self.state).clone())
    }

    fn save(&self, state: &ActivationState) -> Result<()> {
        *acquire_lock(&self.state) = state.clone();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *acquire_lock(&self.state) = ActivationState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active() -> ActivationState {
        ActivationState {
            serial_key: Some("KEY-1".to_string()),
            activated: true,
            activated_at: Some(1_700_000_000),
        }
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileActivationStore::in_dir(&dir.path().join("nested"));

        assert_eq!(store.load().unwrap(), ActivationState::default());
        store.save(&active()).unwrap();
        assert_eq!(store.load().unwrap(), active());

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), ActivationState::default());
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_rejects_corrupt_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileActivationStore::in_dir(dir.path());
        std::fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.load(), Err(Error::OperationFailed { .. })));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryActivationStore::new();
        store.save(&active()).unwrap();
        assert!(store.load().unwrap().activated);
        store.clear().unwrap();
        assert!(!store.load().unwrap().activated);
    }
}
