// # File State Store
//
// File-based implementation of StateStore with crash recovery.
//
// ## Purpose
//
// Keeps the last sync outcome of every tracked record across daemon
// restarts so `aliddnsd` can report what was last published.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "records": {
//     "home.example.com/A": {
//       "last_value": "1.2.3.4",
//       "last_status": "success",
//       "last_message": "updated home.example.com -> 1.2.3.4",
//       "last_synced": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{RecordState, StateStore};

/// State file format version
const STATE_FILE_VERSION: &str = "1.0";

/// File-based state store with crash recovery
///
/// Every mutation is written to disk before the call returns.
///
/// # Crash Recovery
///
/// - **Atomic writes**: New state written to temporary file, then renamed
/// - **Backup**: Last known good state kept in `.backup` file
/// - **Corruption detection**: JSON validation on load
/// - **Automatic recovery**: Falls back to backup if main file corrupted
///
/// # Example
///
/// ```rust,no_run
/// use aliddns_core::state::FileStateStore;
/// use aliddns_core::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/aliddns/state.json").await?;
///
///     for key in store.list_records().await? {
///         println!("{key}: {:?}", store.get_record(&key).await?);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

#[derive(Debug)]
struct FileState {
    records: HashMap<String, RecordState>,
    dirty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateFileFormat {
    version: String,
    records: HashMap<String, RecordState>,
}

impl FileStateStore {
    /// Create or load a file state store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing state file
    /// 3. If it is corrupted, load the backup and restore the main file from it
    /// 4. If both are unusable, start with empty state
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let records = Self::load_state_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                records,
                dirty: false,
            })),
        })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state from file with automatic recovery
    ///
    /// Only parse failures trigger recovery; I/O errors propagate.
    async fn load_state_with_recovery(
        path: &Path,
    ) -> Result<HashMap<String, RecordState>, Error> {
        let err = match Self::load_state(path).await {
            Ok(records) => {
                tracing::debug!("Loaded state from file: {} records", records.len());
                return Ok(records);
            }
            Err(Error::Json(err)) => err,
            Err(e) => return Err(e),
        };

        tracing::warn!(
            "State file {} appears corrupted: {}. Attempting recovery from backup.",
            path.display(),
            err
        );

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::warn!("No backup file found. Starting with empty state.");
            return Ok(HashMap::new());
        }

        match Self::load_state(&backup_path).await {
            Ok(records) => {
                tracing::info!("Recovered state from backup: {} records", records.len());

                if let Err(restore_err) = Self::restore_from_backup(path, &backup_path).await {
                    tracing::error!(
                        "Failed to restore state file from backup: {}",
                        restore_err
                    );
                }

                Ok(records)
            }
            Err(backup_err) => {
                tracing::error!(
                    "Backup also unusable: {}. Starting with empty state.",
                    backup_err
                );
                Ok(HashMap::new())
            }
        }
    }

    /// Load state from file
    ///
    /// Returns [`Error::Json`] when the content does not parse.
    async fn load_state(path: &Path) -> Result<HashMap<String, RecordState>, Error> {
        if !path.exists() {
            tracing::debug!("State file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to read state file {}: {}",
                path.display(),
                e
            ))
        })?;

        let state_file: StateFileFormat = serde_json::from_str(&content)?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "State file version mismatch: expected {}, got {}. Attempting to load anyway.",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(state_file.records)
    }

    /// Write state to file atomically
    async fn write_state(&self) -> Result<(), Error> {
        let mut state_guard = self.state.write().await;

        let state_file = StateFileFormat {
            version: STATE_FILE_VERSION.to_string(),
            records: state_guard.records.clone(),
        };

        let json = serde_json::to_string_pretty(&state_file)
            .map_err(|e| Error::state_store(format!("Failed to serialize state: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        state_guard.dirty = false;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    async fn restore_from_backup(path: &Path, backup_path: &Path) -> Result<(), Error> {
        fs::copy(backup_path, path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to restore from backup {} to {}: {}",
                backup_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!("Restored state file from backup");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_record(&self, key: &str) -> Result<Option<RecordState>, Error> {
        let state_guard = self.state.read().await;
        Ok(state_guard.records.get(key).cloned())
    }

    async fn set_record(&self, key: &str, state: &RecordState) -> Result<(), Error> {
        {
            let mut state_guard = self.state.write().await;
            state_guard.records.insert(key.to_string(), state.clone());
            state_guard.dirty = true;
        }

        self.write_state().await
    }

    async fn delete_record(&self, key: &str) -> Result<(), Error> {
        {
            let mut state_guard = self.state.write().await;
            state_guard.records.remove(key);
            state_guard.dirty = true;
        }

        self.write_state().await
    }

    async fn list_records(&self) -> Result<Vec<String>, Error> {
        let state_guard = self.state.read().await;
        Ok(state_guard.records.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        let dirty = self.state.read().await.dirty;
        if dirty { self.write_state().await } else { Ok(()) }
    }
}
