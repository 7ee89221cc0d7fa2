// # State Store Trait
//
// Defines the interface for persisting per-record sync outcomes.
//
// ## Purpose
//
// The provider is the source of truth for record values; the state store is
// the caller-owned cache of what the last cycle observed:
// - The last published value for each tracked record
// - The status and message of the last attempt
// - When that attempt finished
//
// The sync engine never reads it. The daemon writes it after each cycle so
// the outcome survives restarts and can be displayed.
//
// ## Implementations
//
// - In-memory: `MemoryStateStore`
// - File-based: `FileStateStore` (JSON, atomic writes)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{SyncResult, SyncStatus};

/// State record for a tracked DNS entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordState {
    /// Value known to be published at the provider, if any
    pub last_value: Option<String>,
    /// Status of the last attempt
    pub last_status: SyncStatus,
    /// Message of the last attempt
    pub last_message: String,
    /// When the last attempt finished
    pub last_synced: DateTime<Utc>,
}

impl RecordState {
    /// Build the state that follows `result`
    ///
    /// On error the previously known value is kept, since a failed write
    /// leaves the provider untouched.
    pub fn from_result(result: &SyncResult, previous: Option<&RecordState>) -> Self {
        let last_value = match result.status {
            SyncStatus::Success => result.new_value.clone(),
            SyncStatus::Skipped => result
                .new_value
                .clone()
                .or_else(|| previous.and_then(|p| p.last_value.clone())),
            SyncStatus::Error => previous.and_then(|p| p.last_value.clone()),
        };

        Self {
            last_value,
            last_status: result.status,
            last_message: result.message.clone(),
            last_synced: Utc::now(),
        }
    }
}

/// Trait for state store implementations
///
/// Keys are [`TrackedRecord::key`](crate::TrackedRecord::key) strings.
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
///
/// ## Implementation Guidelines
///
/// - **Async I/O only**: Use async file/database operations, never blocking I/O
/// - **Explicit flush**: `flush()` must persist all pending changes
/// - **No background tasks**: persistence happens inside the calls
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the state of a record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(RecordState))`: The stored state
    /// - `Ok(None)`: No record found
    /// - `Err(Error)`: Storage error
    async fn get_record(&self, key: &str) -> Result<Option<RecordState>, crate::Error>;

    /// Create or replace the state of a record
    async fn set_record(&self, key: &str, state: &RecordState) -> Result<(), crate::Error>;

    /// Delete a record (succeeds if it didn't exist)
    async fn delete_record(&self, key: &str) -> Result<(), crate::Error>;

    /// List all keys in the store
    async fn list_records(&self) -> Result<Vec<String>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;

    /// Fold a sync result into the stored state of its record
    async fn record_result(&self, result: &SyncResult) -> Result<RecordState, crate::Error> {
        let key = result.key();
        let previous = self.get_record(&key).await?;
        let state = RecordState::from_result(result, previous.as_ref());
        self.set_record(&key, &state).await?;
        Ok(state)
    }
}
