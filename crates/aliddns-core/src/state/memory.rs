// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Keeps the last sync outcome of each record for the lifetime of the
// process. Nothing survives a restart; the provider remains the source of
// truth, so the only loss is the displayed history.
//
// ## When to Use
//
// - Testing environments
// - `aliddnsd once` runs
// - Deployments that do not need outcome history

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{RecordState, StateStore};

/// In-memory state store implementation
///
/// This implementation stores all state in a HashMap protected by a RwLock.
/// Clones share the same map.
///
/// # Example
///
/// ```rust,no_run
/// use aliddns_core::state::MemoryStateStore;
/// use aliddns_core::{StateStore, SyncResult, TrackedRecord};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///     let record = TrackedRecord::new("1", "example.com", "home", "A");
///
///     store
///         .record_result(&SyncResult::success(&record, None, "1.2.3.4"))
///         .await?;
///
///     let state = store.get_record(&record.key()).await?;
///     assert_eq!(state.unwrap().last_value.as_deref(), Some("1.2.3.4"));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<HashMap<String, RecordState>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Clear all records from the store
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_record(&self, key: &str) -> Result<Option<RecordState>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(key).cloned())
    }

    async fn set_record(&self, key: &str, state: &RecordState) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(key.to_string(), state.clone());
        Ok(())
    }

    async fn delete_record(&self, key: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(key);
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<String>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SyncResult, SyncStatus, TrackedRecord};

    fn home() -> TrackedRecord {
        TrackedRecord::new("1", "example.com", "home", "A")
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStateStore::new();
        assert!(store.is_empty().await);

        let state = store
            .record_result(&SyncResult::success(&home(), None, "1.2.3.4"))
            .await
            .unwrap();
        assert_eq!(state.last_status, SyncStatus::Success);
        assert_eq!(store.len().await, 1);

        let retrieved = store.get_record(&home().key()).await.unwrap().unwrap();
        assert_eq!(retrieved.last_value.as_deref(), Some("1.2.3.4"));

        store.delete_record(&home().key()).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_store_keeps_value_on_error() {
        let store = MemoryStateStore::new();
        store
            .record_result(&SyncResult::success(&home(), None, "1.2.3.4"))
            .await
            .unwrap();
        let state = store
            .record_result(&SyncResult::error(&home(), "Provider error (aliyun): Throttling"))
            .await
            .unwrap();

        assert_eq!(state.last_status, SyncStatus::Error);
        assert_eq!(state.last_value.as_deref(), Some("1.2.3.4"));
    }

    #[tokio::test]
    async fn test_memory_store_list() {
        let store = MemoryStateStore::new();
        let v6 = TrackedRecord::new("2", "example.com", "home", "AAAA");

        store
            .record_result(&SyncResult::success(&home(), None, "1.2.3.4"))
            .await
            .unwrap();
        store
            .record_result(&SyncResult::skipped(&v6, "could not obtain IPv6 address"))
            .await
            .unwrap();

        let mut keys = store.list_records().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["home.example.com/A", "home.example.com/AAAA"]);
    }
}
