//! In-memory history backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{ErrorCode, RewindError, RewindResult};
use crate::traits::{HistoryBackend, HistoryStore};
use crate::types::{SnapshotId, SnapshotRecord};

/// Process-local history store. Records are kept in insertion order.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    records: Mutex<Vec<SnapshotRecord>>,
}

impl InMemoryHistoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RewindResult<std::sync::MutexGuard<'_, Vec<SnapshotRecord>>> {
        self.records
            .lock()
            .map_err(|e| RewindError::internal(format!("Failed to acquire history lock: {}", e)))
    }

    fn ordered(mut records: Vec<SnapshotRecord>) -> Vec<SnapshotRecord> {
        // Stable sort keeps insertion order for equal timestamps.
        records.sort_by_key(|r| r.timestamp);
        records
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn insert(&self, record: &SnapshotRecord) -> RewindResult<()> {
        record.validate()?;

        let mut records = self.lock()?;
        if records.iter().any(|r| r.id == record.id) {
            return Err(RewindError::Storage {
                message: format!("Snapshot '{}' already exists", record.id),
                code: ErrorCode::StoWriteFailed,
                source: None,
            });
        }
        records.push(record.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: SnapshotId,
        entity_id: &str,
    ) -> RewindResult<Option<SnapshotRecord>> {
        let records = self.lock()?;
        Ok(records
            .iter()
            .find(|r| r.id == id && r.entity_id == entity_id)
            .cloned())
    }

    async fn find_range(
        &self,
        entity_id: &str,
        until: DateTime<Utc>,
    ) -> RewindResult<Vec<SnapshotRecord>> {
        let records = self.lock()?;
        Ok(Self::ordered(
            records
                .iter()
                .filter(|r| r.entity_id == entity_id && r.timestamp <= until)
                .cloned()
                .collect(),
        ))
    }

    async fn list(&self, entity_id: &str) -> RewindResult<Vec<SnapshotRecord>> {
        let records = self.lock()?;
        Ok(Self::ordered(
            records
                .iter()
                .filter(|r| r.entity_id == entity_id)
                .cloned()
                .collect(),
        ))
    }

    async fn delete_all(&self) -> RewindResult<usize> {
        let mut records = self.lock()?;
        let count = records.len();
        records.clear();
        Ok(count)
    }

    async fn count(&self) -> RewindResult<usize> {
        Ok(self.lock()?.len())
    }
}

/// Backend handing out [`InMemoryHistoryStore`]s.
///
/// Counts how often each store name was opened.
#[derive(Default)]
pub struct InMemoryHistoryBackend {
    opened: Mutex<HashMap<String, usize>>,
}

impl InMemoryHistoryBackend {
    /// Create a new backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `store_name` has been opened.
    pub fn open_count(&self, store_name: &str) -> usize {
        self.opened
            .lock()
            .map(|opened| opened.get(store_name).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl HistoryBackend for InMemoryHistoryBackend {
    async fn open(&self, store_name: &str, _model_name: &str) -> RewindResult<Arc<dyn HistoryStore>> {
        let mut opened = self
            .opened
            .lock()
            .map_err(|e| RewindError::internal(format!("Failed to acquire backend lock: {}", e)))?;
        *opened.entry(store_name.to_string()).or_insert(0) += 1;

        Ok(Arc::new(InMemoryHistoryStore::new()))
    }
}
