//! History store traits and related types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::RewindResult;
use crate::types::{SnapshotId, SnapshotRecord};

/// Append-only snapshot log for one entity type.
///
/// Records returned by the query methods are ordered by timestamp, ties
/// broken by insertion order.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append a snapshot record.
    async fn insert(&self, record: &SnapshotRecord) -> RewindResult<()>;

    /// Find a snapshot by id, constrained to one entity.
    async fn find_by_id(
        &self,
        id: SnapshotId,
        entity_id: &str,
    ) -> RewindResult<Option<SnapshotRecord>>;

    /// All snapshots of an entity taken at or before `until`, oldest first.
    async fn find_range(
        &self,
        entity_id: &str,
        until: DateTime<Utc>,
    ) -> RewindResult<Vec<SnapshotRecord>>;

    /// All snapshots of an entity, oldest first.
    async fn list(&self, entity_id: &str) -> RewindResult<Vec<SnapshotRecord>>;

    /// Remove every snapshot in this store. Returns the number removed.
    async fn delete_all(&self) -> RewindResult<usize>;

    /// Count snapshots in this store.
    async fn count(&self) -> RewindResult<usize>;
}

/// Storage engine that constructs history stores.
///
/// `open` performs the engine-side registration for a store (table and index
/// creation); the registry calls it at most once per entity type.
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    /// Construct the history store named `store_name` for entity type `model_name`.
    async fn open(&self, store_name: &str, model_name: &str) -> RewindResult<Arc<dyn HistoryStore>>;
}

/// History backend provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackendProvider {
    /// Process-local, non-durable.
    Memory,
    /// SQLite file (or `:memory:`).
    #[default]
    Sqlite,
}

/// History backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryBackendConfig {
    /// Provider type.
    pub provider: HistoryBackendProvider,
    /// Database path for file-backed providers.
    pub path: PathBuf,
}

impl Default for HistoryBackendConfig {
    fn default() -> Self {
        let rewind_dir = dirs::home_dir()
            .map(|h| h.join(".rewind"))
            .unwrap_or_else(|| PathBuf::from(".rewind"));

        Self {
            provider: HistoryBackendProvider::default(),
            path: rewind_dir.join("history.db"),
        }
    }
}
