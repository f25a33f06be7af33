//! Lifecycle hooks: snapshot every save and remove before it happens.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::IdType;
use crate::error::RewindResult;
use crate::history::HistoryRegistry;
use crate::projection::Projector;
use crate::traits::HistoryStore;
use crate::types::{Document, SnapshotId, SnapshotRecord};

/// Per-save options threaded from the caller into the save hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveContext {
    /// Snapshot whose payload this save restores.
    pub rollback_of: Option<SnapshotId>,
}

impl SaveContext {
    /// Context for a save issued by a rollback to `snapshot_id`.
    pub fn rollback(snapshot_id: SnapshotId) -> Self {
        Self {
            rollback_of: Some(snapshot_id),
        }
    }
}

/// Entity type a hook runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// Entity type name.
    pub model_name: String,
    /// Primary collection name; the history store name derives from it.
    pub collection_name: String,
}

impl ModelInfo {
    /// Create model info.
    pub fn new(model_name: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            collection_name: collection_name.into(),
        }
    }
}

/// Builds and writes snapshot records for the host mutation pipeline.
///
/// Both hooks return only after the snapshot is stored. The caller must not
/// apply the primary mutation when a hook fails.
pub struct LifecycleHooks {
    registry: Arc<HistoryRegistry>,
    projector: Arc<dyn Projector>,
    id_type: IdType,
}

impl LifecycleHooks {
    /// Create hooks over a registry.
    pub fn new(registry: Arc<HistoryRegistry>, projector: Arc<dyn Projector>, id_type: IdType) -> Self {
        Self {
            registry,
            projector,
            id_type,
        }
    }

    /// History store of an entity type.
    pub async fn history_store(&self, model: &ModelInfo) -> RewindResult<Arc<dyn HistoryStore>> {
        self.registry
            .get(&model.model_name, &model.collection_name)
            .await
    }

    /// Snapshot a document about to be saved.
    ///
    /// A rollback marker in `context` makes this a roll-back snapshot;
    /// otherwise new documents produce `create` and existing ones `update`.
    /// The marker is consumed here and never reaches the document.
    pub async fn before_save(
        &self,
        model: &ModelInfo,
        document: &Document,
        context: SaveContext,
    ) -> RewindResult<SnapshotRecord> {
        self.id_type.validate(&document.id)?;

        let payload = self.projector.project(document);
        let record = match context.rollback_of {
            Some(target) => SnapshotRecord::rolled_back(&document.id, payload, target),
            None if document.is_new() => SnapshotRecord::created(&document.id, payload),
            None => SnapshotRecord::updated(&document.id, payload),
        };

        self.write(model, record).await
    }

    /// Snapshot a document about to be removed. The tombstone has no payload.
    pub async fn before_remove(
        &self,
        model: &ModelInfo,
        document: &Document,
    ) -> RewindResult<SnapshotRecord> {
        self.id_type.validate(&document.id)?;
        self.write(model, SnapshotRecord::deleted(&document.id)).await
    }

    async fn write(&self, model: &ModelInfo, record: SnapshotRecord) -> RewindResult<SnapshotRecord> {
        record.validate()?;

        let store = self.history_store(model).await?;
        if let Err(e) = store.insert(&record).await {
            warn!(
                "Snapshot write for {} '{}' failed, aborting {}: {}",
                model.model_name, record.entity_id, record.action, e
            );
            return Err(e);
        }

        debug!(
            "Recorded {} snapshot {} for {} '{}'",
            record.action, record.id, model.model_name, record.entity_id
        );
        Ok(record)
    }
}
