//! Versioned view over a primary document store.

use std::sync::Arc;

use tracing::info;

use crate::error::RewindResult;
use crate::hooks::{LifecycleHooks, ModelInfo, SaveContext};
use crate::traits::{DocumentStore, HistoryStore};
use crate::types::{Document, SnapshotRecord};

/// Mutation pipeline for one entity type.
///
/// Every save and remove writes its snapshot first and only then touches the
/// primary store, so no mutation reaches the primary store without a
/// matching history record.
pub struct VersionedCollection {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) hooks: Arc<LifecycleHooks>,
    pub(crate) model: ModelInfo,
}

impl VersionedCollection {
    /// Wrap a document store.
    pub fn new(store: Arc<dyn DocumentStore>, hooks: Arc<LifecycleHooks>) -> Self {
        let model = ModelInfo::new(store.model_name(), store.collection_name());
        Self { store, hooks, model }
    }

    /// Entity type served by this collection.
    pub fn model(&self) -> &ModelInfo {
        &self.model
    }

    /// The underlying primary store.
    pub fn document_store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// History store of this entity type.
    pub async fn history_store(&self) -> RewindResult<Arc<dyn HistoryStore>> {
        self.hooks.history_store(&self.model).await
    }

    /// Load a document.
    pub async fn find(&self, id: &str) -> RewindResult<Option<Document>> {
        self.store.find(id).await
    }

    /// Save a document, recording a `create` or `update` snapshot.
    pub async fn save(&self, document: &mut Document) -> RewindResult<SnapshotRecord> {
        self.save_with(document, SaveContext::default()).await
    }

    /// Save a document with explicit save options.
    pub async fn save_with(
        &self,
        document: &mut Document,
        context: SaveContext,
    ) -> RewindResult<SnapshotRecord> {
        let record = self.hooks.before_save(&self.model, document, context).await?;
        self.store.save(document).await?;
        document.mark_persisted();
        Ok(record)
    }

    /// Remove a document, recording a `delete` snapshot.
    ///
    /// History of the document is kept.
    pub async fn remove(&self, document: &Document) -> RewindResult<SnapshotRecord> {
        let record = self.hooks.before_remove(&self.model, document).await?;
        self.store.remove(&document.id).await?;
        Ok(record)
    }

    /// Snapshots of one entity, oldest first.
    pub async fn history(&self, entity_id: &str) -> RewindResult<Vec<SnapshotRecord>> {
        self.history_store().await?.list(entity_id).await
    }

    /// Remove all snapshots of this entity type. Documents are untouched.
    pub async fn clear_history(&self) -> RewindResult<usize> {
        let removed = self.history_store().await?.delete_all().await?;
        info!(
            "Cleared {} snapshots of model '{}'",
            removed, self.model.model_name
        );
        Ok(removed)
    }
}
