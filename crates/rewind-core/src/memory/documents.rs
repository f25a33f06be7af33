//! In-memory document store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{RewindError, RewindResult};
use crate::traits::DocumentStore;
use crate::types::Document;

/// Process-local primary store for one entity type.
pub struct InMemoryDocumentStore {
    model_name: String,
    collection_name: String,
    documents: Mutex<HashMap<String, Document>>,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    pub fn new(model_name: impl Into<String>, collection_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            collection_name: collection_name.into(),
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> RewindResult<std::sync::MutexGuard<'_, HashMap<String, Document>>> {
        self.documents
            .lock()
            .map_err(|e| RewindError::internal(format!("Failed to acquire document lock: {}", e)))
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    async fn find(&self, id: &str) -> RewindResult<Option<Document>> {
        Ok(self
            .lock()?
            .get(id)
            .map(|doc| Document::loaded(doc.id.clone(), doc.fields.clone())))
    }

    async fn save(&self, document: &Document) -> RewindResult<()> {
        self.lock()?.insert(
            document.id.clone(),
            Document::loaded(document.id.clone(), document.fields.clone()),
        );
        Ok(())
    }

    async fn remove(&self, id: &str) -> RewindResult<bool> {
        Ok(self.lock()?.remove(id).is_some())
    }
}
