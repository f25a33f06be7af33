//! Primary document store trait.

use async_trait::async_trait;

use crate::error::RewindResult;
use crate::types::Document;

/// The primary store whose documents are versioned.
///
/// Implementations persist whole documents; the versioning layer calls
/// `save` and `remove` only after the matching snapshot has been written.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Entity type name.
    fn model_name(&self) -> &str;

    /// Name of the collection (or table) holding the documents.
    fn collection_name(&self) -> &str;

    /// Load a document by id.
    async fn find(&self, id: &str) -> RewindResult<Option<Document>>;

    /// Insert or replace a document.
    async fn save(&self, document: &Document) -> RewindResult<()>;

    /// Remove a document. Returns whether it existed.
    async fn remove(&self, id: &str) -> RewindResult<bool>;
}
