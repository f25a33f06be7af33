//! rewind-core - Core library for rewind.
//!
//! Records every create, update, delete and rollback of a persisted entity as
//! an immutable snapshot in a per-entity-type history store, and restores
//! entities to earlier snapshots.
//!
//! # Example
//!
//! ```ignore
//! use rewind_core::{Document, HistoryConfig, Rewind};
//! use rewind_core::memory::{InMemoryDocumentStore, InMemoryHistoryBackend};
//!
//! let rewind = Rewind::new(HistoryConfig::default(), Arc::new(InMemoryHistoryBackend::new()));
//! let users = rewind.collection(Arc::new(InMemoryDocumentStore::new("User", "users")));
//!
//! let mut doc = Document::generate().with_field("name", "Alice");
//! let created = users.save(&mut doc).await?;
//!
//! doc.set("name", "Bob");
//! users.save(&mut doc).await?;
//!
//! // Back to "Alice", recorded as a roll-back snapshot
//! users.rollback_to(&mut doc, created.id).await?;
//! ```

pub mod collection;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod hooks;
pub mod memory;
pub mod projection;
pub mod rollback;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use collection::VersionedCollection;
pub use config::{DumpConfig, HistoryConfig, IdType};
pub use engine::Rewind;
pub use error::{ErrorCode, RewindError, RewindResult};
pub use history::HistoryRegistry;
pub use hooks::{LifecycleHooks, ModelInfo, SaveContext};
pub use projection::{Projection, Projector};
pub use rollback::{merge_payloads, RollbackOutcome};
pub use traits::{
    DocumentStore, HistoryBackend, HistoryBackendConfig, HistoryBackendProvider, HistoryStore,
};
pub use types::{Document, Payload, SnapshotAction, SnapshotId, SnapshotRecord};
