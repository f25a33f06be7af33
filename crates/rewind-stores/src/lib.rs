//! rewind-stores - History and document store backends for rewind.
//!
//! # Supported Backends
//!
//! - **Memory** (always available) - process-local, re-exported from `rewind-core`
//! - **SQLite** (feature: `sqlite`) - one table per history store, file or `:memory:`

mod factory;

#[cfg(feature = "sqlite")]
mod sqlite;

// Public exports
pub use factory::HistoryBackendFactory;

pub use rewind_core::memory::{InMemoryDocumentStore, InMemoryHistoryBackend, InMemoryHistoryStore};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDocumentStore, SqliteHistoryBackend, SqliteHistoryStore};

// Re-export core traits for convenience
pub use rewind_core::traits::{
    DocumentStore, HistoryBackend, HistoryBackendConfig, HistoryBackendProvider, HistoryStore,
};
