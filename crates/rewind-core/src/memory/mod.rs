//! In-memory backends, for tests and embedders without durable storage.

mod documents;
mod history;

pub use documents::InMemoryDocumentStore;
pub use history::{InMemoryHistoryBackend, InMemoryHistoryStore};
