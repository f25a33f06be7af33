//! Factory for creating history backends.

use std::sync::Arc;

use rewind_core::error::{RewindError, RewindResult};
use rewind_core::memory::InMemoryHistoryBackend;
use rewind_core::traits::{HistoryBackend, HistoryBackendConfig, HistoryBackendProvider};
use tracing::info;

/// Factory for creating history backends.
pub struct HistoryBackendFactory;

impl HistoryBackendFactory {
    /// Create a history backend from the given configuration.
    pub fn create(config: &HistoryBackendConfig) -> RewindResult<Arc<dyn HistoryBackend>> {
        let provider = config.provider;
        match provider {
            HistoryBackendProvider::Memory => {
                info!("Using in-memory history backend");
                Ok(Arc::new(InMemoryHistoryBackend::new()))
            }

            #[cfg(feature = "sqlite")]
            HistoryBackendProvider::Sqlite => {
                let backend = crate::sqlite::SqliteHistoryBackend::new(&config.path)?;
                info!("Using SQLite history backend at {}", config.path.display());
                Ok(Arc::new(backend))
            }

            #[allow(unreachable_patterns)]
            _ => Err(RewindError::Configuration(format!(
                "History backend {:?} is not enabled in this build",
                provider
            ))),
        }
    }

    /// Create a non-durable in-memory backend.
    pub fn memory() -> Arc<dyn HistoryBackend> {
        Arc::new(InMemoryHistoryBackend::new())
    }

    /// Create a SQLite backend at `path`.
    #[cfg(feature = "sqlite")]
    pub fn sqlite(path: impl AsRef<std::path::Path>) -> RewindResult<Arc<dyn HistoryBackend>> {
        Ok(Arc::new(crate::sqlite::SqliteHistoryBackend::new(path)?))
    }
}
