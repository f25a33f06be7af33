//! Lazy per-entity-type history store binding.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;
use tracing::info;

use crate::error::{RewindError, RewindResult};
use crate::traits::{HistoryBackend, HistoryStore};

type Slot = Arc<OnceCell<Arc<dyn HistoryStore>>>;

/// Maps entity types to their history stores.
///
/// Each history store name gets one slot, so collections sharing a model
/// name still get separate stores. The first caller constructs the store
/// through the backend; concurrent callers wait on the same slot
/// instead of constructing a second store. A failed construction leaves the
/// slot empty so a later call can try again.
pub struct HistoryRegistry {
    backend: Arc<dyn HistoryBackend>,
    suffix: String,
    slots: Mutex<HashMap<String, Slot>>,
}

impl HistoryRegistry {
    /// Create a registry over a backend.
    pub fn new(backend: Arc<dyn HistoryBackend>, suffix: impl Into<String>) -> Self {
        Self {
            backend,
            suffix: suffix.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Name of the history store for a collection.
    pub fn store_name(&self, collection_name: &str) -> String {
        format!("{}{}", collection_name, self.suffix)
    }

    /// Get the history store of a collection, constructing it on first use.
    pub async fn get(
        &self,
        model_name: &str,
        collection_name: &str,
    ) -> RewindResult<Arc<dyn HistoryStore>> {
        let store_name = self.store_name(collection_name);
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|e| RewindError::internal(format!("Failed to acquire registry lock: {}", e)))?;
            slots.entry(store_name.clone()).or_default().clone()
        };

        let store = slot
            .get_or_try_init(|| async {
                let store = self.backend.open(&store_name, model_name).await?;
                info!(
                    "Opened history store '{}' for model '{}'",
                    store_name, model_name
                );
                Ok::<_, RewindError>(store)
            })
            .await?;

        Ok(store.clone())
    }

    /// Whether the history store of a collection has been constructed.
    pub fn is_bound(&self, collection_name: &str) -> bool {
        let store_name = self.store_name(collection_name);
        self.slots
            .lock()
            .map(|slots| {
                slots
                    .get(&store_name)
                    .map_or(false, |slot| slot.initialized())
            })
            .unwrap_or(false)
    }

    /// Forget every memoized store, e.g. after reconfiguration.
    ///
    /// Callers that already hold a store keep using it; the next `get`
    /// constructs a fresh one.
    pub fn reset(&self) -> RewindResult<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| RewindError::internal(format!("Failed to acquire registry lock: {}", e)))?;
        slots.clear();
        Ok(())
    }
}
