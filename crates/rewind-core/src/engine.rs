//! Entry point tying configuration, backend and hooks together.

use std::sync::Arc;

use crate::collection::VersionedCollection;
use crate::config::HistoryConfig;
use crate::error::RewindResult;
use crate::history::HistoryRegistry;
use crate::hooks::LifecycleHooks;
use crate::projection::Projector;
use crate::traits::{DocumentStore, HistoryBackend};

/// Versioning engine.
///
/// Owns one history registry; every collection obtained from the same
/// instance shares it. Independently configured instances do not share
/// anything and can coexist in one process.
pub struct Rewind {
    config: HistoryConfig,
    registry: Arc<HistoryRegistry>,
    hooks: Arc<LifecycleHooks>,
}

impl Rewind {
    /// Create an engine with the projection described by `config`.
    pub fn new(config: HistoryConfig, backend: Arc<dyn HistoryBackend>) -> Self {
        let projector: Arc<dyn Projector> = Arc::new(config.projection());
        Self::with_projector(config, backend, projector)
    }

    /// Create an engine with a custom projector.
    pub fn with_projector(
        config: HistoryConfig,
        backend: Arc<dyn HistoryBackend>,
        projector: Arc<dyn Projector>,
    ) -> Self {
        let config = config.normalized();
        let registry = Arc::new(HistoryRegistry::new(backend, config.suffix.clone()));
        let hooks = Arc::new(LifecycleHooks::new(
            registry.clone(),
            projector,
            config.id_type,
        ));

        Self {
            config,
            registry,
            hooks,
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// History store registry.
    pub fn registry(&self) -> &Arc<HistoryRegistry> {
        &self.registry
    }

    /// Lifecycle hooks, for hosts that drive their own save pipeline.
    pub fn hooks(&self) -> &Arc<LifecycleHooks> {
        &self.hooks
    }

    /// Versioned view over a document store.
    pub fn collection(&self, store: Arc<dyn DocumentStore>) -> VersionedCollection {
        VersionedCollection::new(store, self.hooks.clone())
    }

    /// Drop memoized history stores so they are reopened on next use.
    pub fn reset(&self) -> RewindResult<()> {
        self.registry.reset()
    }
}
