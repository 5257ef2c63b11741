//! In-memory source registry

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::Source;

/// Map from source id to the live source answering that id.
///
/// Logical mutation is serialized by the catalog registry's writer lock; the
/// interior lock only makes cross-thread reads safe.
#[derive(Default)]
pub struct SourceRegistry {
    sources: RwLock<HashMap<i64, Arc<dyn Source>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a source by id.
    pub fn get(&self, id: i64) -> Option<Arc<dyn Source>> {
        self.sources.read().get(&id).cloned()
    }

    /// Register a source. With `overwrite = false` an existing mapping for
    /// the same id wins, so re-registration cannot clobber a live source.
    pub fn register(&self, source: Arc<dyn Source>, overwrite: bool) {
        let mut sources = self.sources.write();
        if !overwrite && sources.contains_key(&source.id()) {
            debug!("source {} already registered, keeping existing", source.id());
            return;
        }
        sources.insert(source.id(), source);
    }

    /// Remove a source's mapping, if present.
    pub fn unregister(&self, source: &dyn Source) {
        self.sources.write().remove(&source.id());
    }

    /// Snapshot of every registered source, in no particular order.
    pub fn all(&self) -> Vec<Arc<dyn Source>> {
        self.sources.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sources.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.read().is_empty()
    }
}
