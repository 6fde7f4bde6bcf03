//! Published backends, one per kind.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use causeway_plugin::{BackendKind, LoadError, LoadedBackend, WebGpuBackend};
use tracing::warn;

/// The backends available to the bridge, at most one per [`BackendKind`].
///
/// Populated during bridge construction and immutable afterwards, so reads
/// need no locking. A kind whose module failed to load is simply absent;
/// other kinds load independently and dispatch against an absent kind fails
/// without crashing.
#[derive(Default)]
pub struct BackendSet {
    backends: HashMap<BackendKind, Arc<dyn WebGpuBackend>>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an already-constructed backend (tests inject stubs here).
    pub fn insert(&mut self, kind: BackendKind, backend: Arc<dyn WebGpuBackend>) {
        self.backends.insert(kind, backend);
    }

    /// Load and publish `kind`'s shared module from `dir`.
    ///
    /// On failure nothing is published for `kind`; the error is returned so
    /// the embedder can decide whether that kind was required.
    pub fn load_module(&mut self, kind: BackendKind, dir: &Path) -> Result<(), LoadError> {
        match LoadedBackend::load(kind, dir) {
            Ok(backend) => {
                self.backends.insert(kind, Arc::new(backend));
                Ok(())
            }
            Err(err) => {
                warn!(?kind, error = %err, "backend module load failed");
                Err(err)
            }
        }
    }

    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn WebGpuBackend>> {
        self.backends.get(&kind).cloned()
    }

    pub fn contains(&self, kind: BackendKind) -> bool {
        self.backends.contains_key(&kind)
    }
}
