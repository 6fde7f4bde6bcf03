//! Per-instance bridge contexts and their concurrent registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use causeway_plugin::{BackendKind, BackendSession, WebGpuBackend};
use causeway_types::WebGpuStatus;
use tracing::debug;

use crate::error::BridgeError;

/// Identity of one guest instance (pointer identity supplied by the
/// embedding runtime; the bridge only compares it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn to_raw(self) -> u64 {
        self.0
    }
}

/// Per-guest-instance bridge state: the selected backend and the backend's
/// private session for this instance.
pub struct BridgeContext {
    kind: BackendKind,
    backend: Arc<dyn WebGpuBackend>,
    session: BackendSession,
}

impl std::fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeContext")
            .field("kind", &self.kind)
            .field("session", &self.session)
            .finish()
    }
}

impl BridgeContext {
    pub fn new(kind: BackendKind, backend: Arc<dyn WebGpuBackend>, session: BackendSession) -> Self {
        Self {
            kind,
            backend,
            session,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn backend(&self) -> &dyn WebGpuBackend {
        self.backend.as_ref()
    }

    pub fn session(&self) -> BackendSession {
        self.session
    }
}

/// Concurrent map from guest instance to its [`BridgeContext`].
///
/// Contexts are created lazily on first use and removed exactly once at
/// instance teardown. Insertion is exclusive: the context (including the
/// backend `initialize` call) is created under the map lock, so a first-use
/// race resolves to exactly one surviving context and one backend session.
/// Operations already holding an `Arc` to a context are unaffected by a
/// concurrent removal; the backend serializes its own object mutation.
#[derive(Default)]
pub struct InstanceRegistry {
    contexts: Mutex<HashMap<InstanceId, Arc<BridgeContext>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, instance: InstanceId) -> Option<Arc<BridgeContext>> {
        self.contexts.lock().unwrap().get(&instance).cloned()
    }

    /// Return the instance's context, creating it with `init` on first use.
    pub fn get_or_create(
        &self,
        instance: InstanceId,
        init: impl FnOnce() -> Result<BridgeContext, BridgeError>,
    ) -> Result<Arc<BridgeContext>, BridgeError> {
        let mut contexts = self.contexts.lock().unwrap();
        if let Some(existing) = contexts.get(&instance) {
            return Ok(Arc::clone(existing));
        }
        // Creation failure inserts nothing; the instance can retry.
        let context = Arc::new(init()?);
        contexts.insert(instance, Arc::clone(&context));
        Ok(context)
    }

    /// Tear down one instance's context, releasing its backend session.
    ///
    /// Returns the backend's deinitialize status, or `None` if the instance
    /// never created a context (no backend call is fabricated for unused
    /// instances).
    pub fn destroy(&self, instance: InstanceId) -> Option<WebGpuStatus> {
        let context = self.contexts.lock().unwrap().remove(&instance)?;
        Some(deinitialize(&context))
    }

    /// Tear down every context. Order across entries is unspecified; each
    /// entry's backend deinitialize runs exactly once.
    pub fn destroy_all(&self) {
        let drained: Vec<_> = {
            let mut contexts = self.contexts.lock().unwrap();
            contexts.drain().collect()
        };
        for (_, context) in drained {
            deinitialize(&context);
        }
    }

    pub fn len(&self) -> usize {
        self.contexts.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn deinitialize(context: &BridgeContext) -> WebGpuStatus {
    let status = context.backend.deinitialize(context.session);
    if !status.is_success() {
        debug!(kind = ?context.kind, ?status, "backend deinitialize reported failure");
    }
    status
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use causeway_plugin::StubWebGpuBackend;

    use super::*;

    fn stub_context(backend: &Arc<StubWebGpuBackend>) -> Result<BridgeContext, BridgeError> {
        let session = backend.initialize().map_err(BridgeError::Backend)?;
        let backend: Arc<dyn WebGpuBackend> = Arc::clone(backend) as Arc<dyn WebGpuBackend>;
        Ok(BridgeContext::new(BackendKind::WgpuNative, backend, session))
    }

    #[test]
    fn distinct_instances_get_distinct_contexts() {
        let backend = Arc::new(StubWebGpuBackend::new());
        let registry = InstanceRegistry::new();

        let a = registry
            .get_or_create(InstanceId::from_raw(1), || stub_context(&backend))
            .unwrap();
        let b = registry
            .get_or_create(InstanceId::from_raw(2), || stub_context(&backend))
            .unwrap();

        assert_ne!(a.session(), b.session());
        assert_eq!(backend.init_calls(), 2);
    }

    #[test]
    fn concurrent_first_use_converges_to_one_context() {
        let backend = Arc::new(StubWebGpuBackend::new());
        let registry = Arc::new(InstanceRegistry::new());
        let instance = InstanceId::from_raw(7);
        let created = Arc::new(AtomicUsize::new(0));

        thread::scope(|scope| {
            for _ in 0..8 {
                let backend = Arc::clone(&backend);
                let registry = Arc::clone(&registry);
                let created = Arc::clone(&created);
                scope.spawn(move || {
                    let context = registry
                        .get_or_create(instance, || {
                            created.fetch_add(1, Ordering::Relaxed);
                            stub_context(&backend)
                        })
                        .unwrap();
                    assert_eq!(context.kind(), BackendKind::WgpuNative);
                });
            }
        });

        assert_eq!(created.load(Ordering::Relaxed), 1);
        assert_eq!(backend.init_calls(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn destroy_deinitializes_exactly_once() {
        let backend = Arc::new(StubWebGpuBackend::new());
        let registry = InstanceRegistry::new();
        let instance = InstanceId::from_raw(3);

        registry
            .get_or_create(instance, || stub_context(&backend))
            .unwrap();
        assert_eq!(registry.destroy(instance), Some(WebGpuStatus::Success));
        assert_eq!(registry.destroy(instance), None);
        assert_eq!(backend.deinit_calls(), 1);
    }

    #[test]
    fn destroying_an_unused_instance_makes_no_backend_calls() {
        let backend = Arc::new(StubWebGpuBackend::new());
        let registry = InstanceRegistry::new();

        assert_eq!(registry.destroy(InstanceId::from_raw(9)), None);
        assert_eq!(backend.init_calls(), 0);
        assert_eq!(backend.deinit_calls(), 0);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn destroy_all_covers_every_context_once() {
        let backend = Arc::new(StubWebGpuBackend::new());
        let registry = InstanceRegistry::new();
        for raw in 1..=4 {
            registry
                .get_or_create(InstanceId::from_raw(raw), || stub_context(&backend))
                .unwrap();
        }

        registry.destroy_all();
        assert!(registry.is_empty());
        assert_eq!(backend.deinit_calls(), 4);

        registry.destroy_all();
        assert_eq!(backend.deinit_calls(), 4);
    }

    #[test]
    fn failed_creation_inserts_nothing_and_can_retry() {
        let backend = Arc::new(StubWebGpuBackend::new());
        let registry = InstanceRegistry::new();
        let instance = InstanceId::from_raw(5);

        let err = registry
            .get_or_create(instance, || Err(BridgeError::OutOfMemory))
            .unwrap_err();
        assert_eq!(err.status(), WebGpuStatus::OutOfMemory);
        assert!(registry.is_empty());

        registry
            .get_or_create(instance, || stub_context(&backend))
            .unwrap();
        assert_eq!(registry.len(), 1);
    }
}
