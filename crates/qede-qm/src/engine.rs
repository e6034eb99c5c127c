//! Engine-scoped coordination.

use std::sync::{Arc, Mutex, PoisonError};

/// State shared by every function on one physical engine.
///
/// Stop and release commands of sibling functions must not interleave, so
/// each one is sent while holding `qm_lock`. Build one context per engine
/// and hand an `Arc` of it to each function.
#[derive(Debug, Default)]
pub struct EngineContext {
    engine_id: u8,
    qm_lock: Mutex<()>,
}

impl EngineContext {
    /// Creates the context of an engine.
    pub fn new(engine_id: u8) -> Arc<Self> {
        Arc::new(Self {
            engine_id,
            qm_lock: Mutex::new(()),
        })
    }

    /// Returns the engine id.
    pub fn engine_id(&self) -> u8 {
        self.engine_id
    }

    /// Runs `f` with the engine QM lock held.
    ///
    /// The guarded state is `()`, so a lock poisoned by a panicking sibling
    /// is taken over instead of propagating the panic.
    pub fn with_qm_lock<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self
            .qm_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f()
    }
}
