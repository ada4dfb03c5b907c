use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::context::SystemContext;
use crate::error::{SimError, SimResult};
use crate::sync::SyncCounter;

/// Bookkeeping shared by every concrete system: name, priority, cadence,
/// the enabled flag and the context handed over at initialization.
///
/// All accessors take `&self` and are safe to call from any worker.
#[derive(Debug)]
pub struct BaseSystem {
    name: String,
    priority: i32,
    cadence: u64,
    enabled: AtomicBool,
    context: RwLock<Option<SystemContext>>,
    invocations: SyncCounter,
}

impl BaseSystem {
    /// Create an enabled, uninitialized base that runs every tick.
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            priority,
            cadence: 1,
            enabled: AtomicBool::new(true),
            context: RwLock::new(None),
            invocations: SyncCounter::new(),
        }
    }

    /// Run the system body only on every `cadence`-th invocation (minimum 1).
    pub fn with_cadence(mut self, cadence: u64) -> Self {
        self.cadence = cadence.max(1);
        self
    }

    /// System name; unique within a registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Launch-order priority; lower launches first.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Number of invocations per productive run.
    pub fn cadence(&self) -> u64 {
        self.cadence
    }

    /// Whether the registry should dispatch this system.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Enable or disable dispatch.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Store the context for later ticks, replacing any previous one.
    pub fn attach(&self, ctx: SystemContext) {
        *self
            .context
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(ctx);
    }

    /// Returns `true` once a context has been attached.
    pub fn is_initialized(&self) -> bool {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The attached context.
    pub fn context(&self) -> SimResult<SystemContext> {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| SimError::NotInitialized(self.name.clone()))
    }

    /// Count one invocation and report whether this one should do work.
    pub fn due(&self) -> bool {
        self.invocations.increment() % self.cadence == 0
    }

    /// Restart the cadence count, as at the start of a session.
    pub fn reset(&self) {
        self.invocations.reset();
    }

    /// Invocations counted by [`BaseSystem::due`].
    pub fn invocations(&self) -> u64 {
        self.invocations.get()
    }
}
