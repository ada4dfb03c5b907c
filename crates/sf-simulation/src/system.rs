use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::base::BaseSystem;
use crate::context::SystemContext;
use crate::effect::{EffectSink, StateField};
use crate::error::SimResult;

/// A simulation subsystem that runs each tick.
///
/// Systems are shared between worker threads, so every method takes `&self`
/// and keeps its own mutable state behind locks. Name, priority, cadence and
/// the enabled flag come from the embedded [`BaseSystem`].
///
/// Ordering contract: in parallel dispatch, priority only fixes the order in
/// which systems are *launched*. A system must not assume another system's
/// effects for the current tick are visible; they are not applied until the
/// tick ends. Effects are applied in priority order, so the post-tick state
/// does not depend on which system finished first. Code that needs true
/// execution order must use sequential dispatch.
pub trait System: Send + Sync + fmt::Debug {
    /// The embedded bookkeeping struct.
    fn base(&self) -> &BaseSystem;

    /// Human-readable name for this system.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// Launch-order priority; lower launches first.
    fn priority(&self) -> i32 {
        self.base().priority()
    }

    /// How many invocations make one productive run.
    fn cadence(&self) -> u64 {
        self.base().cadence()
    }

    /// Whether the registry dispatches this system.
    fn is_enabled(&self) -> bool {
        self.base().is_enabled()
    }

    /// Enable or disable dispatch.
    fn set_enabled(&self, enabled: bool) {
        self.base().set_enabled(enabled);
    }

    /// The state fields this system may write through its [`EffectSink`].
    fn writes(&self) -> &'static [StateField] {
        &[]
    }

    /// Called once per game session (new or restored) with the shared context.
    /// Restarts the cadence count.
    fn init(&self, ctx: &SystemContext) -> SimResult<()> {
        self.base().attach(ctx.clone());
        self.base().reset();
        Ok(())
    }

    /// Called once per dispatched tick.
    fn on_tick(&self, tick: u64, sink: &mut EffectSink) -> SimResult<()>;

    /// Support downcasting to concrete types for typed lookups.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
