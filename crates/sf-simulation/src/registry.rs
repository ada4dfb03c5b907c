//! The set of registered systems and the per-tick dispatcher.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::context::SystemContext;
use crate::effect::{Effect, EffectSink};
use crate::error::{SimError, SimResult};
use crate::event::{SimEvent, SimEventKind};
use crate::sync::SyncCounter;
use crate::system::System;

/// How [`Registry::dispatch`] runs the enabled systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// All enabled systems start together, launched in priority order.
    #[default]
    Parallel,
    /// One system at a time in priority order; for debugging and replay.
    Sequential,
}

/// A system whose tick failed. Its effects for that tick were discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemFailure {
    /// Name of the failing system.
    pub system: String,
    /// Error text or panic message.
    pub reason: String,
    /// `true` if the system panicked rather than returning an error.
    pub panicked: bool,
}

/// What happened during one dispatch.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// The dispatched tick.
    pub tick: u64,
    /// Systems whose tick succeeded, in priority order.
    pub ran: Vec<String>,
    /// Systems skipped because they were disabled.
    pub skipped: Vec<String>,
    /// Systems whose tick failed.
    pub failures: Vec<SystemFailure>,
    /// Effects from successful systems: priority order, then emission order.
    pub effects: Vec<Effect>,
    /// Events from all systems, including one per failure.
    pub events: Vec<SimEvent>,
    /// Number of effects written to the game state; filled in by the host.
    pub effects_applied: usize,
    /// Withdrawals the host refused because an earlier effect had already
    /// drawn the stock down.
    pub effects_refused: usize,
}

impl TickReport {
    /// Returns `true` if no system failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of one system's tick.
struct SystemRun {
    name: String,
    result: Result<(Vec<Effect>, Vec<SimEvent>), SystemFailure>,
}

/// Holds every registered system, sorted by priority.
///
/// One registry is built by the composition root and handed to whoever
/// drives ticks; nothing about it is global.
#[derive(Debug, Default)]
pub struct Registry {
    systems: RwLock<Vec<Arc<dyn System>>>,
    dispatched: SyncCounter,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn systems(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn System>>> {
        self.systems.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a system and re-sort by priority (stable for equal priorities).
    ///
    /// Refused if the name is taken, or if the system declares a
    /// non-additive field that another registered system already writes.
    pub fn register(&self, system: Arc<dyn System>) -> SimResult<()> {
        let mut systems = self.systems.write().unwrap_or_else(PoisonError::into_inner);
        if systems.iter().any(|s| s.name() == system.name()) {
            return Err(SimError::DuplicateSystem(system.name().to_string()));
        }
        for field in system.writes().iter().filter(|f| !f.is_additive()) {
            if let Some(owner) = systems.iter().find(|s| s.writes().contains(field)) {
                return Err(SimError::OwnershipConflict {
                    field: *field,
                    owner: owner.name().to_string(),
                    claimant: system.name().to_string(),
                });
            }
        }
        debug!(
            system = system.name(),
            priority = system.priority(),
            "registered system"
        );
        systems.push(system);
        systems.sort_by_key(|s| s.priority());
        Ok(())
    }

    /// All systems in priority order.
    pub fn all(&self) -> Vec<Arc<dyn System>> {
        self.systems().clone()
    }

    /// Look a system up by name.
    pub fn find_by_name(&self, name: &str) -> Option<Arc<dyn System>> {
        self.systems().iter().find(|s| s.name() == name).cloned()
    }

    /// Look a system up by concrete type.
    pub fn find<T: System + 'static>(&self) -> Option<Arc<T>> {
        self.systems()
            .iter()
            .find_map(|s| Arc::clone(s).into_any().downcast::<T>().ok())
    }

    /// Enable a system by name. Returns `false` if no such system exists.
    pub fn enable(&self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    /// Disable a system by name. Returns `false` if no such system exists.
    pub fn disable(&self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.find_by_name(name) {
            Some(system) => {
                system.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Number of registered systems.
    pub fn count(&self) -> usize {
        self.systems().len()
    }

    /// Number of enabled systems.
    pub fn enabled_count(&self) -> usize {
        self.systems().iter().filter(|s| s.is_enabled()).count()
    }

    /// Total dispatches performed by this registry.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatched.get()
    }

    /// Remove every system.
    pub fn clear(&self) {
        self.systems
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Hand `ctx` to every system's initializer, in priority order.
    pub fn initialize_all(&self, ctx: &SystemContext) -> SimResult<()> {
        for system in self.all() {
            system.init(ctx)?;
            debug!(system = system.name(), "initialized system");
        }
        Ok(())
    }

    /// Dispatch `tick` using the given mode.
    pub fn dispatch(&self, tick: u64, mode: DispatchMode) -> TickReport {
        match mode {
            DispatchMode::Parallel => self.dispatch_tick(tick),
            DispatchMode::Sequential => self.dispatch_tick_sequential(tick),
        }
    }

    /// Run every enabled system concurrently and wait for all of them.
    ///
    /// Systems are launched in priority order but may finish in any order.
    /// A system that errors or panics is logged and reported; the others
    /// still complete. Returns only after every launched system returned.
    pub fn dispatch_tick(&self, tick: u64) -> TickReport {
        let (enabled, skipped) = self.partition_enabled();
        let slots: Vec<OnceLock<SystemRun>> = enabled.iter().map(|_| OnceLock::new()).collect();

        rayon::scope_fifo(|scope| {
            for (system, slot) in enabled.iter().zip(&slots) {
                scope.spawn_fifo(move |_| {
                    let _ = slot.set(run_isolated(system.as_ref(), tick));
                });
            }
        });

        let runs = slots
            .into_iter()
            .zip(&enabled)
            .map(|(slot, system)| {
                slot.into_inner().unwrap_or_else(|| SystemRun {
                    name: system.name().to_string(),
                    result: Err(SystemFailure {
                        system: system.name().to_string(),
                        reason: "system produced no result".into(),
                        panicked: false,
                    }),
                })
            })
            .collect();
        self.collect_report(tick, runs, skipped)
    }

    /// Run every enabled system one at a time in priority order.
    pub fn dispatch_tick_sequential(&self, tick: u64) -> TickReport {
        let (enabled, skipped) = self.partition_enabled();
        let runs = enabled
            .iter()
            .map(|system| run_isolated(system.as_ref(), tick))
            .collect();
        self.collect_report(tick, runs, skipped)
    }

    fn partition_enabled(&self) -> (Vec<Arc<dyn System>>, Vec<String>) {
        let (enabled, disabled): (Vec<_>, Vec<_>) =
            self.all().into_iter().partition(|s| s.is_enabled());
        let skipped = disabled.iter().map(|s| s.name().to_string()).collect();
        (enabled, skipped)
    }

    fn collect_report(&self, tick: u64, runs: Vec<SystemRun>, skipped: Vec<String>) -> TickReport {
        self.dispatched.increment();
        let mut report = TickReport {
            tick,
            skipped,
            ..TickReport::default()
        };
        for run in runs {
            match run.result {
                Ok((effects, events)) => {
                    report.ran.push(run.name);
                    report.effects.extend(effects);
                    report.events.extend(events);
                }
                Err(failure) => {
                    report.events.push(SimEvent::new(
                        tick,
                        SimEventKind::SystemFailed {
                            system: failure.system.clone(),
                            reason: failure.reason.clone(),
                        },
                        format!("system '{}' failed: {}", failure.system, failure.reason),
                    ));
                    report.failures.push(failure);
                }
            }
        }
        report
    }
}

/// Tick one system inside a recovery boundary.
fn run_isolated(system: &dyn System, tick: u64) -> SystemRun {
    let name = system.name().to_string();
    let mut sink = EffectSink::new(name.clone(), system.writes(), tick);
    debug!(system = %name, tick, "dispatching");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| system.on_tick(tick, &mut sink)));
    let result = match outcome {
        Ok(Ok(())) => Ok(sink.into_parts()),
        Ok(Err(e)) => {
            warn!(system = %name, tick, error = %e, "system tick failed");
            Err(SystemFailure {
                system: name.clone(),
                reason: e.to_string(),
                panicked: false,
            })
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!(system = %name, tick, reason = %reason, "system panicked");
            Err(SystemFailure {
                system: name.clone(),
                reason,
                panicked: true,
            })
        }
    };
    SystemRun { name, result }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::BaseSystem;
    use crate::effect::StateField;
    use proptest::prelude::*;
    use sf_core::PlayerId;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    /// Records its own name into a shared journal on every tick.
    #[derive(Debug)]
    struct Probe {
        base: BaseSystem,
        journal: Arc<Mutex<Vec<String>>>,
        calls: AtomicUsize,
        delay: Duration,
        writes: &'static [StateField],
    }

    impl Probe {
        fn new(name: &str, priority: i32, journal: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                base: BaseSystem::new(name, priority),
                journal: Arc::clone(journal),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                writes: &[],
            }
        }
    }

    impl System for Probe {
        fn base(&self) -> &BaseSystem {
            &self.base
        }
        fn writes(&self) -> &'static [StateField] {
            self.writes
        }
        fn on_tick(&self, _tick: u64, _sink: &mut EffectSink) -> SimResult<()> {
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.journal.lock().unwrap().push(self.name().to_string());
            Ok(())
        }
        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[derive(Debug)]
    struct Exploder {
        base: BaseSystem,
    }

    impl System for Exploder {
        fn base(&self) -> &BaseSystem {
            &self.base
        }
        fn on_tick(&self, _tick: u64, _sink: &mut EffectSink) -> SimResult<()> {
            panic!("reactor breach");
        }
        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    /// Emits one credit effect, then fails.
    #[derive(Debug)]
    struct HalfDone {
        base: BaseSystem,
    }

    impl System for HalfDone {
        fn base(&self) -> &BaseSystem {
            &self.base
        }
        fn writes(&self) -> &'static [StateField] {
            &[StateField::Credits]
        }
        fn on_tick(&self, _tick: u64, sink: &mut EffectSink) -> SimResult<()> {
            sink.push(Effect::AdjustCredits {
                player: PlayerId::new(),
                delta: 1.0,
            })?;
            Err(SimError::SystemError("ledger closed".into()))
        }
        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn journal() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[test]
    fn register_sorts_by_priority_stably() {
        let j = journal();
        let registry = Registry::new();
        registry.register(Arc::new(Probe::new("c", 30, &j))).unwrap();
        registry.register(Arc::new(Probe::new("a", 10, &j))).unwrap();
        registry.register(Arc::new(Probe::new("b1", 20, &j))).unwrap();
        registry.register(Arc::new(Probe::new("b2", 20, &j))).unwrap();
        let names: Vec<String> = registry.all().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b1", "b2", "c"]);
    }

    #[test]
    fn duplicate_names_rejected() {
        let j = journal();
        let registry = Registry::new();
        registry.register(Arc::new(Probe::new("a", 1, &j))).unwrap();
        let err = registry.register(Arc::new(Probe::new("a", 2, &j))).unwrap_err();
        assert!(matches!(err, SimError::DuplicateSystem(_)));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn exclusive_fields_have_one_owner() {
        let j = journal();
        let registry = Registry::new();
        let mut first = Probe::new("growth", 1, &j);
        first.writes = &[StateField::Population];
        let mut second = Probe::new("plague", 2, &j);
        second.writes = &[StateField::Population];
        registry.register(Arc::new(first)).unwrap();
        let err = registry.register(Arc::new(second)).unwrap_err();
        assert!(matches!(
            err,
            SimError::OwnershipConflict {
                field: StateField::Population,
                ..
            }
        ));
    }

    #[test]
    fn additive_fields_can_be_shared() {
        let j = journal();
        let registry = Registry::new();
        let mut mine = Probe::new("mine", 1, &j);
        mine.writes = &[StateField::Stockpile];
        let mut refinery = Probe::new("refinery", 2, &j);
        refinery.writes = &[StateField::Stockpile];
        registry.register(Arc::new(mine)).unwrap();
        registry.register(Arc::new(refinery)).unwrap();
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn find_by_name_and_type() {
        let j = journal();
        let registry = Registry::new();
        registry.register(Arc::new(Probe::new("probe", 1, &j))).unwrap();
        assert!(registry.find_by_name("probe").is_some());
        assert!(registry.find_by_name("missing").is_none());
        let probe = registry.find::<Probe>().unwrap();
        assert_eq!(probe.name(), "probe");
        assert!(registry.find::<Exploder>().is_none());
    }

    #[test]
    fn sequential_dispatch_follows_priority() {
        let j = journal();
        let registry = Registry::new();
        registry.register(Arc::new(Probe::new("late", 50, &j))).unwrap();
        registry.register(Arc::new(Probe::new("early", -5, &j))).unwrap();
        registry.register(Arc::new(Probe::new("middle", 7, &j))).unwrap();
        registry.dispatch_tick_sequential(1);
        assert_eq!(*j.lock().unwrap(), vec!["early", "middle", "late"]);
    }

    #[test]
    fn parallel_dispatch_waits_for_slow_systems() {
        let j = journal();
        let registry = Registry::new();
        let mut slow = Probe::new("slow", 1, &j);
        slow.delay = Duration::from_millis(50);
        registry.register(Arc::new(slow)).unwrap();
        registry.register(Arc::new(Probe::new("fast", 2, &j))).unwrap();

        let report = registry.dispatch_tick(1);

        let seen = j.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&"slow".to_string()));
        assert_eq!(report.ran, vec!["slow", "fast"]);
    }

    #[test]
    fn disabled_systems_are_skipped_until_reenabled() {
        let j = journal();
        let registry = Registry::new();
        let probe = Arc::new(Probe::new("probe", 1, &j));
        registry.register(Arc::clone(&probe) as Arc<dyn System>).unwrap();

        assert!(registry.disable("probe"));
        assert_eq!(registry.enabled_count(), 0);
        let report = registry.dispatch_tick(1);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
        assert_eq!(report.skipped, vec!["probe"]);

        assert!(registry.enable("probe"));
        registry.dispatch_tick(2);
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_names_report_false() {
        let registry = Registry::new();
        assert!(!registry.enable("ghost"));
        assert!(!registry.disable("ghost"));
    }

    #[test]
    fn panicking_system_does_not_abort_tick() {
        let j = journal();
        let registry = Registry::new();
        registry
            .register(Arc::new(Exploder {
                base: BaseSystem::new("exploder", 1),
            }))
            .unwrap();
        registry.register(Arc::new(Probe::new("survivor", 2, &j))).unwrap();

        for report in [registry.dispatch_tick(1), registry.dispatch_tick_sequential(2)] {
            assert_eq!(report.ran, vec!["survivor"]);
            assert_eq!(report.failures.len(), 1);
            assert!(report.failures[0].panicked);
            assert_eq!(report.failures[0].reason, "reactor breach");
            assert!(report.events.iter().any(|e| matches!(
                &e.kind,
                SimEventKind::SystemFailed { system, .. } if system == "exploder"
            )));
        }
        assert_eq!(j.lock().unwrap().len(), 2);
    }

    #[test]
    fn failed_system_effects_are_discarded() {
        let registry = Registry::new();
        registry
            .register(Arc::new(HalfDone {
                base: BaseSystem::new("half", 1),
            }))
            .unwrap();
        let report = registry.dispatch_tick(1);
        assert!(report.effects.is_empty());
        assert!(!report.is_clean());
        assert!(!report.failures[0].panicked);
    }

    #[test]
    fn initialize_all_attaches_context() {
        let j = journal();
        let registry = Registry::new();
        let probe = Arc::new(Probe::new("probe", 1, &j));
        registry.register(Arc::clone(&probe) as Arc<dyn System>).unwrap();
        let ctx = SystemContext::new(Arc::new(RwLock::new(sf_core::GameState::new("t"))));
        registry.initialize_all(&ctx).unwrap();
        assert!(probe.base().is_initialized());
    }

    #[test]
    fn clear_empties_registry() {
        let j = journal();
        let registry = Registry::new();
        registry.register(Arc::new(Probe::new("a", 1, &j))).unwrap();
        registry.clear();
        assert_eq!(registry.count(), 0);
        assert_eq!(registry.dispatch_tick(1).ran.len(), 0);
        assert_eq!(registry.dispatch_count(), 1);
    }

    #[test]
    fn dispatch_mode_selects_path() {
        let j = journal();
        let registry = Registry::new();
        registry.register(Arc::new(Probe::new("a", 1, &j))).unwrap();
        assert_eq!(registry.dispatch(3, DispatchMode::Sequential).tick, 3);
        assert_eq!(registry.dispatch(4, DispatchMode::Parallel).ran, vec!["a"]);
        assert_eq!(j.lock().unwrap().len(), 2);
    }

    proptest! {
        #[test]
        fn sequential_order_is_non_decreasing(priorities in prop::collection::vec(-100i32..100, 1..12)) {
            let j = journal();
            let registry = Registry::new();
            for (i, p) in priorities.iter().enumerate() {
                registry.register(Arc::new(Probe::new(&format!("s{i}"), *p, &j))).unwrap();
            }
            registry.dispatch_tick_sequential(1);
            let order: Vec<i32> = j
                .lock()
                .unwrap()
                .iter()
                .map(|name| registry.find_by_name(name).unwrap().priority())
                .collect();
            prop_assert_eq!(order.len(), priorities.len());
            prop_assert!(order.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
