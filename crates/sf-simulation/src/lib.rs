//! Tick-driven concurrent simulation scheduler for Starforge.
//!
//! A [`Registry`] holds every [`System`], sorted by priority. Each tick the
//! enabled systems run concurrently against a read-only [`SystemContext`];
//! they never write the game state directly but push [`Effect`]s that the
//! [`Simulation`] host applies under one write lock once all of them have
//! returned. Production systems (credits, population, refinery, mining),
//! per-location construction queues and ship movement are provided.

/// Shared bookkeeping embedded in every system.
pub mod base;
/// Monotonic tick counter.
pub mod clock;
/// Configuration types for simulation runs.
pub mod config;
/// Per-location construction queues.
pub mod construction;
/// Read handle handed to systems at initialization.
pub mod context;
/// Credit production.
pub mod credits;
/// Deferred writes and field ownership.
pub mod effect;
/// Error types for the simulation crate.
pub mod error;
/// Simulation event types and the event log.
pub mod event;
/// Resource accumulation from planetary deposits.
pub mod mining;
/// Ship travel.
pub mod movement;
/// Bounded fan-out helpers.
pub mod parallel;
/// Population growth.
pub mod population;
/// Refinery conversion.
pub mod refinery;
/// System registry and tick dispatch.
pub mod registry;
/// Top-level simulation host.
pub mod simulation;
/// Thread-safe counter and map.
pub mod sync;
/// The trait that all simulation systems implement.
pub mod system;

/// Re-export of [`base::BaseSystem`].
pub use base::BaseSystem;
/// Re-export of [`clock::SimClock`].
pub use clock::SimClock;
/// Re-export of [`config::SimConfig`].
pub use config::SimConfig;
/// Re-exports of the construction queue types.
pub use construction::{
    CompletionHandler, ConstructionCompletion, ConstructionConfig, ConstructionItem,
    ConstructionKind, ConstructionSystem,
};
/// Re-exports of [`context::SystemContext`] and [`context::SharedGame`].
pub use context::{SharedGame, SystemContext};
/// Re-exports of the credit production types.
pub use credits::{CreditConfig, CreditProductionSystem};
/// Re-exports of the effect types.
pub use effect::{Effect, EffectSink, StateField};
/// Re-exports of [`error::SimError`] and [`error::SimResult`].
pub use error::{SimError, SimResult};
/// Re-exports of [`event::EventLog`], [`event::SimEvent`], and [`event::SimEventKind`].
pub use event::{EventLog, SimEvent, SimEventKind};
/// Re-exports of the resource accumulation types.
pub use mining::{MiningConfig, ResourceAccumulationSystem};
/// Re-exports of the movement types.
pub use movement::{JourneyPlan, MovementConfig, MovementSystem};
/// Re-exports of the population growth types.
pub use population::{PopulationConfig, PopulationGrowthSystem};
/// Re-exports of the refinery types.
pub use refinery::{RefineryConfig, RefinerySystem};
/// Re-exports of the registry types.
pub use registry::{DispatchMode, Registry, SystemFailure, TickReport};
/// Re-export of [`simulation::Simulation`].
pub use simulation::Simulation;
/// Re-exports of the shared accumulators.
pub use sync::{SyncCounter, SyncMap};
/// Re-export of [`system::System`].
pub use system::System;
