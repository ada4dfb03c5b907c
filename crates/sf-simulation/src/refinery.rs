use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use sf_core::{BuildingKind, PlanetId, ResourceKind};
use tracing::debug;

use crate::base::BaseSystem;
use crate::effect::{Effect, EffectSink, StateField};
use crate::error::SimResult;
use crate::parallel::{self, DEFAULT_WORKERS};
use crate::system::System;

/// Tuning for [`RefinerySystem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineryConfig {
    /// Launch-order priority.
    pub priority: i32,
    /// Refine on every `cadence`-th tick.
    pub cadence: u64,
    /// Resource consumed.
    pub input: ResourceKind,
    /// Resource produced.
    pub output: ResourceKind,
    /// Input consumed by one refinery run.
    pub input_per_run: f64,
    /// Output produced by one refinery run.
    pub output_per_run: f64,
}

impl Default for RefineryConfig {
    fn default() -> Self {
        Self {
            priority: 40,
            cadence: 1,
            input: ResourceKind::Oil,
            output: ResourceKind::Fuel,
            input_per_run: 10.0,
            output_per_run: 6.0,
        }
    }
}

/// Converts a fixed ratio of one stored resource into another.
///
/// Each refinery performs at most one whole run per productive tick. A
/// refinery without a full batch of input sits idle; there are no partial
/// runs.
#[derive(Debug)]
pub struct RefinerySystem {
    base: BaseSystem,
    config: RefineryConfig,
}

impl RefinerySystem {
    /// Name under which the system registers.
    pub const NAME: &'static str = "refinery";

    /// Create the system with the given tuning.
    pub fn new(config: RefineryConfig) -> Self {
        Self {
            base: BaseSystem::new(Self::NAME, config.priority).with_cadence(config.cadence),
            config,
        }
    }

    /// Create the system with default tuning.
    pub fn with_default_config() -> Self {
        Self::new(RefineryConfig::default())
    }

    /// Whole runs possible with `refineries` buildings and `stock` input.
    pub fn runs(&self, refineries: usize, stock: f64) -> u32 {
        if self.config.input_per_run <= 0.0 {
            return 0;
        }
        let affordable = (stock / self.config.input_per_run).floor().max(0.0);
        (refineries as f64).min(affordable) as u32
    }
}

impl System for RefinerySystem {
    fn base(&self) -> &BaseSystem {
        &self.base
    }

    fn writes(&self) -> &'static [StateField] {
        &[StateField::Stockpile]
    }

    fn on_tick(&self, _tick: u64, sink: &mut EffectSink) -> SimResult<()> {
        if !self.base.due() {
            return Ok(());
        }
        let ctx = self.base.context()?;
        let input = self.config.input;
        let planets: Vec<(PlanetId, usize, f64)> = ctx.read(|game| {
            game.planets()
                .filter(|p| p.owner.is_some())
                .map(|p| {
                    (
                        p.id,
                        p.count_buildings(BuildingKind::Refinery),
                        p.stockpile.get(input),
                    )
                })
                .collect()
        })?;

        let planned = Mutex::new(Vec::new());
        parallel::for_each_where(
            &planets,
            DEFAULT_WORKERS,
            |(_, refineries, _)| *refineries > 0,
            |(planet, refineries, stock)| {
                let runs = self.runs(*refineries, *stock);
                if runs > 0 {
                    planned
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((*planet, runs));
                }
            },
        );
        let mut planned = planned.into_inner().unwrap_or_else(PoisonError::into_inner);
        planned.sort_by_key(|(planet, _)| *planet);

        for (planet, runs) in planned {
            let runs = f64::from(runs);
            debug!(%planet, runs, "refining");
            sink.push(Effect::Withdraw {
                planet,
                resource: self.config.input,
                amount: runs * self.config.input_per_run,
                then: vec![Effect::AdjustStock {
                    planet,
                    resource: self.config.output,
                    delta: runs * self.config.output_per_run,
                }],
            })?;
        }
        Ok(())
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SystemContext;
    use sf_core::{GameState, Planet, Player, StarSystem};
    use std::sync::RwLock;

    #[test]
    fn runs_bounded_by_buildings_and_stock() {
        let system = RefinerySystem::with_default_config();
        assert_eq!(system.runs(2, 100.0), 2);
        assert_eq!(system.runs(3, 25.0), 2);
        assert_eq!(system.runs(1, 9.99), 0);
        assert_eq!(system.runs(0, 100.0), 0);
    }

    #[test]
    fn below_threshold_is_idle() {
        let mut game = GameState::new("t");
        let sol = game.add_star_system(StarSystem::new("Sol", 0.0, 0.0)).unwrap();
        let ada = game.add_player(Player::new("Ada")).unwrap();
        game.add_planet(
            Planet::new("Terra", sol)
                .with_owner(ada)
                .with_building(BuildingKind::Refinery)
                .with_stock(ResourceKind::Oil, 9.0),
        )
        .unwrap();
        let ctx = SystemContext::new(Arc::new(RwLock::new(game)));
        let system = RefinerySystem::with_default_config();
        system.init(&ctx).unwrap();

        let mut sink = EffectSink::new(RefinerySystem::NAME, system.writes(), 1);
        system.on_tick(1, &mut sink).unwrap();
        assert!(sink.effects().is_empty());
    }

    #[test]
    fn converts_whole_runs() {
        let mut game = GameState::new("t");
        let sol = game.add_star_system(StarSystem::new("Sol", 0.0, 0.0)).unwrap();
        let ada = game.add_player(Player::new("Ada")).unwrap();
        let terra = game
            .add_planet(
                Planet::new("Terra", sol)
                    .with_owner(ada)
                    .with_building(BuildingKind::Refinery)
                    .with_building(BuildingKind::Refinery)
                    .with_stock(ResourceKind::Oil, 35.0),
            )
            .unwrap();
        let ctx = SystemContext::new(Arc::new(RwLock::new(game)));
        let system = RefinerySystem::with_default_config();
        system.init(&ctx).unwrap();

        let mut sink = EffectSink::new(RefinerySystem::NAME, system.writes(), 1);
        system.on_tick(1, &mut sink).unwrap();
        assert_eq!(
            sink.effects(),
            &[Effect::Withdraw {
                planet: terra,
                resource: ResourceKind::Oil,
                amount: 20.0,
                then: vec![Effect::AdjustStock {
                    planet: terra,
                    resource: ResourceKind::Fuel,
                    delta: 12.0,
                }],
            }]
        );
    }
}
