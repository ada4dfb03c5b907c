use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sf_core::{BuildingKind, PlanetId, ResourceKind};

use crate::base::BaseSystem;
use crate::effect::{Effect, EffectSink, StateField};
use crate::error::SimResult;
use crate::parallel::{self, DEFAULT_WORKERS};
use crate::system::System;

/// Tuning for [`ResourceAccumulationSystem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Launch-order priority.
    pub priority: i32,
    /// Extract on every `cadence`-th tick.
    pub cadence: u64,
    /// Units per mine per unit of deposit richness.
    pub yield_per_mine: f64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            priority: 50,
            cadence: 1,
            yield_per_mine: 5.0,
        }
    }
}

/// Moves deposits into stockpiles on owned planets with mines.
#[derive(Debug)]
pub struct ResourceAccumulationSystem {
    base: BaseSystem,
    config: MiningConfig,
}

impl ResourceAccumulationSystem {
    /// Name under which the system registers.
    pub const NAME: &'static str = "resource_accumulation";

    /// Create the system with the given tuning.
    pub fn new(config: MiningConfig) -> Self {
        Self {
            base: BaseSystem::new(Self::NAME, config.priority).with_cadence(config.cadence),
            config,
        }
    }

    /// Create the system with default tuning.
    pub fn with_default_config() -> Self {
        Self::new(MiningConfig::default())
    }
}

impl System for ResourceAccumulationSystem {
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
        let sites: Vec<(PlanetId, usize, Vec<(ResourceKind, f64)>)> = ctx.read(|game| {
            game.planets()
                .filter(|p| p.owner.is_some())
                .map(|p| {
                    let deposits = p.deposits.iter().map(|(k, r)| (*k, *r)).collect();
                    (p.id, p.count_buildings(BuildingKind::Mine), deposits)
                })
                .filter(|(_, mines, _)| *mines > 0)
                .collect()
        })?;

        let yields = parallel::map(&sites, DEFAULT_WORKERS, |(planet, mines, deposits)| {
            deposits
                .iter()
                .filter(|(_, richness)| *richness > 0.0)
                .map(|(resource, richness)| Effect::AdjustStock {
                    planet: *planet,
                    resource: *resource,
                    delta: richness * *mines as f64 * self.config.yield_per_mine,
                })
                .collect::<Vec<_>>()
        });

        for effect in yields.into_iter().flatten() {
            sink.push(effect)?;
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
    fn mines_extract_deposits() {
        let mut game = GameState::new("t");
        let sol = game.add_star_system(StarSystem::new("Sol", 0.0, 0.0)).unwrap();
        let ada = game.add_player(Player::new("Ada")).unwrap();
        let terra = game
            .add_planet(
                Planet::new("Terra", sol)
                    .with_owner(ada)
                    .with_building(BuildingKind::Mine)
                    .with_building(BuildingKind::Mine)
                    .with_deposit(ResourceKind::Ore, 1.5)
                    .with_deposit(ResourceKind::Water, 0.0),
            )
            .unwrap();
        game.add_planet(
            Planet::new("Barren", sol)
                .with_owner(ada)
                .with_deposit(ResourceKind::Ore, 3.0),
        )
        .unwrap();

        let ctx = SystemContext::new(Arc::new(RwLock::new(game)));
        let system = ResourceAccumulationSystem::with_default_config();
        system.init(&ctx).unwrap();
        let mut sink = EffectSink::new(ResourceAccumulationSystem::NAME, system.writes(), 1);
        system.on_tick(1, &mut sink).unwrap();

        assert_eq!(
            sink.effects(),
            &[Effect::AdjustStock {
                planet: terra,
                resource: ResourceKind::Ore,
                delta: 15.0,
            }]
        );
    }
}
