use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sf_core::{BuildingKind, PlayerId};
use tracing::debug;

use crate::base::BaseSystem;
use crate::effect::{Effect, EffectSink, StateField};
use crate::error::SimResult;
use crate::system::System;

/// Tuning for [`CreditProductionSystem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditConfig {
    /// Launch-order priority.
    pub priority: i32,
    /// Produce on every `cadence`-th tick.
    pub cadence: u64,
    /// Credits earned per inhabitant per productive tick.
    pub credits_per_pop: f64,
    /// Flat income per trading post per productive tick.
    pub trading_post_income: f64,
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            priority: 20,
            cadence: 1,
            credits_per_pop: 0.01,
            trading_post_income: 25.0,
        }
    }
}

/// Pays every player for the population and trading posts on their planets.
#[derive(Debug)]
pub struct CreditProductionSystem {
    base: BaseSystem,
    config: CreditConfig,
}

impl CreditProductionSystem {
    /// Name under which the system registers.
    pub const NAME: &'static str = "credit_production";

    /// Create the system with the given tuning.
    pub fn new(config: CreditConfig) -> Self {
        Self {
            base: BaseSystem::new(Self::NAME, config.priority).with_cadence(config.cadence),
            config,
        }
    }

    /// Create the system with default tuning.
    pub fn with_default_config() -> Self {
        Self::new(CreditConfig::default())
    }

    /// Income of one planet.
    pub fn planet_income(&self, population: f64, trading_posts: usize) -> f64 {
        population * self.config.credits_per_pop
            + trading_posts as f64 * self.config.trading_post_income
    }
}

impl System for CreditProductionSystem {
    fn base(&self) -> &BaseSystem {
        &self.base
    }

    fn writes(&self) -> &'static [StateField] {
        &[StateField::Credits]
    }

    fn on_tick(&self, tick: u64, sink: &mut EffectSink) -> SimResult<()> {
        if !self.base.due() {
            return Ok(());
        }
        let ctx = self.base.context()?;
        let income = ctx.read(|game| {
            let mut income: BTreeMap<PlayerId, f64> = BTreeMap::new();
            for player in game.players() {
                let total: f64 = game
                    .planets_owned_by(player.id)
                    .iter()
                    .map(|p| {
                        self.planet_income(p.population, p.count_buildings(BuildingKind::TradingPost))
                    })
                    .sum();
                income.insert(player.id, total);
            }
            income
        })?;

        for (player, delta) in income.into_iter().filter(|(_, d)| *d > 0.0) {
            debug!(%player, delta, tick, "credit income");
            sink.push(Effect::AdjustCredits { player, delta })?;
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
    fn pays_population_and_trading_posts() {
        let mut game = GameState::new("t");
        let sol = game.add_star_system(StarSystem::new("Sol", 0.0, 0.0)).unwrap();
        let ada = game.add_player(Player::new("Ada")).unwrap();
        let idle = game.add_player(Player::new("Idle")).unwrap();
        game.add_planet(
            Planet::new("Terra", sol)
                .with_owner(ada)
                .with_population(1_000.0)
                .with_building(BuildingKind::TradingPost),
        )
        .unwrap();
        game.add_planet(Planet::new("Luna", sol).with_owner(ada).with_population(500.0))
            .unwrap();

        let ctx = SystemContext::new(Arc::new(RwLock::new(game)));
        let system = CreditProductionSystem::with_default_config();
        system.init(&ctx).unwrap();

        let mut sink = EffectSink::new(CreditProductionSystem::NAME, system.writes(), 1);
        system.on_tick(1, &mut sink).unwrap();

        assert_eq!(
            sink.effects(),
            &[Effect::AdjustCredits {
                player: ada,
                delta: 1_500.0 * 0.01 + 25.0,
            }]
        );
        assert!(!sink.effects().iter().any(
            |e| matches!(e, Effect::AdjustCredits { player, .. } if *player == idle)
        ));
    }

    #[test]
    fn cadence_skips_off_ticks() {
        let mut game = GameState::new("t");
        let sol = game.add_star_system(StarSystem::new("Sol", 0.0, 0.0)).unwrap();
        let ada = game.add_player(Player::new("Ada")).unwrap();
        game.add_planet(Planet::new("Terra", sol).with_owner(ada).with_population(100.0))
            .unwrap();
        let ctx = SystemContext::new(Arc::new(RwLock::new(game)));
        let system = CreditProductionSystem::new(CreditConfig {
            cadence: 2,
            ..CreditConfig::default()
        });
        system.init(&ctx).unwrap();

        let paid: Vec<usize> = (1..=4)
            .map(|tick| {
                let mut sink = EffectSink::new(CreditProductionSystem::NAME, system.writes(), tick);
                system.on_tick(tick, &mut sink).unwrap();
                sink.effects().len()
            })
            .collect();
        assert_eq!(paid, vec![0, 1, 0, 1]);
    }

    #[test]
    fn uninitialized_system_errors() {
        let system = CreditProductionSystem::with_default_config();
        let mut sink = EffectSink::new(CreditProductionSystem::NAME, system.writes(), 1);
        assert!(system.on_tick(1, &mut sink).is_err());
    }
}
