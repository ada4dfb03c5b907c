use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sf_core::PlanetId;
use tracing::info;

use crate::base::BaseSystem;
use crate::effect::{Effect, EffectSink, StateField};
use crate::error::SimResult;
use crate::event::SimEventKind;
use crate::parallel::{self, DEFAULT_WORKERS};
use crate::system::System;

/// Tuning for [`PopulationGrowthSystem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Launch-order priority.
    pub priority: i32,
    /// Grow on every `cadence`-th tick.
    pub cadence: u64,
    /// Logistic growth rate per productive tick.
    pub growth_rate: f64,
    /// Fraction lost per productive tick on a planet with no capacity.
    pub decay_rate: f64,
    /// Natural capacity of a fully habitable planet.
    pub capacity_per_habitability: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            priority: 30,
            cadence: 5,
            growth_rate: 0.05,
            decay_rate: 0.1,
            capacity_per_habitability: 1_000.0,
        }
    }
}

/// Grows the population of owned planets toward their capacity.
#[derive(Debug)]
pub struct PopulationGrowthSystem {
    base: BaseSystem,
    config: PopulationConfig,
}

impl PopulationGrowthSystem {
    /// Name under which the system registers.
    pub const NAME: &'static str = "population_growth";

    /// Create the system with the given tuning.
    pub fn new(config: PopulationConfig) -> Self {
        Self {
            base: BaseSystem::new(Self::NAME, config.priority).with_cadence(config.cadence),
            config,
        }
    }

    /// Create the system with default tuning.
    pub fn with_default_config() -> Self {
        Self::new(PopulationConfig::default())
    }

    /// Capacity from habitability plus building housing.
    pub fn capacity(&self, habitability: f64, building_capacity: f64) -> f64 {
        habitability * self.config.capacity_per_habitability + building_capacity
    }

    /// Population after one productive tick.
    ///
    /// With no capacity the population decays and drops to zero once it
    /// falls below one. At or above capacity it stays put. Otherwise it
    /// grows logistically, never past capacity.
    pub fn next_population(&self, population: f64, capacity: f64) -> f64 {
        if capacity <= 0.0 {
            let decayed = population * (1.0 - self.config.decay_rate);
            return if decayed < 1.0 { 0.0 } else { decayed };
        }
        if population >= capacity {
            return population;
        }
        let growth = self.config.growth_rate * population * (1.0 - population / capacity);
        (population + growth).min(capacity)
    }
}

impl System for PopulationGrowthSystem {
    fn base(&self) -> &BaseSystem {
        &self.base
    }

    fn writes(&self) -> &'static [StateField] {
        &[StateField::Population]
    }

    fn on_tick(&self, _tick: u64, sink: &mut EffectSink) -> SimResult<()> {
        if !self.base.due() {
            return Ok(());
        }
        let ctx = self.base.context()?;
        let planets: Vec<(PlanetId, String, f64, f64)> = ctx.read(|game| {
            game.planets()
                .filter(|p| p.owner.is_some())
                .map(|p| {
                    (
                        p.id,
                        p.name.clone(),
                        p.population,
                        self.capacity(p.habitability, p.building_capacity()),
                    )
                })
                .collect()
        })?;

        let next = parallel::map(&planets, DEFAULT_WORKERS, |(_, _, pop, cap)| {
            self.next_population(*pop, *cap)
        });

        for ((planet, name, before), after) in planets
            .into_iter()
            .map(|(id, name, pop, _)| (id, name, pop))
            .zip(next)
        {
            if after == before {
                continue;
            }
            sink.push(Effect::SetPopulation {
                planet,
                population: after,
            })?;
            if after == 0.0 && before > 0.0 {
                info!(planet = %name, "population collapsed");
                sink.emit(
                    SimEventKind::PopulationCollapsed { planet },
                    format!("the population of {name} has died out"),
                );
            }
        }
        Ok(())
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
