use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::construction::ConstructionConfig;
use crate::credits::CreditConfig;
use crate::error::{SimError, SimResult};
use crate::mining::MiningConfig;
use crate::movement::MovementConfig;
use crate::population::PopulationConfig;
use crate::refinery::RefineryConfig;
use crate::registry::DispatchMode;

/// Configuration for a simulation run.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// dispatch = "sequential"
///
/// [population]
/// cadence = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// How systems are dispatched each tick.
    pub dispatch: DispatchMode,
    /// Maximum event log size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
    /// Construction queue tuning.
    pub construction: ConstructionConfig,
    /// Credit production tuning.
    pub credits: CreditConfig,
    /// Population growth tuning.
    pub population: PopulationConfig,
    /// Refinery tuning.
    pub refinery: RefineryConfig,
    /// Resource accumulation tuning.
    pub mining: MiningConfig,
    /// Ship movement tuning.
    pub movement: MovementConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::Parallel,
            max_events: 1_000,
            construction: ConstructionConfig::default(),
            credits: CreditConfig::default(),
            population: PopulationConfig::default(),
            refinery: RefineryConfig::default(),
            mining: MiningConfig::default(),
            movement: MovementConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(source: &str) -> SimResult<Self> {
        toml::from_str(source).map_err(|e| SimError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Set the dispatch mode.
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// Set how many construction queues may be processed at once.
    pub fn with_construction_workers(mut self, workers: usize) -> Self {
        self.construction.workers = workers;
        self
    }

    /// Replace the credit production tuning.
    pub fn with_credits(mut self, credits: CreditConfig) -> Self {
        self.credits = credits;
        self
    }

    /// Replace the population growth tuning.
    pub fn with_population(mut self, population: PopulationConfig) -> Self {
        self.population = population;
        self
    }

    /// Replace the refinery tuning.
    pub fn with_refinery(mut self, refinery: RefineryConfig) -> Self {
        self.refinery = refinery;
        self
    }

    /// Replace the resource accumulation tuning.
    pub fn with_mining(mut self, mining: MiningConfig) -> Self {
        self.mining = mining;
        self
    }

    /// Replace the movement tuning.
    pub fn with_movement(mut self, movement: MovementConfig) -> Self {
        self.movement = movement;
        self
    }
}
