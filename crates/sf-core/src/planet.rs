use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{BuildingId, PlanetId, PlayerId, StarSystemId};
use crate::resource::{ResourceKind, Stockpile};

/// The kinds of building a planet can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    /// Housing; raises the planet's population capacity.
    Habitat,
    /// Extracts the planet's deposits into its stockpile.
    Mine,
    /// Converts oil into fuel.
    Refinery,
    /// Adds a flat credit income for the owner.
    TradingPost,
    /// Allows ship construction at the planet.
    Shipyard,
}

impl BuildingKind {
    /// Population capacity contributed by one building of this kind.
    pub fn housing(self) -> f64 {
        match self {
            Self::Habitat => 500.0,
            Self::TradingPost => 50.0,
            Self::Mine | Self::Refinery | Self::Shipyard => 0.0,
        }
    }

    /// Construction time in ticks.
    pub fn build_ticks(self) -> u32 {
        match self {
            Self::Habitat => 5,
            Self::Mine => 4,
            Self::Refinery => 6,
            Self::TradingPost => 3,
            Self::Shipyard => 8,
        }
    }

    /// Construction cost in credits.
    pub fn cost(self) -> f64 {
        match self {
            Self::Habitat => 200.0,
            Self::Mine => 150.0,
            Self::Refinery => 250.0,
            Self::TradingPost => 120.0,
            Self::Shipyard => 400.0,
        }
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Habitat => write!(f, "habitat"),
            Self::Mine => write!(f, "mine"),
            Self::Refinery => write!(f, "refinery"),
            Self::TradingPost => write!(f, "trading post"),
            Self::Shipyard => write!(f, "shipyard"),
        }
    }
}

/// A building placed on a planet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Unique identifier of this building.
    pub id: BuildingId,
    /// What the building does.
    pub kind: BuildingKind,
}

impl Building {
    /// Create a building of the given kind with a fresh id.
    pub fn new(kind: BuildingKind) -> Self {
        Self {
            id: BuildingId::new(),
            kind,
        }
    }
}

/// A planet: the unit that owns population, buildings and stockpiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Planet {
    /// Unique identifier of this planet.
    pub id: PlanetId,
    /// Display name; also the planet's construction-queue location key.
    pub name: String,
    /// The star system this planet orbits.
    pub system: StarSystemId,
    /// The owning player, if colonized.
    pub owner: Option<PlayerId>,
    /// Habitability in `0.0..=1.0`; scales the natural population capacity.
    pub habitability: f64,
    /// Current population.
    pub population: f64,
    /// Stored resources.
    pub stockpile: Stockpile,
    /// Extraction richness per resource, applied per mine per tick.
    pub deposits: BTreeMap<ResourceKind, f64>,
    /// Buildings present on the planet.
    pub buildings: Vec<Building>,
}

impl Planet {
    /// Create an unowned, empty planet in the given star system.
    pub fn new(name: impl Into<String>, system: StarSystemId) -> Self {
        Self {
            id: PlanetId::new(),
            name: name.into(),
            system,
            owner: None,
            habitability: 0.0,
            population: 0.0,
            stockpile: Stockpile::new(),
            deposits: BTreeMap::new(),
            buildings: Vec::new(),
        }
    }

    /// Set the owning player.
    pub fn with_owner(mut self, owner: PlayerId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Set habitability, clamped to `0.0..=1.0`.
    pub fn with_habitability(mut self, habitability: f64) -> Self {
        self.habitability = habitability.clamp(0.0, 1.0);
        self
    }

    /// Set the starting population.
    pub fn with_population(mut self, population: f64) -> Self {
        self.population = population.max(0.0);
        self
    }

    /// Set the extraction richness of a resource deposit.
    pub fn with_deposit(mut self, kind: ResourceKind, richness: f64) -> Self {
        self.deposits.insert(kind, richness.max(0.0));
        self
    }

    /// Set a starting stockpile amount.
    pub fn with_stock(mut self, kind: ResourceKind, amount: f64) -> Self {
        self.stockpile = self.stockpile.with(kind, amount);
        self
    }

    /// Add a building of the given kind.
    pub fn with_building(mut self, kind: BuildingKind) -> Self {
        self.buildings.push(Building::new(kind));
        self
    }

    /// Number of buildings of `kind` on this planet.
    pub fn count_buildings(&self, kind: BuildingKind) -> usize {
        self.buildings.iter().filter(|b| b.kind == kind).count()
    }

    /// Population capacity contributed by buildings alone.
    pub fn building_capacity(&self) -> f64 {
        self.buildings.iter().map(|b| b.kind.housing()).sum()
    }
}
