use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::id::StarSystemId;

/// Map coordinates of a star system, in light-years.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Create a position.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A node in the hyperlane graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarSystem {
    /// Unique identifier of this system.
    pub id: StarSystemId,
    /// Display name.
    pub name: String,
    /// Map position.
    pub position: Position,
}

impl StarSystem {
    /// Create a star system at the given coordinates.
    pub fn new(name: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: StarSystemId::new(),
            name: name.into(),
            position: Position::new(x, y),
        }
    }
}

/// Star systems and the undirected hyperlanes between them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Galaxy {
    systems: BTreeMap<StarSystemId, StarSystem>,
    lanes: BTreeMap<StarSystemId, BTreeSet<StarSystemId>>,
}

impl Galaxy {
    /// Create an empty galaxy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a star system. Names must be unique (case-insensitive).
    pub fn add_system(&mut self, system: StarSystem) -> CoreResult<StarSystemId> {
        if self.find_by_name(&system.name).is_some() {
            return Err(CoreError::DuplicateName(system.name));
        }
        let id = system.id;
        self.systems.insert(id, system);
        Ok(id)
    }

    /// Add a two-way hyperlane between `a` and `b`.
    pub fn connect(&mut self, a: StarSystemId, b: StarSystemId) -> CoreResult<()> {
        for id in [a, b] {
            if !self.systems.contains_key(&id) {
                return Err(CoreError::StarSystemNotFound(id));
            }
        }
        if a == b {
            return Err(CoreError::Validation(
                "a hyperlane cannot loop back to its own system".into(),
            ));
        }
        self.lanes.entry(a).or_default().insert(b);
        self.lanes.entry(b).or_default().insert(a);
        Ok(())
    }

    /// Returns `true` if a hyperlane joins `a` and `b`.
    pub fn are_connected(&self, a: StarSystemId, b: StarSystemId) -> bool {
        self.lanes.get(&a).is_some_and(|n| n.contains(&b))
    }

    /// Systems one hyperlane away from `id`.
    pub fn neighbors(&self, id: StarSystemId) -> Vec<StarSystemId> {
        self.lanes
            .get(&id)
            .map(|n| n.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Get a star system by id.
    pub fn system(&self, id: StarSystemId) -> Option<&StarSystem> {
        self.systems.get(&id)
    }

    /// Find a star system by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<&StarSystem> {
        self.systems
            .values()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Iterate over all systems in id order.
    pub fn systems(&self) -> impl Iterator<Item = &StarSystem> {
        self.systems.values()
    }

    /// Distance between two systems, if both exist.
    pub fn distance(&self, a: StarSystemId, b: StarSystemId) -> Option<f64> {
        let pa = self.systems.get(&a)?.position;
        let pb = self.systems.get(&b)?.position;
        Some(pa.distance_to(&pb))
    }

    /// Display name of a system, or `"?"` when unknown.
    pub fn system_name(&self, id: StarSystemId) -> &str {
        self.systems.get(&id).map(|s| s.name.as_str()).unwrap_or("?")
    }
}
