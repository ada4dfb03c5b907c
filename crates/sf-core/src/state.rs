use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::galaxy::{Galaxy, StarSystem};
use crate::id::{PlanetId, PlayerId, ShipId, StarSystemId};
use crate::planet::Planet;
use crate::player::Player;
use crate::ship::Ship;

/// The whole mutable game world: players, the galaxy, planets and ships.
///
/// Collections are keyed by id in ordered maps so that every scan over the
/// state visits objects in the same order on every run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameState {
    /// Session name.
    pub name: String,
    galaxy: Galaxy,
    players: BTreeMap<PlayerId, Player>,
    planets: BTreeMap<PlanetId, Planet>,
    ships: BTreeMap<ShipId, Ship>,
}

impl GameState {
    /// Create an empty game state.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parse a game state from JSON.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::Validation(e.to_string()))
    }

    /// Serialize the game state to pretty JSON.
    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::Validation(e.to_string()))
    }

    // -----------------------------------------------------------------------
    // Galaxy
    // -----------------------------------------------------------------------

    /// The star map.
    pub fn galaxy(&self) -> &Galaxy {
        &self.galaxy
    }

    /// Add a star system to the galaxy.
    pub fn add_star_system(&mut self, system: StarSystem) -> CoreResult<StarSystemId> {
        self.galaxy.add_system(system)
    }

    /// Add a hyperlane between two systems.
    pub fn connect(&mut self, a: StarSystemId, b: StarSystemId) -> CoreResult<()> {
        self.galaxy.connect(a, b)
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Add a player. Names must be unique (case-insensitive).
    pub fn add_player(&mut self, player: Player) -> CoreResult<PlayerId> {
        if self
            .players
            .values()
            .any(|p| p.name.eq_ignore_ascii_case(&player.name))
        {
            return Err(CoreError::DuplicateName(player.name));
        }
        let id = player.id;
        self.players.insert(id, player);
        Ok(id)
    }

    /// Get a player by id.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Get a mutable player by id.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Find a player by name (case-insensitive).
    pub fn find_player(&self, name: &str) -> Option<&Player> {
        self.players
            .values()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Iterate over all players in id order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Number of players.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    // -----------------------------------------------------------------------
    // Planets
    // -----------------------------------------------------------------------

    /// Add a planet. Its star system and owner (if any) must already exist,
    /// and its name must be unique because it doubles as a queue location.
    pub fn add_planet(&mut self, planet: Planet) -> CoreResult<PlanetId> {
        if self.galaxy.system(planet.system).is_none() {
            return Err(CoreError::StarSystemNotFound(planet.system));
        }
        if let Some(owner) = planet.owner {
            if !self.players.contains_key(&owner) {
                return Err(CoreError::PlayerNotFound(owner));
            }
        }
        if self.find_planet(&planet.name).is_some() {
            return Err(CoreError::DuplicateName(planet.name));
        }
        let id = planet.id;
        self.planets.insert(id, planet);
        Ok(id)
    }

    /// Get a planet by id.
    pub fn planet(&self, id: PlanetId) -> Option<&Planet> {
        self.planets.get(&id)
    }

    /// Get a mutable planet by id.
    pub fn planet_mut(&mut self, id: PlanetId) -> Option<&mut Planet> {
        self.planets.get_mut(&id)
    }

    /// Find a planet by name (case-insensitive).
    pub fn find_planet(&self, name: &str) -> Option<&Planet> {
        self.planets
            .values()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Find a planet id by name (case-insensitive).
    pub fn find_planet_id(&self, name: &str) -> Option<PlanetId> {
        self.find_planet(name).map(|p| p.id)
    }

    /// Iterate over all planets in id order.
    pub fn planets(&self) -> impl Iterator<Item = &Planet> {
        self.planets.values()
    }

    /// Planets owned by `player`, in id order.
    pub fn planets_owned_by(&self, player: PlayerId) -> Vec<&Planet> {
        self.planets
            .values()
            .filter(|p| p.owner == Some(player))
            .collect()
    }

    /// Transfer ownership of a planet.
    pub fn set_planet_owner(&mut self, planet: PlanetId, owner: Option<PlayerId>) -> CoreResult<()> {
        if let Some(player) = owner {
            if !self.players.contains_key(&player) {
                return Err(CoreError::PlayerNotFound(player));
            }
        }
        let planet = self
            .planets
            .get_mut(&planet)
            .ok_or(CoreError::PlanetNotFound(planet))?;
        planet.owner = owner;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Ships
    // -----------------------------------------------------------------------

    /// Add a ship. Its owner and location must already exist.
    pub fn add_ship(&mut self, ship: Ship) -> CoreResult<ShipId> {
        if !self.players.contains_key(&ship.owner) {
            return Err(CoreError::PlayerNotFound(ship.owner));
        }
        if self.galaxy.system(ship.location).is_none() {
            return Err(CoreError::StarSystemNotFound(ship.location));
        }
        let id = ship.id;
        self.ships.insert(id, ship);
        Ok(id)
    }

    /// Get a ship by id.
    pub fn ship(&self, id: ShipId) -> Option<&Ship> {
        self.ships.get(&id)
    }

    /// Get a mutable ship by id.
    pub fn ship_mut(&mut self, id: ShipId) -> Option<&mut Ship> {
        self.ships.get_mut(&id)
    }

    /// Iterate over all ships in id order.
    pub fn ships(&self) -> impl Iterator<Item = &Ship> {
        self.ships.values()
    }

    /// Ships owned by `player`, in id order.
    pub fn ships_owned_by(&self, player: PlayerId) -> Vec<&Ship> {
        self.ships.values().filter(|s| s.owner == player).collect()
    }
}
