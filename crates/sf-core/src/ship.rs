use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::{PlayerId, ShipId, StarSystemId};

/// Hull classes a shipyard can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipKind {
    /// Fast, cheap, small tank.
    Scout,
    /// Cargo hauler.
    Freighter,
    /// Carries colonists to new worlds.
    ColonyShip,
    /// Light warship.
    Frigate,
}

impl ShipKind {
    /// Construction time in ticks.
    pub fn build_ticks(self) -> u32 {
        match self {
            Self::Scout => 3,
            Self::Freighter => 6,
            Self::ColonyShip => 10,
            Self::Frigate => 8,
        }
    }

    /// Construction cost in credits.
    pub fn cost(self) -> f64 {
        match self {
            Self::Scout => 100.0,
            Self::Freighter => 300.0,
            Self::ColonyShip => 600.0,
            Self::Frigate => 450.0,
        }
    }

    /// Fuel tank size.
    pub fn fuel_capacity(self) -> f64 {
        match self {
            Self::Scout => 60.0,
            Self::Freighter => 120.0,
            Self::ColonyShip => 150.0,
            Self::Frigate => 90.0,
        }
    }

    /// Fuel burned per tick of travel.
    pub fn fuel_per_tick(self) -> f64 {
        match self {
            Self::Scout => 2.0,
            Self::Freighter => 4.0,
            Self::ColonyShip => 6.0,
            Self::Frigate => 3.0,
        }
    }

    /// Speed multiplier applied to the base travel rate.
    pub fn speed(self) -> f64 {
        match self {
            Self::Scout => 2.0,
            Self::Freighter => 1.0,
            Self::ColonyShip => 0.75,
            Self::Frigate => 1.5,
        }
    }
}

impl fmt::Display for ShipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scout => write!(f, "scout"),
            Self::Freighter => write!(f, "freighter"),
            Self::ColonyShip => write!(f, "colony ship"),
            Self::Frigate => write!(f, "frigate"),
        }
    }
}

/// Where a ship is in its travel state machine.
///
/// `Idle -> Moving -> Orbiting`, or `Moving -> Idle` when the tank runs dry
/// mid-transit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum MovementStatus {
    /// Not moving and not in orbit; a stranded ship ends up here.
    Idle,
    /// In transit along a hyperlane.
    Moving {
        /// Origin system.
        from: StarSystemId,
        /// Destination system.
        to: StarSystemId,
        /// Journey completion in `0.0..=1.0`.
        progress: f64,
        /// Progress gained per tick.
        rate: f64,
    },
    /// Parked in orbit at the current location.
    Orbiting,
}

impl MovementStatus {
    /// Returns `true` while the ship is in transit.
    pub fn is_moving(&self) -> bool {
        matches!(self, Self::Moving { .. })
    }
}

impl fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Moving { progress, .. } => write!(f, "moving ({:.0}%)", progress * 100.0),
            Self::Orbiting => write!(f, "orbiting"),
        }
    }
}

/// A ship owned by a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    /// Unique identifier of this ship.
    pub id: ShipId,
    /// Display name.
    pub name: String,
    /// Hull class.
    pub kind: ShipKind,
    /// The owning player.
    pub owner: PlayerId,
    /// The star system the ship is at, or departed from while moving.
    pub location: StarSystemId,
    /// Fuel currently in the tank.
    pub fuel: f64,
    /// Travel state.
    pub status: MovementStatus,
}

impl Ship {
    /// Create a fully fuelled ship orbiting `location`.
    pub fn new(
        name: impl Into<String>,
        kind: ShipKind,
        owner: PlayerId,
        location: StarSystemId,
    ) -> Self {
        Self {
            id: ShipId::new(),
            name: name.into(),
            kind,
            owner,
            location,
            fuel: kind.fuel_capacity(),
            status: MovementStatus::Orbiting,
        }
    }

    /// Set the fuel level, clamped to the tank size.
    pub fn with_fuel(mut self, fuel: f64) -> Self {
        self.fuel = fuel.clamp(0.0, self.kind.fuel_capacity());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ship_is_fuelled_and_orbiting() {
        let ship = Ship::new("Kestrel", ShipKind::Scout, PlayerId::new(), StarSystemId::new());
        assert_eq!(ship.fuel, ShipKind::Scout.fuel_capacity());
        assert_eq!(ship.status, MovementStatus::Orbiting);
    }

    #[test]
    fn fuel_clamped_to_tank() {
        let ship = Ship::new("Kestrel", ShipKind::Scout, PlayerId::new(), StarSystemId::new())
            .with_fuel(1_000.0);
        assert_eq!(ship.fuel, 60.0);
    }

    #[test]
    fn moving_status_display() {
        let status = MovementStatus::Moving {
            from: StarSystemId::new(),
            to: StarSystemId::new(),
            progress: 0.5,
            rate: 0.25,
        };
        assert!(status.is_moving());
        assert_eq!(status.to_string(), "moving (50%)");
    }
}
