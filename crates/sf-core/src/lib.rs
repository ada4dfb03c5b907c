//! Core game-state types for Starforge: players, star systems, planets and ships.
//!
//! This crate is the shared data model that the simulation reads every tick
//! and that external collaborators (save/load, world generation, UI) produce
//! and consume. It holds no scheduling logic.

/// Error types used throughout the crate.
pub mod error;
/// Star systems and the hyperlane graph.
pub mod galaxy;
/// Typed identifiers.
pub mod id;
/// Planets and buildings.
pub mod planet;
/// Player empires.
pub mod player;
/// Resource kinds and stockpiles.
pub mod resource;
/// Ships and their travel state.
pub mod ship;
/// The aggregate game state.
pub mod state;

/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export galaxy types.
pub use galaxy::{Galaxy, Position, StarSystem};
/// Re-export identifier types.
pub use id::{BuildingId, PlanetId, PlayerId, ShipId, StarSystemId};
/// Re-export planet types.
pub use planet::{Building, BuildingKind, Planet};
/// Re-export the player type.
pub use player::Player;
/// Re-export resource types.
pub use resource::{ResourceKind, Stockpile};
/// Re-export ship types.
pub use ship::{MovementStatus, Ship, ShipKind};
/// Re-export the game state.
pub use state::GameState;
