use serde::{Deserialize, Serialize};

use crate::id::PlayerId;

/// A player empire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier of this player.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Treasury balance.
    pub credits: f64,
}

impl Player {
    /// Create a player with an empty treasury.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PlayerId::new(),
            name: name.into(),
            credits: 0.0,
        }
    }

    /// Set the starting treasury.
    pub fn with_credits(mut self, credits: f64) -> Self {
        self.credits = credits;
        self
    }
}
