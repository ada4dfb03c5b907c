pub mod queue;
pub mod scenario;
pub mod simulate;
pub mod systems;

use std::path::Path;

use sf_core::{GameState, PlayerId};
use sf_simulation::SimConfig;

/// Load the simulation settings, falling back to the defaults.
fn load_config(path: Option<&Path>) -> Result<SimConfig, String> {
    match path {
        Some(path) => SimConfig::load(path).map_err(|e| e.to_string()),
        None => Ok(SimConfig::default()),
    }
}

/// Read a saved game state from a JSON file.
fn load_state(path: &Path) -> Result<GameState, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    GameState::from_json(&json).map_err(|e| format!("invalid game state: {e}"))
}

/// Display name of a player, or a dash.
fn player_name(game: &GameState, id: Option<PlayerId>) -> String {
    id.and_then(|id| game.player(id))
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "-".to_string())
}
