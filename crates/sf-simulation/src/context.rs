use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use sf_core::{GameState, Player};

use crate::error::SimResult;

/// The game state as shared between the host and every system.
pub type SharedGame = Arc<RwLock<GameState>>;

/// Read handle every system receives at initialization.
///
/// Cloning is cheap; all clones observe the same game state and the same
/// tick counter. Systems only read through it during a tick; writes go
/// through [`crate::effect::EffectSink`].
#[derive(Clone)]
pub struct SystemContext {
    game: SharedGame,
    tick: Arc<AtomicU64>,
}

impl fmt::Debug for SystemContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemContext")
            .field("tick", &self.tick())
            .finish_non_exhaustive()
    }
}

impl SystemContext {
    /// Wrap a shared game state; the tick starts at 0.
    pub fn new(game: SharedGame) -> Self {
        Self {
            game,
            tick: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The tick currently being simulated.
    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// Publish the tick about to be dispatched.
    pub fn set_tick(&self, tick: u64) {
        self.tick.store(tick, Ordering::Release);
    }

    /// The shared game state.
    pub fn game(&self) -> &SharedGame {
        &self.game
    }

    /// Run `f` under a read lock. Keep `f` short and free of nested
    /// parallel work: copy what you need out and release the lock.
    pub fn read<R>(&self, f: impl FnOnce(&GameState) -> R) -> SimResult<R> {
        let game = self.game.read()?;
        Ok(f(&game))
    }

    /// Snapshot of every player.
    pub fn players(&self) -> SimResult<Vec<Player>> {
        self.read(|game| game.players().cloned().collect())
    }
}
