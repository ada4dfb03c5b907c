/// Monotonic tick counter for a game session.
///
/// Tick 0 means "nothing has run yet"; the first call to [`SimClock::advance`]
/// yields tick 1. A restored session resumes from its saved tick so that
/// tick numbers keep strictly increasing across save/load.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    tick: u64,
    resumed_from: u64,
}

impl SimClock {
    /// Create a clock at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock for a restored session whose last completed tick was `tick`.
    pub fn resume_at(tick: u64) -> Self {
        Self {
            tick,
            resumed_from: tick,
        }
    }

    /// Advance the clock by one tick. Returns the new tick number.
    pub fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Return the current tick number.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Ticks run since the clock was created or resumed.
    pub fn elapsed(&self) -> u64 {
        self.tick - self.resumed_from
    }
}
