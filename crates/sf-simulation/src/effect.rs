//! Deferred writes to the shared game state.
//!
//! Systems never mutate [`GameState`] while a tick is running. Each one
//! pushes [`Effect`]s into its own [`EffectSink`]; once every dispatched
//! system has returned, the host applies all effects under one write lock.
//! A system may only push effects for the [`StateField`]s it declares.
//!
//! Stock is only ever spent through [`Effect::Withdraw`], which the host
//! checks against the stock left by effects applied before it. Two systems
//! drawing on the same pile therefore cannot both spend it.

use std::fmt;

use serde::Serialize;
use sf_core::{
    CoreError, CoreResult, GameState, MovementStatus, PlanetId, PlayerId, ResourceKind, ShipId,
    StarSystemId,
};

use crate::error::{SimError, SimResult};
use crate::event::{SimEvent, SimEventKind};

/// A slice of the game state that systems write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    /// Player treasuries.
    Credits,
    /// Planet population.
    Population,
    /// Planet resource stockpiles.
    Stockpile,
    /// Ship location, fuel and travel state.
    Ships,
}

impl StateField {
    /// Additive fields take deltas, so several systems may share them.
    /// Stockpile spending is checked at apply time through
    /// [`Effect::Withdraw`]. Non-additive fields are set outright and may
    /// have only one writer.
    pub fn is_additive(self) -> bool {
        matches!(self, Self::Credits | Self::Stockpile)
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credits => write!(f, "credits"),
            Self::Population => write!(f, "population"),
            Self::Stockpile => write!(f, "stockpile"),
            Self::Ships => write!(f, "ships"),
        }
    }
}

/// One pending write.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Add `delta` credits to a player's treasury.
    AdjustCredits {
        /// Target player.
        player: PlayerId,
        /// Signed change.
        delta: f64,
    },
    /// Replace a planet's population.
    SetPopulation {
        /// Target planet.
        planet: PlanetId,
        /// New population.
        population: f64,
    },
    /// Add `delta` of one resource to a planet's stockpile (floored at zero).
    ///
    /// Systems may only push non-negative deltas; spending goes through
    /// [`Effect::Withdraw`].
    AdjustStock {
        /// Target planet.
        planet: PlanetId,
        /// Resource to change.
        resource: ResourceKind,
        /// Signed change.
        delta: f64,
    },
    /// Replace a ship's location, fuel and travel state.
    UpdateShip {
        /// Target ship.
        ship: ShipId,
        /// New location.
        location: StarSystemId,
        /// New fuel level.
        fuel: f64,
        /// New travel state.
        status: MovementStatus,
    },
    /// Take `amount` of a resource from a planet, then apply `then`. If the
    /// planet holds less than `amount` when this is applied, nothing is
    /// taken and `then` is skipped.
    Withdraw {
        /// Planet drawn from.
        planet: PlanetId,
        /// Resource drawn.
        resource: ResourceKind,
        /// Amount taken.
        amount: f64,
        /// Effects paid for by the withdrawal.
        then: Vec<Effect>,
    },
}

/// Slack allowed when comparing stock against a withdrawal.
const STOCK_EPSILON: f64 = 1e-9;

impl Effect {
    /// The field this effect writes.
    pub fn field(&self) -> StateField {
        match self {
            Self::AdjustCredits { .. } => StateField::Credits,
            Self::SetPopulation { .. } => StateField::Population,
            Self::AdjustStock { .. } | Self::Withdraw { .. } => StateField::Stockpile,
            Self::UpdateShip { .. } => StateField::Ships,
        }
    }

    /// This effect followed by everything it carries.
    fn flatten(&self) -> Vec<&Effect> {
        let mut all = vec![self];
        if let Self::Withdraw { then, .. } = self {
            all.extend(then.iter().flat_map(Effect::flatten));
        }
        all
    }

    /// Write this effect into `game`.
    pub fn apply(&self, game: &mut GameState) -> CoreResult<()> {
        match self {
            Self::AdjustCredits { player, delta } => {
                let p = game
                    .player_mut(*player)
                    .ok_or(CoreError::PlayerNotFound(*player))?;
                p.credits += delta;
            }
            Self::SetPopulation { planet, population } => {
                let p = game
                    .planet_mut(*planet)
                    .ok_or(CoreError::PlanetNotFound(*planet))?;
                p.population = population.max(0.0);
            }
            Self::AdjustStock {
                planet,
                resource,
                delta,
            } => {
                let p = game
                    .planet_mut(*planet)
                    .ok_or(CoreError::PlanetNotFound(*planet))?;
                p.stockpile.adjust(*resource, *delta);
            }
            Self::UpdateShip {
                ship,
                location,
                fuel,
                status,
            } => {
                let s = game.ship_mut(*ship).ok_or(CoreError::ShipNotFound(*ship))?;
                s.location = *location;
                s.fuel = fuel.max(0.0);
                s.status = status.clone();
            }
            Self::Withdraw {
                planet,
                resource,
                amount,
                then,
            } => {
                let p = game
                    .planet_mut(*planet)
                    .ok_or(CoreError::PlanetNotFound(*planet))?;
                let available = p.stockpile.get(*resource);
                if available + STOCK_EPSILON < *amount {
                    return Err(CoreError::InsufficientStock {
                        planet: *planet,
                        resource: *resource,
                        required: *amount,
                        available,
                    });
                }
                p.stockpile.adjust(*resource, -amount);
                for effect in then {
                    effect.apply(game)?;
                }
            }
        }
        Ok(())
    }
}

/// Per-system collector for effects and events produced during one tick.
#[derive(Debug)]
pub struct EffectSink {
    system: String,
    writes: &'static [StateField],
    tick: u64,
    effects: Vec<Effect>,
    events: Vec<SimEvent>,
}

impl EffectSink {
    /// Create a sink for `system` that accepts writes to `writes`.
    pub fn new(system: impl Into<String>, writes: &'static [StateField], tick: u64) -> Self {
        Self {
            system: system.into(),
            writes,
            tick,
            effects: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Queue an effect. Fails if the owning system did not declare a field
    /// it touches, or if it lowers a stockpile without a withdrawal.
    pub fn push(&mut self, effect: Effect) -> SimResult<()> {
        for part in effect.flatten() {
            let field = part.field();
            if !self.writes.contains(&field) {
                return Err(SimError::UndeclaredWrite {
                    system: self.system.clone(),
                    field,
                });
            }
            if let Effect::AdjustStock { resource, delta, .. } = part {
                if *delta < 0.0 {
                    return Err(SimError::UncheckedSpend {
                        system: self.system.clone(),
                        resource: *resource,
                    });
                }
            }
        }
        self.effects.push(effect);
        Ok(())
    }

    /// Record an event at the sink's tick.
    pub fn emit(&mut self, kind: SimEventKind, description: impl Into<String>) {
        self.events.push(SimEvent::new(self.tick, kind, description));
    }

    /// The tick this sink collects for.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Effects queued so far.
    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Events recorded so far.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Consume the sink, returning its effects and events.
    pub fn into_parts(self) -> (Vec<Effect>, Vec<SimEvent>) {
        (self.effects, self.events)
    }
}
