//! Interstellar travel.
//!
//! Per ship: `Idle -> Moving -> Orbiting`, or `Moving -> Idle` when the tank
//! runs dry mid-transit. Journeys follow a single hyperlane. Orbiting ships
//! top up from their owner's fuel stockpile in the same system.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sf_core::{
    CoreError, GameState, MovementStatus, PlanetId, PlayerId, ResourceKind, Ship, ShipId,
    StarSystemId,
};
use tracing::{info, warn};

use crate::base::BaseSystem;
use crate::effect::{Effect, EffectSink, StateField};
use crate::error::{SimError, SimResult};
use crate::event::SimEventKind;
use crate::parallel::{self, DEFAULT_WORKERS};
use crate::system::System;

const ARRIVAL_EPSILON: f64 = 1e-9;

/// Tuning for [`MovementSystem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Launch-order priority.
    pub priority: i32,
    /// Move on every `cadence`-th tick.
    pub cadence: u64,
    /// Distance covered per tick by a ship with speed multiplier 1.
    pub base_speed: f64,
    /// Fuel an orbiting ship can take on per tick.
    pub refuel_per_tick: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            priority: 60,
            cadence: 1,
            base_speed: 10.0,
            refuel_per_tick: 10.0,
        }
    }
}

/// The outcome of a successful [`MovementSystem::start_journey`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JourneyPlan {
    /// Progress gained per tick.
    pub rate: f64,
    /// Ticks until arrival.
    pub ticks: u32,
    /// Fuel burned over the whole trip.
    pub fuel_required: f64,
}

/// Drives every ship's travel state machine.
#[derive(Debug)]
pub struct MovementSystem {
    base: BaseSystem,
    config: MovementConfig,
}

/// One ship's effect and optional event for this tick.
type Step = (Effect, Option<(SimEventKind, String)>);

impl MovementSystem {
    /// Name under which the system registers.
    pub const NAME: &'static str = "ship_movement";

    /// Create the system with the given tuning.
    pub fn new(config: MovementConfig) -> Self {
        Self {
            base: BaseSystem::new(Self::NAME, config.priority).with_cadence(config.cadence),
            config,
        }
    }

    /// Create the system with default tuning.
    pub fn with_default_config() -> Self {
        Self::new(MovementConfig::default())
    }

    /// Send `ship` toward `target`.
    ///
    /// The target must be one hyperlane away and the tank must hold fuel
    /// for the whole trip. On any of those failures the ship is put back
    /// into orbit where it is and the error is returned. Call between
    /// ticks; it takes the game write lock.
    pub fn start_journey(&self, ship: ShipId, target: StarSystemId) -> SimResult<JourneyPlan> {
        let ctx = self.base.context()?;
        let mut game = ctx.game().write()?;
        let current = game.ship(ship).ok_or(CoreError::ShipNotFound(ship))?;
        if current.status.is_moving() {
            let message = format!("ship {} is already in transit", current.name);
            return Err(CoreError::Validation(message).into());
        }

        match self.plan(&game, current, target) {
            Ok(plan) => {
                let from = current.location;
                if let Some(s) = game.ship_mut(ship) {
                    s.status = MovementStatus::Moving {
                        from,
                        to: target,
                        progress: 0.0,
                        rate: plan.rate,
                    };
                }
                info!(
                    %ship,
                    from = game.galaxy().system_name(from),
                    to = game.galaxy().system_name(target),
                    ticks = plan.ticks,
                    "journey started"
                );
                Ok(plan)
            }
            Err(e) => {
                if let Some(s) = game.ship_mut(ship) {
                    s.status = MovementStatus::Orbiting;
                }
                warn!(%ship, error = %e, "journey refused");
                Err(e)
            }
        }
    }

    fn plan(&self, game: &GameState, ship: &Ship, target: StarSystemId) -> SimResult<JourneyPlan> {
        let galaxy = game.galaxy();
        if galaxy.system(target).is_none() {
            return Err(CoreError::StarSystemNotFound(target).into());
        }
        if !galaxy.are_connected(ship.location, target) {
            return Err(SimError::NoHyperlane {
                from: ship.location,
                to: target,
            });
        }
        let distance = galaxy.distance(ship.location, target).unwrap_or(0.0);
        let rate = self.rate(ship, distance);
        let ticks = (1.0 / rate).ceil().max(1.0) as u32;
        let fuel_required = f64::from(ticks) * ship.kind.fuel_per_tick();
        if ship.fuel < fuel_required {
            return Err(SimError::InsufficientFuel {
                ship: ship.id,
                required: fuel_required,
                available: ship.fuel,
            });
        }
        Ok(JourneyPlan {
            rate,
            ticks,
            fuel_required,
        })
    }

    /// Progress per tick over `distance`, capped at a one-tick hop.
    fn rate(&self, ship: &Ship, distance: f64) -> f64 {
        if distance <= 0.0 {
            return 1.0;
        }
        (self.config.base_speed * ship.kind.speed() / distance).clamp(f64::MIN_POSITIVE, 1.0)
    }

    /// Advance one moving ship.
    fn step(ship: &Ship) -> Option<Step> {
        let MovementStatus::Moving {
            from,
            to,
            progress,
            rate,
        } = ship.status
        else {
            return None;
        };
        let burn = ship.kind.fuel_per_tick();
        if ship.fuel < burn {
            return Some((
                Effect::UpdateShip {
                    ship: ship.id,
                    location: from,
                    fuel: ship.fuel,
                    status: MovementStatus::Idle,
                },
                Some((
                    SimEventKind::ShipStranded {
                        ship: ship.id,
                        owner: ship.owner,
                        near: from,
                    },
                    format!("{} ran out of fuel in transit", ship.name),
                )),
            ));
        }

        let fuel = ship.fuel - burn;
        let advanced = progress + rate;
        if advanced >= 1.0 - ARRIVAL_EPSILON {
            return Some((
                Effect::UpdateShip {
                    ship: ship.id,
                    location: to,
                    fuel,
                    status: MovementStatus::Orbiting,
                },
                Some((
                    SimEventKind::ShipArrived {
                        ship: ship.id,
                        owner: ship.owner,
                        at: to,
                    },
                    format!("{} arrived", ship.name),
                )),
            ));
        }

        let departed = (progress == 0.0).then(|| {
            (
                SimEventKind::ShipDeparted {
                    ship: ship.id,
                    owner: ship.owner,
                    from,
                    to,
                },
                format!("{} departed", ship.name),
            )
        });
        Some((
            Effect::UpdateShip {
                ship: ship.id,
                location: from,
                fuel,
                status: MovementStatus::Moving {
                    from,
                    to,
                    progress: advanced,
                    rate,
                },
            },
            departed,
        ))
    }
}

impl System for MovementSystem {
    fn base(&self) -> &BaseSystem {
        &self.base
    }

    fn writes(&self) -> &'static [StateField] {
        &[StateField::Ships, StateField::Stockpile]
    }

    fn on_tick(&self, tick: u64, sink: &mut EffectSink) -> SimResult<()> {
        if !self.base.due() {
            return Ok(());
        }
        let ctx = self.base.context()?;
        let (ships, mut depots) = ctx.read(|game| {
            let ships: Vec<Ship> = game.ships().cloned().collect();
            let mut depots: BTreeMap<(PlayerId, StarSystemId), (PlanetId, f64)> = BTreeMap::new();
            for planet in game.planets() {
                let Some(owner) = planet.owner else { continue };
                let stock = planet.stockpile.get(ResourceKind::Fuel);
                let best = depots.entry((owner, planet.system)).or_insert((planet.id, stock));
                if stock > best.1 {
                    *best = (planet.id, stock);
                }
            }
            (ships, depots)
        })?;

        let steps = parallel::map(&ships, DEFAULT_WORKERS, Self::step);
        for (effect, event) in steps.into_iter().flatten() {
            sink.push(effect)?;
            if let Some((kind, description)) = event {
                match &kind {
                    SimEventKind::ShipStranded { ship, .. } => warn!(%ship, tick, "ship stranded"),
                    SimEventKind::ShipArrived { ship, .. } => info!(%ship, tick, "ship arrived"),
                    _ => {}
                }
                sink.emit(kind, description);
            }
        }

        for ship in ships.iter().filter(|s| s.status == MovementStatus::Orbiting) {
            let room = ship.kind.fuel_capacity() - ship.fuel;
            if room <= 0.0 {
                continue;
            }
            let Some((planet, stock)) = depots.get_mut(&(ship.owner, ship.location)) else {
                continue;
            };
            let amount = room.min(self.config.refuel_per_tick).min(*stock);
            if amount <= 0.0 {
                continue;
            }
            *stock -= amount;
            sink.push(Effect::Withdraw {
                planet: *planet,
                resource: ResourceKind::Fuel,
                amount,
                then: vec![Effect::UpdateShip {
                    ship: ship.id,
                    location: ship.location,
                    fuel: ship.fuel + amount,
                    status: MovementStatus::Orbiting,
                }],
            })?;
        }
        Ok(())
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
