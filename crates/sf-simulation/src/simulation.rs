use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use sf_core::{
    Building, BuildingKind, CoreError, CoreResult, GameState, PlayerId, Ship, ShipId, StarSystemId,
};
use tracing::{debug, info, warn};

use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::construction::{
    ConstructionCompletion, ConstructionItem, ConstructionKind, ConstructionSystem,
};
use crate::context::{SharedGame, SystemContext};
use crate::credits::CreditProductionSystem;
use crate::error::{SimError, SimResult};
use crate::event::EventLog;
use crate::mining::ResourceAccumulationSystem;
use crate::movement::{JourneyPlan, MovementSystem};
use crate::population::PopulationGrowthSystem;
use crate::refinery::RefinerySystem;
use crate::registry::{Registry, TickReport};
use crate::system::System;

/// The top-level simulation host.
///
/// Owns the shared game state, the clock, the event log and the registry
/// holding the standard systems. Each [`Simulation::tick`] dispatches every
/// enabled system, then applies their effects and any finished construction
/// to the game state under one write lock.
pub struct Simulation {
    game: SharedGame,
    context: SystemContext,
    clock: SimClock,
    registry: Registry,
    events: EventLog,
    config: SimConfig,
    construction: Arc<ConstructionSystem>,
    movement: Arc<MovementSystem>,
    delivered: Arc<Mutex<Vec<ConstructionCompletion>>>,
    initialized: bool,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.clock.tick())
            .field("systems", &self.registry.count())
            .field("events", &self.events.len())
            .finish()
    }
}

impl Simulation {
    /// Create a simulation over `game` with the standard systems registered.
    pub fn new(game: GameState, config: SimConfig) -> SimResult<Self> {
        let game: SharedGame = Arc::new(RwLock::new(game));
        let context = SystemContext::new(Arc::clone(&game));
        let registry = Registry::new();

        let construction = Arc::new(ConstructionSystem::new(config.construction.clone()));
        let movement = Arc::new(MovementSystem::new(config.movement.clone()));
        registry.register(Arc::clone(&construction) as Arc<dyn System>)?;
        registry.register(Arc::new(CreditProductionSystem::new(config.credits.clone())))?;
        registry.register(Arc::new(PopulationGrowthSystem::new(config.population.clone())))?;
        registry.register(Arc::new(RefinerySystem::new(config.refinery.clone())))?;
        registry.register(Arc::new(ResourceAccumulationSystem::new(config.mining.clone())))?;
        registry.register(Arc::clone(&movement) as Arc<dyn System>)?;

        let delivered = Arc::new(Mutex::new(Vec::new()));
        let inbox = Arc::clone(&delivered);
        construction.set_completion_handler(move |completion| {
            inbox
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(completion);
        });

        Ok(Self {
            game,
            context,
            clock: SimClock::new(),
            registry,
            events: EventLog::new(config.max_events),
            config,
            construction,
            movement,
            delivered,
            initialized: false,
        })
    }

    /// Register an additional system. If the session is already running the
    /// system is initialized right away.
    pub fn add_system(&self, system: Arc<dyn System>) -> SimResult<()> {
        self.registry.register(Arc::clone(&system))?;
        if self.initialized {
            system.init(&self.context)?;
        }
        Ok(())
    }

    /// Hand the context to every registered system.
    pub fn init(&mut self) -> SimResult<()> {
        if self.initialized {
            return Ok(());
        }
        self.registry.initialize_all(&self.context)?;
        self.initialized = true;
        Ok(())
    }

    /// Continue numbering from `tick`, the last tick of a saved session.
    pub fn resume_at(&mut self, tick: u64) {
        self.clock = SimClock::resume_at(tick);
        self.context.set_tick(tick);
    }

    /// Swap in a restored game state and re-initialize every system.
    ///
    /// Construction queued for the previous game is discarded along with any
    /// completion not yet materialized.
    pub fn restore(&mut self, game: GameState, tick: u64) -> SimResult<()> {
        *self.game.write()? = game;
        self.construction.reset();
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.resume_at(tick);
        self.initialized = false;
        self.init()
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> SimResult<TickReport> {
        if !self.initialized {
            self.init()?;
        }

        let tick = self.clock.advance();
        self.context.set_tick(tick);
        let mut report = self.registry.dispatch(tick, self.config.dispatch);
        let completions = mem::take(
            &mut *self
                .delivered
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        {
            let mut game = self.game.write()?;
            for effect in &report.effects {
                match effect.apply(&mut game) {
                    Ok(()) => report.effects_applied += 1,
                    Err(e @ CoreError::InsufficientStock { .. }) => {
                        report.effects_refused += 1;
                        debug!(tick, error = %e, "withdrawal refused");
                    }
                    Err(e) => warn!(tick, error = %e, "dropped effect"),
                }
            }
            for completion in &completions {
                if let Err(e) = materialize(&mut game, completion) {
                    warn!(
                        tick,
                        location = %completion.location,
                        error = %e,
                        "finished construction has nowhere to go"
                    );
                }
            }
        }

        self.events.extend(report.events.iter().cloned());
        info!(
            tick,
            ran = report.ran.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            effects = report.effects_applied,
            refused = report.effects_refused,
            "tick complete"
        );
        Ok(report)
    }

    /// Advance the simulation by `n` ticks.
    pub fn run(&mut self, n: u64) -> SimResult<Vec<TickReport>> {
        (0..n).map(|_| self.tick()).collect()
    }

    /// Pay for and enqueue a construction item on one of `owner`'s planets.
    ///
    /// Ships additionally need a shipyard on the planet.
    pub fn order_construction(
        &self,
        owner: PlayerId,
        planet: &str,
        kind: ConstructionKind,
    ) -> SimResult<ConstructionItem> {
        let mut game = self.game.write()?;
        let target = game
            .find_planet(planet)
            .ok_or_else(|| CoreError::UnknownPlanet(planet.to_string()))?;
        if target.owner != Some(owner) {
            let message = format!("{} is not yours to build on", target.name);
            return Err(CoreError::Validation(message).into());
        }
        if matches!(kind, ConstructionKind::Ship(_))
            && target.count_buildings(BuildingKind::Shipyard) == 0
        {
            let message = format!("{} has no shipyard", target.name);
            return Err(CoreError::Validation(message).into());
        }
        let location = target.name.clone();

        let player = game
            .player_mut(owner)
            .ok_or(CoreError::PlayerNotFound(owner))?;
        let cost = kind.cost();
        if player.credits < cost {
            return Err(SimError::InsufficientCredits {
                player: owner,
                required: cost,
                available: player.credits,
            });
        }
        player.credits -= cost;
        drop(game);

        let item = ConstructionItem::new(kind, location.as_str(), owner, self.clock.tick());
        info!(%owner, location = %location, item = %item.name, cost, "construction ordered");
        self.construction.add_to_queue(&location, item.clone());
        Ok(item)
    }

    /// Send a ship toward a neighbouring star system.
    pub fn start_journey(&mut self, ship: ShipId, target: StarSystemId) -> SimResult<JourneyPlan> {
        self.init()?;
        self.movement.start_journey(ship, target)
    }

    /// The shared game state.
    pub fn game(&self) -> &SharedGame {
        &self.game
    }

    /// A copy of the current game state.
    pub fn snapshot(&self) -> SimResult<GameState> {
        Ok(self.game.read()?.clone())
    }

    /// The handle systems read through.
    pub fn context(&self) -> &SystemContext {
        &self.context
    }

    /// The registry holding every system.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The construction queue system.
    pub fn construction(&self) -> &Arc<ConstructionSystem> {
        &self.construction
    }

    /// The ship movement system.
    pub fn movement(&self) -> &Arc<MovementSystem> {
        &self.movement
    }

    /// The simulation clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Events recorded so far.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// The configuration the simulation was built with.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The last completed tick.
    pub fn current_tick(&self) -> u64 {
        self.clock.tick()
    }
}

/// Turn a finished item into a building on its planet or a ship in orbit.
fn materialize(game: &mut GameState, completion: &ConstructionCompletion) -> CoreResult<()> {
    let planet = game
        .find_planet_id(&completion.location)
        .ok_or_else(|| CoreError::UnknownPlanet(completion.location.clone()))?;
    match completion.item.kind {
        ConstructionKind::Building(kind) => {
            let planet = game
                .planet_mut(planet)
                .ok_or(CoreError::PlanetNotFound(planet))?;
            planet.buildings.push(Building::new(kind));
        }
        ConstructionKind::Ship(kind) => {
            let system = game
                .planet(planet)
                .map(|p| p.system)
                .ok_or(CoreError::PlanetNotFound(planet))?;
            game.add_ship(Ship::new(
                completion.item.name.clone(),
                kind,
                completion.owner,
                system,
            ))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::BaseSystem;
    use crate::effect::EffectSink;
    use crate::event::SimEventKind;
    use crate::population::PopulationConfig;
    use crate::refinery::RefineryConfig;
    use crate::registry::DispatchMode;
    use sf_core::{Planet, Player, PlanetId, ResourceKind, ShipKind, StarSystem};
    use std::any::Any;

    struct Scenario {
        game: GameState,
        ada: PlayerId,
        terra: PlanetId,
        sol: StarSystemId,
        vega: StarSystemId,
    }

    fn scenario() -> Scenario {
        let mut game = GameState::new("test");
        let sol = game.add_star_system(StarSystem::new("Sol", 0.0, 0.0)).unwrap();
        let vega = game.add_star_system(StarSystem::new("Vega", 20.0, 0.0)).unwrap();
        game.connect(sol, vega).unwrap();
        let ada = game.add_player(Player::new("Ada").with_credits(1_000.0)).unwrap();
        let terra = game
            .add_planet(
                Planet::new("Terra", sol)
                    .with_owner(ada)
                    .with_habitability(0.8)
                    .with_population(400.0)
                    .with_deposit(ResourceKind::Oil, 2.0)
                    .with_building(BuildingKind::Mine)
                    .with_building(BuildingKind::Refinery)
                    .with_building(BuildingKind::Shipyard),
            )
            .unwrap();
        Scenario {
            game,
            ada,
            terra,
            sol,
            vega,
        }
    }

    #[derive(Debug)]
    struct Broken {
        base: BaseSystem,
    }

    impl System for Broken {
        fn base(&self) -> &BaseSystem {
            &self.base
        }
        fn on_tick(&self, _tick: u64, _sink: &mut EffectSink) -> SimResult<()> {
            panic!("broken on purpose");
        }
        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    #[test]
    fn standard_systems_registered_in_priority_order() {
        let sim = Simulation::new(GameState::new("t"), SimConfig::default()).unwrap();
        let names: Vec<String> = sim
            .registry()
            .all()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                ConstructionSystem::NAME,
                CreditProductionSystem::NAME,
                PopulationGrowthSystem::NAME,
                RefinerySystem::NAME,
                ResourceAccumulationSystem::NAME,
                MovementSystem::NAME,
            ]
        );
    }

    #[test]
    fn tick_applies_production() {
        let s = scenario();
        let mut sim = Simulation::new(s.game, SimConfig::default()).unwrap();
        let report = sim.tick().unwrap();
        assert!(report.is_clean());
        assert_eq!(report.tick, 1);
        assert_eq!(report.effects_applied, report.effects.len());

        let game = sim.snapshot().unwrap();
        assert_eq!(game.player(s.ada).unwrap().credits, 1_000.0 + 400.0 * 0.01);
        assert_eq!(
            game.planet(s.terra).unwrap().stockpile.get(ResourceKind::Oil),
            10.0
        );
    }

    #[test]
    fn refinery_sees_previous_tick_stock() {
        let s = scenario();
        let mut sim = Simulation::new(s.game, SimConfig::default()).unwrap();
        sim.run(2).unwrap();
        let game = sim.snapshot().unwrap();
        let terra = game.planet(s.terra).unwrap();
        assert_eq!(terra.stockpile.get(ResourceKind::Oil), 10.0);
        assert_eq!(terra.stockpile.get(ResourceKind::Fuel), 6.0);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let s = scenario();
        let config = SimConfig::default().with_population(PopulationConfig {
            cadence: 1,
            ..PopulationConfig::default()
        });
        let mut parallel = Simulation::new(s.game.clone(), config.clone()).unwrap();
        let mut sequential =
            Simulation::new(s.game, config.with_dispatch(DispatchMode::Sequential)).unwrap();
        parallel.run(12).unwrap();
        sequential.run(12).unwrap();

        let a = parallel.snapshot().unwrap();
        let b = sequential.snapshot().unwrap();
        assert_eq!(
            a.player(s.ada).unwrap().credits,
            b.player(s.ada).unwrap().credits
        );
        let (pa, pb) = (a.planet(s.terra).unwrap(), b.planet(s.terra).unwrap());
        assert_eq!(pa.population, pb.population);
        assert_eq!(pa.stockpile, pb.stockpile);
    }

    #[test]
    fn ordered_building_appears_when_finished() {
        let s = scenario();
        let mut sim = Simulation::new(s.game, SimConfig::default()).unwrap();
        let kind = ConstructionKind::Building(BuildingKind::Habitat);
        let item = sim.order_construction(s.ada, "Terra", kind).unwrap();
        assert_eq!(sim.construction().get_queue("Terra").len(), 1);
        assert_eq!(
            sim.snapshot().unwrap().player(s.ada).unwrap().credits,
            1_000.0 - BuildingKind::Habitat.cost()
        );

        sim.run(u64::from(item.total_ticks)).unwrap();

        let game = sim.snapshot().unwrap();
        assert_eq!(
            game.planet(s.terra)
                .unwrap()
                .count_buildings(BuildingKind::Habitat),
            1
        );
        assert!(sim.construction().get_queue("Terra").is_empty());
        assert!(sim.events().events().iter().any(|e| matches!(
            &e.kind,
            SimEventKind::ConstructionCompleted { item: id, .. } if *id == item.id
        )));
    }

    #[test]
    fn ordered_ship_launches_into_orbit() {
        let s = scenario();
        let mut sim = Simulation::new(s.game, SimConfig::default()).unwrap();
        let item = sim
            .order_construction(s.ada, "Terra", ConstructionKind::Ship(ShipKind::Scout))
            .unwrap();
        sim.run(u64::from(item.total_ticks)).unwrap();

        let game = sim.snapshot().unwrap();
        let ships = game.ships_owned_by(s.ada);
        assert_eq!(ships.len(), 1);
        assert_eq!(ships[0].location, s.sol);
        assert_eq!(ships[0].kind, ShipKind::Scout);
    }

    #[test]
    fn order_validation() {
        let mut s = scenario();
        s.game.add_planet(Planet::new("Wild", s.sol)).unwrap();
        let sim = Simulation::new(s.game, SimConfig::default()).unwrap();

        let err = sim
            .order_construction(s.ada, "Nowhere", ConstructionKind::Building(BuildingKind::Mine))
            .unwrap_err();
        assert!(matches!(err, SimError::Core(CoreError::UnknownPlanet(_))));

        let err = sim
            .order_construction(s.ada, "Wild", ConstructionKind::Building(BuildingKind::Mine))
            .unwrap_err();
        assert!(matches!(err, SimError::Core(CoreError::Validation(_))));

        let err = sim
            .order_construction(s.ada, "Terra", ConstructionKind::Ship(ShipKind::ColonyShip))
            .and_then(|_| {
                sim.order_construction(s.ada, "Terra", ConstructionKind::Ship(ShipKind::ColonyShip))
            })
            .unwrap_err();
        assert!(matches!(err, SimError::InsufficientCredits { .. }));
        assert_eq!(sim.construction().get_queue("Terra").len(), 1);
    }

    #[test]
    fn panicking_system_is_isolated() {
        let s = scenario();
        let mut sim = Simulation::new(s.game, SimConfig::default()).unwrap();
        sim.add_system(Arc::new(Broken {
            base: BaseSystem::new("broken", 0),
        }))
        .unwrap();

        let report = sim.tick().unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.ran.len(), 6);
        assert!(sim.snapshot().unwrap().player(s.ada).unwrap().credits > 1_000.0);
        assert!(sim.events().events().iter().any(|e| matches!(
            &e.kind,
            SimEventKind::SystemFailed { system, .. } if system == "broken"
        )));
    }

    #[test]
    fn disabled_system_produces_nothing() {
        let s = scenario();
        let mut sim = Simulation::new(s.game, SimConfig::default()).unwrap();
        assert!(sim.registry().disable(CreditProductionSystem::NAME));
        let report = sim.tick().unwrap();
        assert_eq!(report.skipped, vec![CreditProductionSystem::NAME]);
        assert_eq!(sim.snapshot().unwrap().player(s.ada).unwrap().credits, 1_000.0);
    }

    #[test]
    fn journey_through_simulation() {
        let mut s = scenario();
        let ship = s
            .game
            .add_ship(Ship::new("Kestrel", ShipKind::Scout, s.ada, s.sol))
            .unwrap();
        let mut sim = Simulation::new(s.game, SimConfig::default()).unwrap();
        let plan = sim.start_journey(ship, s.vega).unwrap();
        assert_eq!(plan.ticks, 1);

        sim.tick().unwrap();

        let game = sim.snapshot().unwrap();
        assert_eq!(game.ship(ship).unwrap().location, s.vega);
    }

    #[test]
    fn restore_resumes_tick_numbering() {
        let s = scenario();
        let mut sim = Simulation::new(GameState::new("blank"), SimConfig::default()).unwrap();
        sim.run(3).unwrap();
        sim.restore(s.game, 40).unwrap();
        assert_eq!(sim.tick().unwrap().tick, 41);
        assert_eq!(sim.clock().elapsed(), 1);
        assert_eq!(sim.context().tick(), 41);
        assert!(sim.snapshot().unwrap().player(s.ada).is_some());
    }

    #[test]
    fn restore_discards_previous_session_work() {
        let s = scenario();
        let mut sim = Simulation::new(s.game, SimConfig::default()).unwrap();
        sim.order_construction(s.ada, "Terra", ConstructionKind::Building(BuildingKind::Mine))
            .unwrap();
        sim.run(2).unwrap();

        let mut other = GameState::new("other");
        let sol = other.add_star_system(StarSystem::new("Sol", 0.0, 0.0)).unwrap();
        let bob = other.add_player(Player::new("Bob")).unwrap();
        let bobs_terra = other
            .add_planet(Planet::new("Terra", sol).with_owner(bob))
            .unwrap();
        sim.restore(other, 10).unwrap();

        assert_eq!(sim.construction().total_constructions(), 0);
        let population = sim.registry().find::<PopulationGrowthSystem>().unwrap();
        assert_eq!(population.base().invocations(), 0);

        sim.run(50).unwrap();
        let game = sim.snapshot().unwrap();
        assert_eq!(
            game.planet(bobs_terra)
                .unwrap()
                .count_buildings(BuildingKind::Mine),
            0
        );
    }

    #[test]
    fn shared_fuel_is_spent_once() {
        let mut s = scenario();
        s.game
            .planet_mut(s.terra)
            .unwrap()
            .stockpile
            .adjust(ResourceKind::Fuel, 10.0);
        let hauler = s
            .game
            .add_ship(Ship::new("Hauler", ShipKind::Freighter, s.ada, s.sol).with_fuel(0.0))
            .unwrap();
        let config = SimConfig::default().with_refinery(RefineryConfig {
            input: ResourceKind::Fuel,
            output: ResourceKind::Ore,
            ..RefineryConfig::default()
        });
        let mut sim = Simulation::new(s.game, config).unwrap();

        let report = sim.tick().unwrap();

        assert_eq!(report.effects_refused, 1);
        let game = sim.snapshot().unwrap();
        let terra = game.planet(s.terra).unwrap();
        assert_eq!(terra.stockpile.get(ResourceKind::Fuel), 0.0);
        assert_eq!(terra.stockpile.get(ResourceKind::Ore), 6.0);
        assert_eq!(game.ship(hauler).unwrap().fuel, 0.0);
    }

    #[test]
    fn empty_game_no_crash() {
        let mut sim = Simulation::new(GameState::new("Empty"), SimConfig::default()).unwrap();
        let reports = sim.run(100).unwrap();
        assert_eq!(sim.current_tick(), 100);
        assert!(reports.iter().all(TickReport::is_clean));
    }
}
