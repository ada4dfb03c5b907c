//! The built-in sample galaxy used when no saved state is given.

use sf_core::{
    BuildingKind, GameState, Planet, Player, ResourceKind, Ship, ShipKind, StarSystem,
};
use sf_simulation::{ConstructionKind, Simulation};

/// Four systems in a line, two empires, a handful of planets and ships.
pub fn galaxy() -> Result<GameState, String> {
    build().map_err(|e| format!("cannot build sample galaxy: {e}"))
}

fn build() -> sf_core::CoreResult<GameState> {
    let mut game = GameState::new("Sample Galaxy");

    let sol = game.add_star_system(StarSystem::new("Sol", 0.0, 0.0))?;
    let vega = game.add_star_system(StarSystem::new("Vega", 20.0, 0.0))?;
    let altair = game.add_star_system(StarSystem::new("Altair", 20.0, 30.0))?;
    let deneb = game.add_star_system(StarSystem::new("Deneb", 60.0, 30.0))?;
    game.connect(sol, vega)?;
    game.connect(vega, altair)?;
    game.connect(altair, deneb)?;

    let terran = game.add_player(Player::new("Terran Union").with_credits(2_000.0))?;
    let concord = game.add_player(Player::new("Vega Concord").with_credits(1_500.0))?;

    game.add_planet(
        Planet::new("Terra", sol)
            .with_owner(terran)
            .with_habitability(0.9)
            .with_population(800.0)
            .with_deposit(ResourceKind::Oil, 2.0)
            .with_deposit(ResourceKind::Ore, 1.0)
            .with_stock(ResourceKind::Fuel, 40.0)
            .with_building(BuildingKind::Habitat)
            .with_building(BuildingKind::Mine)
            .with_building(BuildingKind::Refinery)
            .with_building(BuildingKind::TradingPost)
            .with_building(BuildingKind::Shipyard),
    )?;
    game.add_planet(
        Planet::new("Mars", sol)
            .with_owner(terran)
            .with_habitability(0.3)
            .with_population(50.0)
            .with_deposit(ResourceKind::Ore, 3.0)
            .with_building(BuildingKind::Mine),
    )?;
    game.add_planet(
        Planet::new("Vega Prime", vega)
            .with_owner(concord)
            .with_habitability(0.7)
            .with_population(600.0)
            .with_deposit(ResourceKind::Oil, 1.0)
            .with_stock(ResourceKind::Oil, 50.0)
            .with_building(BuildingKind::Refinery)
            .with_building(BuildingKind::Shipyard),
    )?;
    game.add_planet(
        Planet::new("Cinder", altair)
            .with_owner(concord)
            .with_population(30.0)
            .with_deposit(ResourceKind::Water, 1.0),
    )?;
    game.add_planet(Planet::new("Frost", deneb).with_habitability(0.4))?;

    game.add_ship(Ship::new("Pathfinder", ShipKind::Scout, terran, sol))?;
    game.add_ship(Ship::new("Long Haul", ShipKind::Freighter, concord, vega).with_fuel(6.0))?;

    Ok(game)
}

/// Place the sample orders and send the terran scout to Vega.
pub fn issue_orders(sim: &mut Simulation) -> Result<(), String> {
    let game = sim.snapshot().map_err(|e| e.to_string())?;
    let terran = find_player(&game, "Terran Union")?;
    let concord = find_player(&game, "Vega Concord")?;
    let system = |name: &str| {
        game.galaxy()
            .find_by_name(name)
            .map(|s| s.id)
            .ok_or_else(|| format!("sample galaxy has no system named {name}"))
    };
    let ship = |name: &str| {
        game.ships()
            .find(|s| s.name == name)
            .map(|s| s.id)
            .ok_or_else(|| format!("sample galaxy has no ship named {name}"))
    };

    let orders = [
        (terran, "Terra", ConstructionKind::Building(BuildingKind::Habitat)),
        (terran, "Terra", ConstructionKind::Ship(ShipKind::Scout)),
        (terran, "Mars", ConstructionKind::Building(BuildingKind::Refinery)),
        (concord, "Vega Prime", ConstructionKind::Ship(ShipKind::Freighter)),
        (concord, "Vega Prime", ConstructionKind::Building(BuildingKind::Mine)),
    ];
    for (owner, planet, kind) in orders {
        sim.order_construction(owner, planet, kind)
            .map_err(|e| e.to_string())?;
    }

    sim.start_journey(ship("Pathfinder")?, system("Vega")?)
        .map_err(|e| e.to_string())?;
    Ok(())
}

fn find_player(game: &GameState, name: &str) -> Result<sf_core::PlayerId, String> {
    game.find_player(name)
        .map(|p| p.id)
        .ok_or_else(|| format!("sample galaxy has no player named {name}"))
}
