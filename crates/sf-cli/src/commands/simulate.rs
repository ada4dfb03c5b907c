use std::path::Path;

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use sf_core::{BuildingKind, GameState, Planet};
use sf_simulation::{DispatchMode, SimEventKind, Simulation};

use super::scenario;

pub fn run(
    ticks: u64,
    config: Option<&Path>,
    state: Option<&Path>,
    sequential: bool,
    verbose: bool,
) -> Result<(), String> {
    let mut config = super::load_config(config)?;
    if sequential {
        config = config.with_dispatch(DispatchMode::Sequential);
    }
    let (game, sample) = match state {
        Some(path) => (super::load_state(path)?, false),
        None => (scenario::galaxy()?, true),
    };

    let mut sim =
        Simulation::new(game, config).map_err(|e| format!("simulation setup failed: {e}"))?;
    sim.init()
        .map_err(|e| format!("simulation init failed: {e}"))?;
    if sample {
        scenario::issue_orders(&mut sim)?;
    }
    let reports = sim
        .run(ticks)
        .map_err(|e| format!("simulation error: {e}"))?;
    let game = sim.snapshot().map_err(|e| e.to_string())?;

    // Header
    let mode = match sim.config().dispatch {
        DispatchMode::Parallel => "parallel",
        DispatchMode::Sequential => "sequential",
    };
    let failures: usize = reports.iter().map(|r| r.failures.len()).sum();
    println!(
        "  {} '{}' {}",
        "Simulation".bold(),
        game.name,
        format!("({ticks} ticks, {mode} dispatch)").dimmed()
    );
    println!(
        "  {} systems, {} events logged, {} system failures",
        sim.registry().count(),
        sim.events().len(),
        failures
    );
    println!();

    // Events
    if verbose {
        println!("  {}", "Event Log".bold().underline());
        println!();
        for event in sim.events().events() {
            let tick_label = format!("[tick {:>3}]", event.tick).dimmed();
            let desc = colorize_event(&event.kind, &event.description);
            println!("  {tick_label} {desc}");
        }
        if sim.events().is_empty() {
            println!("  {}", "(no events)".dimmed());
        }
        println!();
    } else {
        let notable: Vec<_> = sim
            .events()
            .events()
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    SimEventKind::ShipStranded { .. }
                        | SimEventKind::PopulationCollapsed { .. }
                        | SimEventKind::SystemFailed { .. }
                )
            })
            .collect();
        if !notable.is_empty() {
            println!("  {}", "Notable Events".bold().underline());
            for event in &notable {
                println!("  {}  {}", "WARN".yellow().bold(), event.description);
            }
            println!();
        }
    }

    print_players(&game);
    print_planets(&game);
    print_ships(&game);
    Ok(())
}

fn print_players(game: &GameState) {
    println!("  {}", "Players".bold().underline());
    println!();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Player", "Credits", "Planets", "Ships"]);
    for player in game.players() {
        table.add_row(vec![
            player.name.clone(),
            format!("{:.0}", player.credits),
            game.planets_owned_by(player.id).len().to_string(),
            game.ships_owned_by(player.id).len().to_string(),
        ]);
    }
    println!("{table}");
    println!();
}

fn print_planets(game: &GameState) {
    println!("  {}", "Planets".bold().underline());
    println!();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Planet",
        "Owner",
        "System",
        "Population",
        "Buildings",
        "Stockpile",
    ]);
    for planet in game.planets() {
        table.add_row(vec![
            planet.name.clone(),
            super::player_name(game, planet.owner),
            game.galaxy().system_name(planet.system).to_string(),
            format!("{:.0}", planet.population),
            format_buildings(planet),
            format_stockpile(planet),
        ]);
    }
    println!("{table}");
    println!();
}

fn print_ships(game: &GameState) {
    if game.ships().next().is_none() {
        return;
    }
    println!("  {}", "Ships".bold().underline());
    println!();
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Ship", "Kind", "Owner", "Location", "Fuel", "Status"]);
    for ship in game.ships() {
        table.add_row(vec![
            ship.name.clone(),
            ship.kind.to_string(),
            super::player_name(game, Some(ship.owner)),
            game.galaxy().system_name(ship.location).to_string(),
            format!("{:.0}/{:.0}", ship.fuel, ship.kind.fuel_capacity()),
            ship.status.to_string(),
        ]);
    }
    println!("{table}");
    println!();
}

fn format_buildings(planet: &Planet) -> String {
    let kinds = [
        BuildingKind::Habitat,
        BuildingKind::Mine,
        BuildingKind::Refinery,
        BuildingKind::TradingPost,
        BuildingKind::Shipyard,
    ];
    let parts: Vec<String> = kinds
        .iter()
        .map(|kind| (kind, planet.count_buildings(*kind)))
        .filter(|(_, n)| *n > 0)
        .map(|(kind, n)| format!("{n} {kind}"))
        .collect();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

fn format_stockpile(planet: &Planet) -> String {
    let parts: Vec<String> = planet
        .stockpile
        .iter()
        .filter(|(_, amount)| *amount > 0.0)
        .map(|(kind, amount)| format!("{kind} {amount:.0}"))
        .collect();
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(", ")
    }
}

fn colorize_event(kind: &SimEventKind, description: &str) -> colored::ColoredString {
    match kind {
        SimEventKind::ConstructionCompleted { .. } => description.green(),
        SimEventKind::ShipDeparted { .. } | SimEventKind::ShipArrived { .. } => description.blue(),
        SimEventKind::ShipStranded { .. } => description.yellow(),
        SimEventKind::PopulationCollapsed { .. } => description.red(),
        SimEventKind::SystemFailed { .. } => description.red().bold(),
        SimEventKind::Custom { .. } => description.normal(),
    }
}
