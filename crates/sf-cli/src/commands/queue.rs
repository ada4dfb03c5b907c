use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use sf_simulation::Simulation;

use super::scenario;

pub fn run(ticks: u64, config: Option<&Path>) -> Result<(), String> {
    let config = super::load_config(config)?;
    let mut sim = Simulation::new(scenario::galaxy()?, config)
        .map_err(|e| format!("simulation setup failed: {e}"))?;
    sim.init()
        .map_err(|e| format!("simulation init failed: {e}"))?;
    scenario::issue_orders(&mut sim)?;
    sim.run(ticks)
        .map_err(|e| format!("simulation error: {e}"))?;
    let game = sim.snapshot().map_err(|e| e.to_string())?;

    let construction = sim.construction();
    if construction.total_constructions() == 0 {
        println!("  No construction queued after {ticks} ticks.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Location", "#", "Item", "Owner", "Progress", "Remaining",
    ]);
    for location in construction.locations() {
        for (position, item) in construction.get_queue(&location).iter().enumerate() {
            table.add_row(vec![
                location.clone(),
                (position + 1).to_string(),
                item.name.clone(),
                super::player_name(&game, Some(item.owner)),
                format!("{:.0}%", item.progress),
                format!("{}/{}", item.remaining_ticks, item.total_ticks),
            ]);
        }
    }

    println!("{table}");
    println!();
    println!(
        "  {} items queued, {} completed after {ticks} ticks",
        construction.total_constructions(),
        construction.completed_count()
    );
    Ok(())
}
