use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use sf_core::GameState;
use sf_simulation::Simulation;

pub fn run(config: Option<&Path>) -> Result<(), String> {
    let config = super::load_config(config)?;
    let sim = Simulation::new(GameState::new("systems"), config)
        .map_err(|e| format!("simulation setup failed: {e}"))?;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["System", "Priority", "Cadence", "Writes", "Enabled"]);
    for system in sim.registry().all() {
        let writes: Vec<String> = system.writes().iter().map(|f| f.to_string()).collect();
        table.add_row(vec![
            system.name().to_string(),
            system.priority().to_string(),
            system.cadence().to_string(),
            if writes.is_empty() {
                "-".to_string()
            } else {
                writes.join(", ")
            },
            if system.is_enabled() { "yes" } else { "no" }.to_string(),
        ]);
    }

    println!("{table}");
    println!();
    println!("  {} systems", sim.registry().count());
    Ok(())
}
