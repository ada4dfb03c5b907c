//! Headless command-line host for the Starforge simulation.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sf",
    about = "Starforge: drive the galaxy simulation from the terminal",
    version,
    propagate_version = true
)]
struct Cli {
    /// Show more detail: -v prints every event and info logs, -vv debug logs
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation and print the resulting state
    Simulate {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "20")]
        ticks: u64,

        /// TOML file with simulation settings
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON game state to simulate instead of the sample galaxy
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Run systems one at a time in priority order
        #[arg(long)]
        sequential: bool,
    },

    /// List the registered systems
    Systems {
        /// TOML file with simulation settings
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the sample galaxy's construction queues after some ticks
    Queue {
        /// Number of ticks to simulate first
        #[arg(short, long, default_value = "0")]
        ticks: u64,

        /// TOML file with simulation settings
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let verbose = cli.verbose > 0;

    let result = match cli.command {
        Commands::Simulate {
            ticks,
            config,
            state,
            sequential,
        } => commands::simulate::run(
            ticks,
            config.as_deref(),
            state.as_deref(),
            sequential,
            verbose,
        ),
        Commands::Systems { config } => commands::systems::run(config.as_deref()),
        Commands::Queue { ticks, config } => commands::queue::run(ticks, config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
