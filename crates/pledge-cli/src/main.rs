//! Pledge CLI — exercises the promise primitive from the command line.
//!
//! Subcommands: init, scenarios, coalesce.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::PledgeConfig;

/// Pledge — single-assignment promises with deferred continuations.
#[derive(Parser, Debug)]
#[command(name = "pledge", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "pledge.toml", global = true)]
    config: PathBuf,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file.
    Init(commands::init::InitArgs),
    /// Run the documented promise scenarios.
    Scenarios(commands::scenarios::ScenariosArgs),
    /// Run the request-coalescing demo.
    Coalesce(commands::coalesce::CoalesceArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = PledgeConfig::load(&cli.config)?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    match &cli.command {
        Commands::Init(args) => commands::init::run(args, &cli.config),
        Commands::Scenarios(args) => commands::scenarios::run(args, &config),
        Commands::Coalesce(args) => commands::coalesce::run(args, &config),
    }
}
