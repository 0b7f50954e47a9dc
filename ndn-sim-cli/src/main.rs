use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod scenario;
mod utils;

/// ndn-sim Command Line Interface
#[derive(Parser)]
#[clap(name = "ndnsim", author, version, about)]
struct Cli {
    /// Sets the level of verbosity
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Subcommand to execute
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file (TOML, JSON or YAML)
    Run {
        /// Path to the scenario
        scenario: PathBuf,

        /// Print packet captures as JSON lines
        #[clap(long)]
        captures: bool,

        /// Print per-node counters as JSON
        #[clap(long)]
        stats: bool,

        /// Print every node's FIB at the end
        #[clap(long)]
        fib: bool,
    },

    /// Ping between two simulated nodes
    Ping {
        /// One-way link latency in milliseconds
        #[clap(short, long, default_value = "10")]
        latency: u64,

        /// Link loss probability in [0, 1]
        #[clap(long, default_value = "0.0")]
        loss: f64,

        /// Number of pings to send
        #[clap(short, long, default_value = "4")]
        count: u32,

        /// Interest lifetime in milliseconds
        #[clap(short, long, default_value = "1000")]
        timeout: u64,

        /// Seed for loss decisions
        #[clap(long, default_value = "0")]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(
        if cli.verbose { "debug" } else { "warn" }
    )).init();

    // Execute the specified command
    match cli.command {
        Commands::Run { scenario, captures, stats, fib } => {
            let options = commands::run::RunOptions { captures, stats, fib };
            commands::run::run_scenario(&scenario, options).await?;
        }
        Commands::Ping { latency, loss, count, timeout, seed } => {
            commands::ping::run_ping(latency, loss, count, timeout, seed).await?;
        }
    }

    Ok(())
}
