#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a scenario headless and prints a summary.

mod config;
mod pool;
mod simulation;

use std::{path::PathBuf, time::Duration};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use log::info;

use crate::{config::Scenario, simulation::Simulation};

const DEFAULT_SEED: u64 = 0x5eed;

#[derive(Parser, Debug)]
#[command(name = "simulacra")]
#[command(about = "Run an augment and wave scenario without rendering")]
struct Args {
    /// Scenario file describing tiers, augments, waves and scripted triggers
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/arena.toml"))]
    scenario: PathBuf,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 30.0)]
    seconds: f32,

    /// Fixed time step in milliseconds
    #[arg(long = "dt-ms", default_value_t = 16)]
    dt_ms: u64,

    /// Seed for tier draws, overriding the scenario seed
    #[arg(long)]
    seed: Option<u64>,

    /// Log every event
    #[arg(short, long)]
    verbose: bool,
}

/// Entry point for the headless simulation.
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    ensure!(args.dt_ms > 0, "--dt-ms must be positive");
    let duration = Duration::try_from_secs_f32(args.seconds)
        .with_context(|| format!("invalid --seconds value {}", args.seconds))?;

    let scenario = Scenario::load(&args.scenario)?;
    let seed = args.seed.or(scenario.seed).unwrap_or(DEFAULT_SEED);
    info!("running {} with seed {seed}", args.scenario.display());

    let mut simulation = Simulation::new(scenario, seed)?;
    let report = simulation.run(duration, Duration::from_millis(args.dt_ms));
    println!("{report}");
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}
