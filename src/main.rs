//! Breadboard - Circuit Snapshot Solver
//!
//! Solves a JSON circuit snapshot, optionally advancing LED state over
//! several ticks, and prints the per-component results as JSON.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug breadboard circuit.json --ticks 20 --dt 0.05 --pretty
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use breadboard_core::{
    error::{BreadboardError, Result},
    solver::SolveReport,
    validate_snapshot, Simulator, Snapshot, SolvedComponent, SolverConfig,
};

/// Breadboard circuit solver
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the circuit snapshot (.json)
    #[arg(value_name = "SNAPSHOT")]
    snapshot: PathBuf,

    /// Number of ticks to simulate
    #[arg(short, long, default_value_t = 1)]
    ticks: u32,

    /// Seconds per tick
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f64,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Maximum LED on/off passes per subcircuit
    #[arg(long, default_value_t = breadboard_core::solver::MAX_ITERATIONS)]
    max_iterations: usize,
}

/// What gets printed after the last tick.
#[derive(Serialize)]
struct Output<'a> {
    time: f64,
    report: &'a SolveReport,
    components: &'a [SolvedComponent],
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if !(args.dt.is_finite() && args.dt >= 0.0) {
        return Err(BreadboardError::invalid_param(format!(
            "tick length must be a non-negative number of seconds, got {}",
            args.dt
        )));
    }
    if args.max_iterations == 0 {
        return Err(BreadboardError::invalid_param("max iterations must be at least 1"));
    }

    // Load and validate the snapshot
    let snapshot = Snapshot::load(&args.snapshot)?;
    validate_snapshot(&snapshot.components, &snapshot.wires)?;

    let config = SolverConfig::new().with_max_iterations(args.max_iterations);
    let mut simulator = Simulator::with_config(snapshot, config);

    // Always solve at least once so there is something to print
    let mut now = 0.0;
    for _ in 0..args.ticks.max(1) {
        now += args.dt;
        simulator.tick(args.dt, now);
    }

    let output = Output {
        time: now,
        report: simulator.last_report(),
        components: simulator.results(),
    };
    let json = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{json}");

    Ok(())
}
