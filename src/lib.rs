//! # Breadboard Core
//!
//! A DC circuit solver for an interactive electronics breadboard.
//!
//! This library provides:
//! - Topology reduction of wires and hardware-tied pins into nets
//! - Modified Nodal Analysis (MNA) of every isolated subcircuit
//! - Piecewise-linear LEDs solved by an on/off fixed-point loop
//! - Bench supplies that fall back to constant current at their limit
//! - A seeded thermal model that lets overdriven LEDs heat up and explode
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`circuit`] - Node identities, wires, nets, subcircuits, snapshots
//! - [`components`] - Component models (resistors, sources, LEDs, meters, etc.)
//! - [`solver`] - MNA assembly, LED convergence and result extraction
//! - [`error`] - Error types
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! breadboard circuit.json --ticks 20 --dt 0.05 --pretty
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use breadboard_core::{solve, Snapshot};
//!
//! let snapshot = Snapshot::from_json(r#"{"components": [], "wires": []}"#)?;
//! for solved in solve(&snapshot.components, &snapshot.wires) {
//!     println!("{}: {:.3} V", solved.component.id(), solved.computed.voltage);
//! }
//! # Ok::<(), breadboard_core::BreadboardError>(())
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { WasmBreadboard } from 'breadboard_core';
//!
//! const board = new WasmBreadboard(snapshotJson);
//! const results = JSON.parse(board.tick(1 / 60, performance.now() / 1000));
//! ```
//!
//! ## Solve Method
//!
//! Each call is a fresh steady-state solve; nothing but LED runtime state
//! carries over between ticks:
//!
//! 1. Union wires and tied pins into nets, then split into subcircuits
//! 2. Classify independent sources and pick a ground per subcircuit
//! 3. Assemble and solve Ax = z, re-solving until LED states settle
//! 4. Re-solve overloaded supplies as current sources
//! 5. Read back per-component voltages, currents and readings

pub mod circuit;
pub mod components;
pub mod error;
pub mod solver;

// Re-export main types for convenience
pub use circuit::{validate_snapshot, Snapshot, Wire};
pub use components::{advance_runtime, Component};
pub use error::{BreadboardError, Result};
pub use solver::{Computed, Simulator, SolvedComponent, SolverConfig};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmBreadboard;

/// Solve a circuit snapshot with the default configuration.
///
/// Returns one entry per component, in input order. Components in
/// subcircuits without a unique solution get zeroed results.
pub fn solve(components: &[Component], wires: &[Wire]) -> Vec<SolvedComponent> {
    solve_with_config(components, wires, &SolverConfig::default())
}

/// Solve a circuit snapshot with a custom configuration.
pub fn solve_with_config(
    components: &[Component],
    wires: &[Wire],
    config: &SolverConfig,
) -> Vec<SolvedComponent> {
    solver::solve_with_report(components, wires, config).0
}
