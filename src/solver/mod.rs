//! DC operating-point solver.
//!
//! Every tick the circuit is reduced to isolated subcircuits and each one is
//! solved on its own with Modified Nodal Analysis:
//!
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G holds the conductances between nets
//! - B, C connect voltage sources to their nets
//! - D holds minus each source's internal resistance
//! - v is the vector of net voltages (ground excluded)
//! - j is the vector of source branch currents
//! - i is the sum of current injections into each net
//! - e is the vector of source voltages
//!
//! LEDs are piecewise-linear, so the system is re-solved until the set of
//! conducting LEDs stops changing (see [`convergence`]). Bench supplies that
//! would exceed their current limit are then re-solved as current sources.

mod classify;
pub mod convergence;
mod extract;
mod mna;
mod simulator;
mod stamp;

pub use classify::{SourceEntry, SourceOrigin};
pub use convergence::Convergence;
pub use extract::{Computed, Detail, DiodeReading, MeterReading};
pub use mna::MnaMatrix;
pub use simulator::{solve_with_report, Simulator, SolveReport, SolvedComponent};

use crate::components::ThermalParams;

/// Maximum on/off passes per subcircuit.
pub const MAX_ITERATIONS: usize = 8;

/// Conductance from every net to ground, in siemens.
pub const LEAKAGE_CONDUCTANCE: f64 = 1e-12;

/// Pivots smaller than this mean the system has no unique solution.
pub const PIVOT_EPSILON: f64 = 1e-14;

/// Configuration for the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Maximum on/off passes for LEDs.
    pub max_iterations: usize,
    /// Leakage conductance added to every net (siemens).
    pub leakage: f64,
    /// Smallest acceptable pivot during elimination.
    pub pivot_epsilon: f64,
    /// LED heating and failure constants.
    pub thermal: ThermalParams,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            leakage: LEAKAGE_CONDUCTANCE,
            pivot_epsilon: PIVOT_EPSILON,
            thermal: ThermalParams::default(),
        }
    }
}

impl SolverConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum on/off passes.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the leakage conductance (in siemens).
    ///
    /// Larger values hide floating nets more aggressively but bias
    /// high-impedance readings such as the ohmmeter.
    pub fn with_leakage(mut self, leakage: f64) -> Self {
        self.leakage = leakage;
        self
    }

    /// Set the singular-pivot threshold.
    pub fn with_pivot_epsilon(mut self, pivot_epsilon: f64) -> Self {
        self.pivot_epsilon = pivot_epsilon;
        self
    }

    /// Set the LED thermal constants.
    pub fn with_thermal(mut self, thermal: ThermalParams) -> Self {
        self.thermal = thermal;
        self
    }
}
