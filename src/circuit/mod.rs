//! Circuit topology and snapshot handling.
//!
//! This module turns the editor's view of a circuit (components with named
//! terminals, plus wires between node keys) into the solver's view: nets
//! (node equivalence classes) grouped into electrically isolated
//! [`Subcircuit`]s.

mod graph;
mod snapshot;
mod types;
mod validate;

pub use graph::{Circuit, NodeEquivalenceMap, Subcircuit};
pub use snapshot::Snapshot;
pub use types::*;
pub use validate::validate_snapshot;
