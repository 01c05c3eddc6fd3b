//! Error types for the Breadboard circuit solver.
//!
//! This module provides a unified error type [`BreadboardError`] covering
//! snapshot loading and validation, and the numerical failures the solver
//! reports internally. [`crate::solve`] itself never returns an error: a
//! failed subcircuit degrades to zeroed results instead.

use thiserror::Error;

/// Result type alias using [`BreadboardError`].
pub type Result<T> = std::result::Result<T, BreadboardError>;

/// Unified error type for all Breadboard operations.
#[derive(Error, Debug)]
pub enum BreadboardError {
    // ============ Snapshot Validation Errors ============
    /// Invalid component definition
    #[error("Invalid component '{id}': {message}")]
    InvalidComponent { id: String, message: String },

    /// Duplicate component id
    #[error("Duplicate component id '{id}'")]
    DuplicateComponent { id: String },

    /// Wire that cannot be part of a circuit
    #[error("Invalid wire {index} ({from} -> {to}): {message}")]
    InvalidWire {
        index: usize,
        from: String,
        to: String,
        message: String,
    },

    // ============ Simulation Errors ============
    /// Matrix is singular and cannot be solved
    #[error("Singular matrix at elimination step {step} - circuit has no unique solution")]
    SingularMatrix { step: usize },

    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },

    // ============ I/O Errors ============
    /// Error reading a snapshot file
    #[error("Failed to read snapshot file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot JSON could not be decoded or encoded
    #[error("Malformed circuit snapshot: {source}")]
    SnapshotFormat {
        #[source]
        source: serde_json::Error,
    },
}

impl BreadboardError {
    /// Create an invalid component error
    pub fn invalid_component(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidComponent {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid simulation parameter error
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::InvalidSimulationParam {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for BreadboardError {
    fn from(source: serde_json::Error) -> Self {
        Self::SnapshotFormat { source }
    }
}
