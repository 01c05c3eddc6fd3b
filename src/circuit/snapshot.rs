//! JSON snapshot of a circuit, as exchanged with the host application.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Wire;
use crate::components::Component;
use crate::error::{BreadboardError, Result};

/// Everything the solver needs for one tick: components and wires.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub components: Vec<Component>,
    #[serde(default)]
    pub wires: Vec<Wire>,
}

impl Snapshot {
    /// Decode a snapshot from JSON.
    ///
    /// LEDs saved without runtime state get a seed derived from their id.
    pub fn from_json(input: &str) -> Result<Self> {
        let mut snapshot: Snapshot = serde_json::from_str(input)?;
        for component in &mut snapshot.components {
            component.seed_runtime();
        }
        Ok(snapshot)
    }

    /// Read and decode a snapshot file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BreadboardError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Encode the snapshot as JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}
