//! WASM bindings for Breadboard Core.
//!
//! This module provides JavaScript-friendly bindings for the browser
//! front end, which owns the board layout and calls in once per frame.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmBreadboard } from 'breadboard_core';
//!
//! await init();
//!
//! const board = new WasmBreadboard(JSON.stringify({
//!   components: [
//!     { type: "battery", id: "B1", nodes: ["b+", "b-"], voltage: 9, internal_resistance: 1.45 },
//!     { type: "led", id: "LED1", nodes: ["a", "k"], color: "red" },
//!   ],
//!   wires: [{ from: "b+", to: "a" }, { from: "k", to: "b-" }],
//! }));
//!
//! // In the render loop:
//! const results = JSON.parse(board.tick(dt, now));
//! ```

use wasm_bindgen::prelude::*;

use crate::circuit::{validate_snapshot, Snapshot};
use crate::error::BreadboardError;
use crate::solver::{Simulator, SolverConfig};

/// Initialize the panic hook and console logging.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Warn);
}

fn to_js(err: BreadboardError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse(snapshot_json: &str) -> Result<Snapshot, JsValue> {
    let snapshot = Snapshot::from_json(snapshot_json).map_err(to_js)?;
    validate_snapshot(&snapshot.components, &snapshot.wires).map_err(to_js)?;
    Ok(snapshot)
}

/// WASM-compatible breadboard solver.
///
/// Wraps the native `Simulator`; snapshots and results cross the boundary
/// as JSON strings.
#[wasm_bindgen]
pub struct WasmBreadboard {
    simulator: Simulator,
}

#[wasm_bindgen]
impl WasmBreadboard {
    /// Create a new board from a snapshot JSON string.
    ///
    /// # Returns
    /// A new `WasmBreadboard` or an error if the snapshot is malformed or
    /// invalid.
    #[wasm_bindgen(constructor)]
    pub fn new(snapshot_json: &str) -> Result<WasmBreadboard, JsValue> {
        Self::with_max_iterations(snapshot_json, crate::solver::MAX_ITERATIONS)
    }

    /// Create a new board with a custom LED pass limit.
    #[wasm_bindgen]
    pub fn with_max_iterations(
        snapshot_json: &str,
        max_iterations: usize,
    ) -> Result<WasmBreadboard, JsValue> {
        let snapshot = parse(snapshot_json)?;
        let config = SolverConfig::new().with_max_iterations(max_iterations);
        Ok(WasmBreadboard {
            simulator: Simulator::with_config(snapshot, config),
        })
    }

    /// Replace the circuit after the user edited the board.
    ///
    /// LED runtime state travels inside the snapshot, so the host should
    /// start from `snapshot()` when editing.
    #[wasm_bindgen]
    pub fn load(&mut self, snapshot_json: &str) -> Result<(), JsValue> {
        let snapshot = parse(snapshot_json)?;
        self.simulator.load(snapshot);
        Ok(())
    }

    /// Solve the board, advance LEDs by `dt` seconds and return the results
    /// as a JSON array of `{ component, computed }`.
    #[wasm_bindgen]
    pub fn tick(&mut self, dt: f64, now: f64) -> Result<String, JsValue> {
        if !(dt.is_finite() && dt >= 0.0) {
            return Err(to_js(BreadboardError::invalid_param(format!(
                "tick length must be non-negative, got {dt}"
            ))));
        }
        let results = self.simulator.tick(dt, now);
        serde_json::to_string(results).map_err(|e| to_js(e.into()))
    }

    /// Current snapshot, including LED runtime state, as JSON.
    #[wasm_bindgen]
    pub fn snapshot(&self) -> Result<String, JsValue> {
        self.simulator.snapshot().to_json(false).map_err(to_js)
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
