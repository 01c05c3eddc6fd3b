//! Digital multimeter.

use serde::{Deserialize, Serialize};

use crate::circuit::{ComponentId, NodeKey};

/// Measurement function selected on the dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterMode {
    Off,
    #[default]
    Voltage,
    Current,
    Resistance,
}

/// A two-probe multimeter.
///
/// - Voltage: a 10 MOhm shunt across the probes
/// - Current: a 50 mOhm shunt in series with the probes
/// - Resistance: pushes a 1 mA test current through an unpowered circuit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multimeter {
    pub id: ComponentId,
    pub nodes: [NodeKey; 2], // [positive (red), negative (black)]
    #[serde(default)]
    pub mode: MeterMode,
}

impl Multimeter {
    /// Input impedance in voltage mode.
    pub const VOLTAGE_SHUNT: f64 = 10e6;
    /// Shunt resistance in current mode.
    pub const CURRENT_SHUNT: f64 = 0.05;
    /// Test current in resistance mode.
    pub const TEST_CURRENT: f64 = 1e-3;
    /// Readings above this are shown as open circuit.
    pub const OPEN_CIRCUIT: f64 = 100e6;

    /// Create a new multimeter.
    pub fn new(id: impl Into<ComponentId>, nodes: [NodeKey; 2], mode: MeterMode) -> Self {
        Self {
            id: id.into(),
            nodes,
            mode,
        }
    }

    /// Shunt conductance across the probes, if the mode has one.
    pub fn shunt_conductance(&self) -> Option<f64> {
        match self.mode {
            MeterMode::Voltage => Some(1.0 / Self::VOLTAGE_SHUNT),
            MeterMode::Current => Some(1.0 / Self::CURRENT_SHUNT),
            MeterMode::Off | MeterMode::Resistance => None,
        }
    }

    /// Convert a probe voltage from a test-current solve into ohms.
    pub fn ohms(probe_voltage: f64) -> f64 {
        let r = probe_voltage / Self::TEST_CURRENT;
        if !r.is_finite() || r > Self::OPEN_CIRCUIT {
            f64::INFINITY
        } else {
            r.max(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ohms_conversion() {
        assert!((Multimeter::ohms(1.0) - 1000.0).abs() < 1e-9);
        assert_eq!(Multimeter::ohms(1e9), f64::INFINITY);
        assert_eq!(Multimeter::ohms(-1e-15), 0.0);
    }

    #[test]
    fn test_shunts_by_mode() {
        let nodes = [NodeKey::from("p"), NodeKey::from("n")];
        let mut m = Multimeter::new("M1", nodes, MeterMode::Voltage);
        assert!((m.shunt_conductance().unwrap() - 1e-7).abs() < 1e-20);
        m.mode = MeterMode::Current;
        assert!((m.shunt_conductance().unwrap() - 20.0).abs() < 1e-9);
        m.mode = MeterMode::Resistance;
        assert!(m.shunt_conductance().is_none());
    }
}
