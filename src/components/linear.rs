//! Linear passive components: Resistor, Photoresistor, Lightbulb.

use serde::{Deserialize, Serialize};

use crate::circuit::{ComponentId, NodeKey};

/// Smallest resistance a passive part is allowed to present.
pub const MIN_RESISTANCE: f64 = 1e-6;

/// A fixed resistor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resistor {
    pub id: ComponentId,
    pub nodes: [NodeKey; 2],
    pub resistance: f64,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(id: impl Into<ComponentId>, nodes: [NodeKey; 2], resistance: f64) -> Self {
        Self {
            id: id.into(),
            nodes,
            resistance,
        }
    }

    /// Get the effective resistance, floored to avoid singular stamps.
    pub fn effective_resistance(&self) -> f64 {
        self.resistance.max(MIN_RESISTANCE)
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / self.effective_resistance()
    }
}

/// A light-dependent resistor.
///
/// Resistance falls log-linearly from [`Photoresistor::R_DARK`] at light
/// level 0 to [`Photoresistor::R_BRIGHT`] at light level 1:
///   R = R_dark * (R_bright / R_dark) ^ level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photoresistor {
    pub id: ComponentId,
    pub nodes: [NodeKey; 2],
    /// Ambient light level from 0.0 (dark) to 1.0 (bright)
    pub light_level: f64,
}

impl Photoresistor {
    /// Resistance in complete darkness.
    pub const R_DARK: f64 = 1e6;
    /// Resistance in full light.
    pub const R_BRIGHT: f64 = 1e3;

    /// Create a new photoresistor.
    pub fn new(id: impl Into<ComponentId>, nodes: [NodeKey; 2], light_level: f64) -> Self {
        Self {
            id: id.into(),
            nodes,
            light_level,
        }
    }

    /// Get the resistance at the current light level.
    pub fn resistance(&self) -> f64 {
        let level = if self.light_level.is_finite() {
            self.light_level.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self::R_DARK * (Self::R_BRIGHT / Self::R_DARK).powf(level)
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance()
    }
}

/// An incandescent lightbulb, modeled as a fixed hot-filament resistance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lightbulb {
    pub id: ComponentId,
    pub nodes: [NodeKey; 2],
}

impl Lightbulb {
    /// Filament resistance.
    pub const RESISTANCE: f64 = 48.0;
    /// Power at which the bulb reaches full brightness.
    pub const RATED_POWER: f64 = 0.75;

    /// Create a new lightbulb.
    pub fn new(id: impl Into<ComponentId>, nodes: [NodeKey; 2]) -> Self {
        Self {
            id: id.into(),
            nodes,
        }
    }

    /// Get the conductance (1/R).
    pub fn conductance(&self) -> f64 {
        1.0 / Self::RESISTANCE
    }

    /// Perceived brightness for a dissipated power, from 0.0 to 1.0.
    pub fn brightness(power: f64) -> f64 {
        (power.abs() / Self::RATED_POWER).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes() -> [NodeKey; 2] {
        [NodeKey::from("a"), NodeKey::from("b")]
    }

    #[test]
    fn test_resistor_conductance() {
        let r = Resistor::new("R1", nodes(), 1000.0);
        assert!((r.conductance() - 0.001).abs() < 1e-10);
    }

    #[test]
    fn test_zero_resistor_is_floored() {
        let r = Resistor::new("R1", nodes(), 0.0);
        assert!(r.conductance().is_finite());
    }

    #[test]
    fn test_photoresistor_curve_endpoints() {
        let mut ldr = Photoresistor::new("LDR1", nodes(), 0.0);
        assert!((ldr.resistance() - Photoresistor::R_DARK).abs() < 1e-6);

        ldr.light_level = 1.0;
        assert!((ldr.resistance() - Photoresistor::R_BRIGHT).abs() < 1e-6);

        // Halfway on a log scale is the geometric mean
        ldr.light_level = 0.5;
        let mid = (Photoresistor::R_DARK * Photoresistor::R_BRIGHT).sqrt();
        assert!((ldr.resistance() - mid).abs() / mid < 1e-9);
    }

    #[test]
    fn test_lightbulb_brightness_saturates() {
        assert_eq!(Lightbulb::brightness(0.0), 0.0);
        assert!((Lightbulb::brightness(0.375) - 0.5).abs() < 1e-12);
        assert_eq!(Lightbulb::brightness(10.0), 1.0);
    }
}
