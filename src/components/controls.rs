//! Control components: Potentiometer, SlideSwitch and Pushbutton.

use serde::{Deserialize, Serialize};

use crate::circuit::{ComponentId, NodeKey};

/// A potentiometer component.
///
/// Modeled as two resistors in series with a wiper tap:
///   a ----[R_aw]---- wiper ----[R_wb]---- b
///
/// where R_aw = (1 - ratio) * resistance
/// and   R_wb = ratio * resistance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Potentiometer {
    pub id: ComponentId,
    pub nodes: [NodeKey; 3], // [a, wiper, b]
    pub resistance: f64,
    /// Wiper position from 0.0 (at a) to 1.0 (at b)
    pub ratio: f64,
}

impl Potentiometer {
    /// Smallest resistance either segment may present.
    pub const MIN_SEGMENT: f64 = 0.1;

    /// Create a new potentiometer.
    pub fn new(id: impl Into<ComponentId>, nodes: [NodeKey; 3], resistance: f64, ratio: f64) -> Self {
        Self {
            id: id.into(),
            nodes,
            resistance,
            ratio,
        }
    }

    fn position(&self) -> f64 {
        if self.ratio.is_finite() {
            self.ratio.clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

    /// Get the total track resistance.
    pub fn total(&self) -> f64 {
        self.resistance.max(Self::MIN_SEGMENT)
    }

    /// Get the resistance from a to wiper.
    pub fn r_aw(&self) -> f64 {
        (self.total() * (1.0 - self.position())).max(Self::MIN_SEGMENT)
    }

    /// Get the resistance from wiper to b.
    pub fn r_wb(&self) -> f64 {
        (self.total() * self.position()).max(Self::MIN_SEGMENT)
    }

    pub fn a(&self) -> &NodeKey {
        &self.nodes[0]
    }

    pub fn wiper(&self) -> &NodeKey {
        &self.nodes[1]
    }

    pub fn b(&self) -> &NodeKey {
        &self.nodes[2]
    }
}

/// Which throw a slide switch connects to its common leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchPosition {
    #[default]
    A,
    B,
}

/// A single-pole double-throw slide switch.
///
/// The common leg is hard-wired to the selected throw, so the switch is
/// resolved during topology reduction rather than stamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideSwitch {
    pub id: ComponentId,
    pub nodes: [NodeKey; 3], // [throw_a, common, throw_b]
    #[serde(default)]
    pub position: SwitchPosition,
}

impl SlideSwitch {
    /// Terminal index of the common leg.
    pub const COMMON: usize = 1;

    /// Create a new slide switch.
    pub fn new(id: impl Into<ComponentId>, nodes: [NodeKey; 3], position: SwitchPosition) -> Self {
        Self {
            id: id.into(),
            nodes,
            position,
        }
    }

    /// Terminal index of the currently selected throw.
    pub fn selected_throw(&self) -> usize {
        match self.position {
            SwitchPosition::A => 0,
            SwitchPosition::B => 2,
        }
    }

    /// Flip the switch to the other throw.
    pub fn toggle(&mut self) {
        self.position = match self.position {
            SwitchPosition::A => SwitchPosition::B,
            SwitchPosition::B => SwitchPosition::A,
        };
    }
}

/// A four-leg tactile pushbutton.
///
/// Legs a1/a2 and b1/b2 are internally connected. Pressing the button
/// connects the a pair to the b pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pushbutton {
    pub id: ComponentId,
    pub nodes: [NodeKey; 4], // [a1, a2, b1, b2]
    #[serde(default)]
    pub pressed: bool,
}

impl Pushbutton {
    /// Resistance when pressed.
    pub const R_CLOSED: f64 = 0.01;
    /// Resistance when released.
    pub const R_OPEN: f64 = 1e9;
    /// Internally tied leg pairs.
    pub const TIED_PAIRS: [(usize, usize); 2] = [(0, 1), (2, 3)];

    /// Create a new, released pushbutton.
    pub fn new(id: impl Into<ComponentId>, nodes: [NodeKey; 4]) -> Self {
        Self {
            id: id.into(),
            nodes,
            pressed: false,
        }
    }

    /// Get the current resistance between the two pairs.
    pub fn resistance(&self) -> f64 {
        if self.pressed {
            Self::R_CLOSED
        } else {
            Self::R_OPEN
        }
    }

    /// Get the current conductance between the two pairs.
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance()
    }
}
