//! LED models.
//!
//! A conducting LED is linearized as a threshold plus a series resistance:
//!   I = (V - Vf) / Rs    for V >= Vf
//!   I = 0                otherwise
//!
//! In MNA this is a Norton equivalent: a conductance G = 1/Rs between anode
//! and cathode plus a current source G * Vf pushing from cathode to anode.
//! Which branch applies is decided by the on/off fixed-point loop in
//! [`crate::solver::convergence`].

use serde::{Deserialize, Serialize};

use super::thermal::LedRuntimeState;
use crate::circuit::{ComponentId, NodeKey};

/// Electrical and rating parameters of one LED die.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedParams {
    /// Threshold voltage (Vf)
    pub forward_voltage: f64,
    /// Series resistance above threshold (Rs)
    pub series_resistance: f64,
    /// Rated continuous forward current
    pub max_current: f64,
    /// Rated continuous power dissipation
    pub max_power: f64,
}

impl LedParams {
    /// Get the conductance of the conducting branch.
    pub fn conductance(&self) -> f64 {
        1.0 / self.series_resistance
    }

    /// Get the Norton equivalent of the conducting branch.
    /// Returns (conductance G, injected current G * Vf).
    pub fn norton(&self) -> (f64, f64) {
        let g = self.conductance();
        (g, g * self.forward_voltage)
    }

    /// Forward current for a given bias while conducting.
    pub fn conducting_current(&self, bias: f64) -> f64 {
        (bias - self.forward_voltage) * self.conductance()
    }
}

/// LED body color, which selects the die parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    White,
}

impl LedColor {
    /// Get the parameters for this color.
    pub fn params(&self) -> LedParams {
        // Red: 9V battery straight across gives (9 - 1.4) / (1.45 + 6.856) ~ 0.915 A
        let (forward_voltage, series_resistance) = match self {
            LedColor::Red => (1.4, 6.856),
            LedColor::Orange => (1.5, 6.6),
            LedColor::Yellow => (1.6, 6.3),
            LedColor::Green => (1.9, 5.7),
            LedColor::Blue => (2.5, 4.9),
            LedColor::White => (2.6, 4.7),
        };
        LedParams {
            forward_voltage,
            series_resistance,
            max_current: 0.03,
            max_power: 0.1,
        }
    }
}

/// A single-color LED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Led {
    pub id: ComponentId,
    pub nodes: [NodeKey; 2], // [anode, cathode]
    pub color: LedColor,
    #[serde(default)]
    pub runtime: LedRuntimeState,
}

impl Led {
    /// Create a new LED with fresh runtime state seeded from its id.
    pub fn new(id: impl Into<ComponentId>, nodes: [NodeKey; 2], color: LedColor) -> Self {
        let id = id.into();
        let runtime = LedRuntimeState::new(LedRuntimeState::seed_for(id.as_str(), 0));
        Self {
            id,
            nodes,
            color,
            runtime,
        }
    }

    pub fn params(&self) -> LedParams {
        self.color.params()
    }

    pub fn anode(&self) -> &NodeKey {
        &self.nodes[0]
    }

    pub fn cathode(&self) -> &NodeKey {
        &self.nodes[1]
    }

    pub fn is_exploded(&self) -> bool {
        self.runtime.exploded
    }
}

/// Which terminal the three dies of an RGB LED share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommonTerminal {
    Cathode,
    Anode,
}

/// One die of an RGB LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RgbChannel {
    Red = 0,
    Green = 1,
    Blue = 2,
}

impl RgbChannel {
    pub const ALL: [RgbChannel; 3] = [RgbChannel::Red, RgbChannel::Green, RgbChannel::Blue];

    /// Index into per-channel arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Terminal index of this channel's own leg.
    pub fn terminal(self) -> usize {
        match self {
            RgbChannel::Red => 0,
            RgbChannel::Green => 2,
            RgbChannel::Blue => 3,
        }
    }

    /// Die color behind this channel.
    pub fn color(self) -> LedColor {
        match self {
            RgbChannel::Red => LedColor::Red,
            RgbChannel::Green => LedColor::Green,
            RgbChannel::Blue => LedColor::Blue,
        }
    }
}

/// A four-leg RGB LED: three dies sharing one common leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RgbLed {
    pub id: ComponentId,
    pub nodes: [NodeKey; 4], // [red, common, green, blue]
    pub common: CommonTerminal,
    #[serde(default)]
    pub runtime: [LedRuntimeState; 3],
}

impl RgbLed {
    /// Terminal index of the shared leg.
    pub const COMMON: usize = 1;

    /// Create a new RGB LED with per-channel runtime state.
    pub fn new(id: impl Into<ComponentId>, nodes: [NodeKey; 4], common: CommonTerminal) -> Self {
        let id = id.into();
        let runtime = RgbChannel::ALL
            .map(|ch| LedRuntimeState::new(LedRuntimeState::seed_for(id.as_str(), ch.index() as u64 + 1)));
        Self {
            id,
            nodes,
            common,
            runtime,
        }
    }

    pub fn channel_params(&self, channel: RgbChannel) -> LedParams {
        channel.color().params()
    }

    /// Terminal indices (anode, cathode) of a channel's die.
    pub fn channel_terminals(&self, channel: RgbChannel) -> (usize, usize) {
        match self.common {
            CommonTerminal::Cathode => (channel.terminal(), Self::COMMON),
            CommonTerminal::Anode => (Self::COMMON, channel.terminal()),
        }
    }

    pub fn is_channel_exploded(&self, channel: RgbChannel) -> bool {
        self.runtime[channel.index()].exploded
    }
}
