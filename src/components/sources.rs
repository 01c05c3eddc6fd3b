//! Independent sources: batteries, bench supplies, microcontroller rails.

use serde::{Deserialize, Serialize};

use crate::circuit::{ComponentId, NodeKey};

/// A battery or single cell.
///
/// Modeled as an ideal voltage source in series with its internal
/// resistance, which lands on the D diagonal of the MNA system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    pub id: ComponentId,
    pub nodes: [NodeKey; 2], // [positive, negative]
    pub voltage: f64,
    pub internal_resistance: f64,
}

impl Battery {
    /// Internal resistance of a fresh 9V battery.
    pub const NINE_VOLT_RESISTANCE: f64 = 1.45;
    /// Internal resistance of a fresh AA cell.
    pub const AA_CELL_RESISTANCE: f64 = 0.3;

    /// Create a battery with an explicit voltage and internal resistance.
    pub fn new(
        id: impl Into<ComponentId>,
        nodes: [NodeKey; 2],
        voltage: f64,
        internal_resistance: f64,
    ) -> Self {
        Self {
            id: id.into(),
            nodes,
            voltage,
            internal_resistance,
        }
    }

    /// A 9V battery.
    pub fn nine_volt(id: impl Into<ComponentId>, nodes: [NodeKey; 2]) -> Self {
        Self::new(id, nodes, 9.0, Self::NINE_VOLT_RESISTANCE)
    }

    /// A single 1.5V AA cell.
    pub fn aa_cell(id: impl Into<ComponentId>, nodes: [NodeKey; 2]) -> Self {
        Self::new(id, nodes, 1.5, Self::AA_CELL_RESISTANCE)
    }

    pub fn positive(&self) -> &NodeKey {
        &self.nodes[0]
    }

    pub fn negative(&self) -> &NodeKey {
        &self.nodes[1]
    }
}

/// Regulation mode a bench supply ended up in for one solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SupplyMode {
    /// Output disabled
    Off,
    /// Constant voltage: holding the set point below the current limit
    Cv,
    /// Constant current: the load asked for more than the limit
    Cc,
}

/// A bench power supply with a voltage set point and a current limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSupply {
    pub id: ComponentId,
    pub nodes: [NodeKey; 2], // [positive, negative]
    /// Voltage set point
    pub voltage: f64,
    /// Current limit in amperes
    pub current_limit: f64,
    /// Whether the output is enabled
    pub on: bool,
}

impl PowerSupply {
    /// Output resistance while regulating voltage.
    pub const INTERNAL_RESISTANCE: f64 = 0.01;

    /// Create a new, switched-on power supply.
    pub fn new(
        id: impl Into<ComponentId>,
        nodes: [NodeKey; 2],
        voltage: f64,
        current_limit: f64,
    ) -> Self {
        Self {
            id: id.into(),
            nodes,
            voltage,
            current_limit,
            on: true,
        }
    }

    /// The current limit, never negative.
    pub fn limit(&self) -> f64 {
        if self.current_limit.is_finite() {
            self.current_limit.max(0.0)
        } else {
            f64::INFINITY
        }
    }
}

/// What a microcontroller pin is wired to on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "role", content = "gpio")]
pub enum PinRole {
    /// One of the GND pins (all tied together on the board)
    Ground,
    /// One of the 3.3V output pins (all tied together on the board)
    Power3v3,
    /// A general purpose digital pin
    Digital(u8),
    /// A pin the solver does not model (reset, analog reference, ...)
    NoConnect,
}

/// A microcontroller board seen from its header pins.
///
/// When plugged in, the board's regulator drives its 3.3V pins against GND,
/// and every digital pin the running program holds high behaves as a weak
/// 3.3V source against GND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Microcontroller {
    pub id: ComponentId,
    pub nodes: Vec<NodeKey>,
    /// Role of each pin, parallel to `nodes`
    pub pin_roles: Vec<PinRole>,
    /// Digital pins the program is currently driving high
    #[serde(default)]
    pub high_pins: Vec<u8>,
}

impl Microcontroller {
    /// Regulated rail voltage.
    pub const RAIL_VOLTAGE: f64 = 3.3;
    /// Output resistance of the 3.3V regulator.
    pub const RAIL_RESISTANCE: f64 = 0.5;
    /// Output resistance of a digital pin driven high.
    pub const PIN_RESISTANCE: f64 = 25.0;
    /// Fewest pins a board may expose.
    pub const MIN_PINS: usize = 2;
    /// Most pins a board may expose.
    pub const MAX_PINS: usize = 25;

    /// Create a microcontroller from its pin list.
    pub fn new(id: impl Into<ComponentId>, pins: Vec<(NodeKey, PinRole)>) -> Self {
        let (nodes, pin_roles) = pins.into_iter().unzip();
        Self {
            id: id.into(),
            nodes,
            pin_roles,
            high_pins: Vec::new(),
        }
    }

    /// Drive a digital pin high or low.
    pub fn set_output(&mut self, gpio: u8, high: bool) {
        self.high_pins.retain(|&p| p != gpio);
        if high {
            self.high_pins.push(gpio);
        }
    }

    /// Whether the program is driving a digital pin high.
    pub fn is_driven_high(&self, gpio: u8) -> bool {
        self.high_pins.contains(&gpio)
    }

    /// Terminal indices of every pin with the given role.
    pub fn pins_with_role(&self, role: PinRole) -> impl Iterator<Item = usize> + '_ {
        self.pin_roles
            .iter()
            .enumerate()
            .filter(move |(_, r)| **r == role)
            .map(|(i, _)| i)
    }

    /// Terminal indices of digital pins currently driven high.
    pub fn high_pin_terminals(&self) -> impl Iterator<Item = usize> + '_ {
        self.pin_roles
            .iter()
            .enumerate()
            .filter_map(|(i, role)| match role {
                PinRole::Digital(gpio) if self.is_driven_high(*gpio) => Some(i),
                _ => None,
            })
    }
}
