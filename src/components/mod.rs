//! Component models for circuit simulation.
//!
//! This module provides models for all supported breadboard parts:
//! - Linear: Resistor, Photoresistor, Lightbulb
//! - Sources: Battery, PowerSupply, Microcontroller
//! - Nonlinear: Led, RgbLed
//! - Controls: Potentiometer, SlideSwitch, Pushbutton
//! - Instruments: Multimeter
//!
//! LEDs also carry a persistent [`LedRuntimeState`] driven by the
//! [`thermal`] state machine.

mod controls;
mod diode;
mod linear;
mod meter;
mod sources;
pub mod thermal;

pub use controls::{Potentiometer, Pushbutton, SlideSwitch, SwitchPosition};
pub use diode::{CommonTerminal, Led, LedColor, LedParams, RgbChannel, RgbLed};
pub use linear::{Lightbulb, Photoresistor, Resistor, MIN_RESISTANCE};
pub use meter::{MeterMode, Multimeter};
pub use sources::{Battery, Microcontroller, PinRole, PowerSupply, SupplyMode};
pub use thermal::{
    advance_runtime, ElectricalInputs, FailureReason, LedRuntimeState, ThermalParams, VisualState,
};

use serde::{Deserialize, Serialize};

use crate::circuit::{ComponentId, NodeKey};

/// A breadboard component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Resistor(Resistor),
    Battery(Battery),
    Potentiometer(Potentiometer),
    Led(Led),
    RgbLed(RgbLed),
    SlideSwitch(SlideSwitch),
    Pushbutton(Pushbutton),
    Multimeter(Multimeter),
    PowerSupply(PowerSupply),
    Microcontroller(Microcontroller),
    Photoresistor(Photoresistor),
    Lightbulb(Lightbulb),
}

impl Component {
    /// Get the component ID.
    pub fn id(&self) -> &ComponentId {
        match self {
            Component::Resistor(c) => &c.id,
            Component::Battery(c) => &c.id,
            Component::Potentiometer(c) => &c.id,
            Component::Led(c) => &c.id,
            Component::RgbLed(c) => &c.id,
            Component::SlideSwitch(c) => &c.id,
            Component::Pushbutton(c) => &c.id,
            Component::Multimeter(c) => &c.id,
            Component::PowerSupply(c) => &c.id,
            Component::Microcontroller(c) => &c.id,
            Component::Photoresistor(c) => &c.id,
            Component::Lightbulb(c) => &c.id,
        }
    }

    /// Get the terminal nodes, in the kind's fixed terminal order.
    pub fn terminals(&self) -> &[NodeKey] {
        match self {
            Component::Resistor(c) => &c.nodes,
            Component::Battery(c) => &c.nodes,
            Component::Potentiometer(c) => &c.nodes,
            Component::Led(c) => &c.nodes,
            Component::RgbLed(c) => &c.nodes,
            Component::SlideSwitch(c) => &c.nodes,
            Component::Pushbutton(c) => &c.nodes,
            Component::Multimeter(c) => &c.nodes,
            Component::PowerSupply(c) => &c.nodes,
            Component::Microcontroller(c) => &c.nodes,
            Component::Photoresistor(c) => &c.nodes,
            Component::Lightbulb(c) => &c.nodes,
        }
    }

    /// Short kind name, used in logs and validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Resistor(_) => "resistor",
            Component::Battery(_) => "battery",
            Component::Potentiometer(_) => "potentiometer",
            Component::Led(_) => "led",
            Component::RgbLed(_) => "rgb_led",
            Component::SlideSwitch(_) => "slide_switch",
            Component::Pushbutton(_) => "pushbutton",
            Component::Multimeter(_) => "multimeter",
            Component::PowerSupply(_) => "power_supply",
            Component::Microcontroller(_) => "microcontroller",
            Component::Photoresistor(_) => "photoresistor",
            Component::Lightbulb(_) => "lightbulb",
        }
    }

    /// Terminal pairs that the hardware ties together.
    ///
    /// These are merged into one net during topology reduction whenever both
    /// terminals are wired.
    pub fn tied_terminals(&self) -> Vec<(usize, usize)> {
        match self {
            Component::Pushbutton(_) => Pushbutton::TIED_PAIRS.to_vec(),
            Component::SlideSwitch(s) => vec![(SlideSwitch::COMMON, s.selected_throw())],
            Component::Microcontroller(m) => {
                let mut pairs = Vec::new();
                for role in [PinRole::Ground, PinRole::Power3v3] {
                    let pins: Vec<usize> = m.pins_with_role(role).collect();
                    if let Some((&first, rest)) = pins.split_first() {
                        pairs.extend(rest.iter().map(|&other| (first, other)));
                    }
                }
                pairs
            }
            _ => Vec::new(),
        }
    }

    /// Whether all terminals of this component belong to one subcircuit.
    ///
    /// A microcontroller's pins are independent of each other except for
    /// the tied rails, so it never joins nets on its own.
    pub fn joins_terminals(&self) -> bool {
        !matches!(self, Component::Microcontroller(_))
    }

    /// Give LEDs deserialized without a seed one derived from their id.
    pub fn seed_runtime(&mut self) {
        match self {
            Component::Led(led) if led.runtime.seed == 0 => {
                led.runtime.seed = LedRuntimeState::seed_for(led.id.as_str(), 0);
            }
            Component::RgbLed(led) => {
                for ch in RgbChannel::ALL {
                    let state = &mut led.runtime[ch.index()];
                    if state.seed == 0 {
                        state.seed = LedRuntimeState::seed_for(led.id.as_str(), ch.index() as u64 + 1);
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_json_is_tagged_by_type() {
        let json = r#"{"type":"resistor","id":"R1","nodes":["a","b"],"resistance":220.0}"#;
        let c: Component = serde_json::from_str(json).unwrap();
        assert_eq!(c.kind(), "resistor");
        assert_eq!(c.id().as_str(), "R1");
        assert_eq!(c.terminals().len(), 2);
    }

    #[test]
    fn test_led_without_runtime_gets_seeded() {
        let json = r#"{"type":"led","id":"LED1","nodes":["a","k"],"color":"red"}"#;
        let mut c: Component = serde_json::from_str(json).unwrap();
        c.seed_runtime();
        match c {
            Component::Led(led) => {
                assert_eq!(led.runtime.seed, LedRuntimeState::seed_for("LED1", 0));
            }
            other => panic!("unexpected component {other:?}"),
        }
    }

    #[test]
    fn test_microcontroller_rails_are_tied() {
        let mcu = Microcontroller::new(
            "U1",
            vec![
                (NodeKey::from("g1"), PinRole::Ground),
                (NodeKey::from("v1"), PinRole::Power3v3),
                (NodeKey::from("g2"), PinRole::Ground),
                (NodeKey::from("v2"), PinRole::Power3v3),
                (NodeKey::from("g3"), PinRole::Ground),
            ],
        );
        let c = Component::Microcontroller(mcu);
        assert_eq!(c.tied_terminals(), vec![(0, 2), (0, 4), (1, 3)]);
        assert!(!c.joins_terminals());
    }
}
