//! Snapshot validation.

use std::collections::HashSet;

use crate::components::{Component, Microcontroller};
use crate::error::{BreadboardError, Result};

use super::Wire;

/// Validate a snapshot before handing it to the solver.
///
/// Checks:
/// - Component ids are unique
/// - Resistances are finite and positive
/// - Potentiometer ratios lie in [0, 1]
/// - Microcontrollers expose 2..=25 pins, each with a role
/// - No wire connects a node to itself
///
/// The solver tolerates all of these (it clamps or floors values), so this
/// is for hosts that want to reject bad input early.
pub fn validate_snapshot(components: &[Component], wires: &[Wire]) -> Result<()> {
    let mut seen = HashSet::new();
    for component in components {
        let id = component.id();
        if !seen.insert(id) {
            return Err(BreadboardError::DuplicateComponent { id: id.to_string() });
        }

        match component {
            Component::Resistor(r) => check_resistance(id.as_str(), r.resistance)?,
            Component::Potentiometer(p) => {
                check_resistance(id.as_str(), p.resistance)?;
                if !(0.0..=1.0).contains(&p.ratio) {
                    return Err(BreadboardError::invalid_component(
                        id.as_str(),
                        format!("wiper ratio {} is outside [0, 1]", p.ratio),
                    ));
                }
            }
            Component::Battery(b) => check_resistance(id.as_str(), b.internal_resistance)?,
            Component::Microcontroller(m) => {
                let pins = m.nodes.len();
                if !(Microcontroller::MIN_PINS..=Microcontroller::MAX_PINS).contains(&pins) {
                    return Err(BreadboardError::invalid_component(
                        id.as_str(),
                        format!(
                            "microcontroller has {pins} pins, expected {}..={}",
                            Microcontroller::MIN_PINS,
                            Microcontroller::MAX_PINS
                        ),
                    ));
                }
                if m.pin_roles.len() != pins {
                    return Err(BreadboardError::invalid_component(
                        id.as_str(),
                        format!("{} pin roles for {pins} pins", m.pin_roles.len()),
                    ));
                }
            }
            _ => {}
        }
    }

    for (index, wire) in wires.iter().enumerate() {
        if wire.from == wire.to {
            return Err(BreadboardError::InvalidWire {
                index,
                from: wire.from.to_string(),
                to: wire.to.to_string(),
                message: "wire connects a node to itself".to_string(),
            });
        }
    }

    Ok(())
}

fn check_resistance(id: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(BreadboardError::invalid_component(
            id,
            format!("resistance must be finite and positive, got {value}"),
        ))
    }
}
