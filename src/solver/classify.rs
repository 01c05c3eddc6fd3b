//! Independent source classification for one subcircuit.

use crate::circuit::{Circuit, NetId, Subcircuit};
use crate::components::{Component, Microcontroller, PinRole, PowerSupply};

/// Where a source entry comes from on its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceOrigin {
    Battery,
    Supply,
    /// A microcontroller's 3.3V regulator
    Rail,
    /// A microcontroller digital pin driven high
    Pin,
}

/// One independent voltage source of a subcircuit.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    /// Index of the owning component
    pub component: usize,
    pub origin: SourceOrigin,
    /// Terminal indices on the owning component
    pub pos_terminal: usize,
    pub neg_terminal: usize,
    pub positive: NetId,
    pub negative: NetId,
    pub voltage: f64,
    pub resistance: f64,
    /// Current limit for bench supplies
    pub current_limit: Option<f64>,
}

/// List the independent sources of a subcircuit.
///
/// The order (component order, then pin order) fixes the branch rows of the
/// MNA system and is stable for a given snapshot.
pub fn classify_sources(circuit: &Circuit<'_>, sub: &Subcircuit) -> Vec<SourceEntry> {
    let mut sources = Vec::new();

    for &idx in &sub.components {
        let nets = &circuit.terminal_nets[idx];
        match &circuit.components[idx] {
            Component::Battery(b) => sources.push(two_terminal(
                idx,
                SourceOrigin::Battery,
                nets,
                b.voltage,
                b.internal_resistance.max(0.0),
                None,
            )),
            Component::PowerSupply(ps) if ps.on => sources.push(two_terminal(
                idx,
                SourceOrigin::Supply,
                nets,
                ps.voltage,
                PowerSupply::INTERNAL_RESISTANCE,
                Some(ps.limit()),
            )),
            Component::Microcontroller(mcu) => {
                let Some(gnd) = pin_in(mcu, nets, sub, PinRole::Ground) else {
                    continue;
                };
                if let Some(rail) = pin_in(mcu, nets, sub, PinRole::Power3v3) {
                    sources.push(SourceEntry {
                        component: idx,
                        origin: SourceOrigin::Rail,
                        pos_terminal: rail,
                        neg_terminal: gnd,
                        positive: nets[rail],
                        negative: nets[gnd],
                        voltage: Microcontroller::RAIL_VOLTAGE,
                        resistance: Microcontroller::RAIL_RESISTANCE,
                        current_limit: None,
                    });
                }
                for pin in mcu.high_pin_terminals() {
                    if nets.get(pin).is_some_and(|&net| sub.contains(net)) {
                        sources.push(SourceEntry {
                            component: idx,
                            origin: SourceOrigin::Pin,
                            pos_terminal: pin,
                            neg_terminal: gnd,
                            positive: nets[pin],
                            negative: nets[gnd],
                            voltage: Microcontroller::RAIL_VOLTAGE,
                            resistance: Microcontroller::PIN_RESISTANCE,
                            current_limit: None,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    sources
}

/// Pick the reference net: the negative side of the first source, or the
/// lowest net when nothing drives the subcircuit.
pub fn choose_ground(sub: &Subcircuit, sources: &[SourceEntry]) -> Option<NetId> {
    sources
        .first()
        .map(|s| s.negative)
        .or_else(|| sub.nets.first().copied())
}

fn two_terminal(
    component: usize,
    origin: SourceOrigin,
    nets: &[NetId],
    voltage: f64,
    resistance: f64,
    current_limit: Option<f64>,
) -> SourceEntry {
    SourceEntry {
        component,
        origin,
        pos_terminal: 0,
        neg_terminal: 1,
        positive: nets[0],
        negative: nets[1],
        voltage,
        resistance,
        current_limit,
    }
}

/// First pin with the given role whose net lies in the subcircuit.
fn pin_in(mcu: &Microcontroller, nets: &[NetId], sub: &Subcircuit, role: PinRole) -> Option<usize> {
    mcu.pins_with_role(role)
        .find(|&pin| nets.get(pin).is_some_and(|&net| sub.contains(net)))
}
