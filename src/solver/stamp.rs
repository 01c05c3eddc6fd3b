//! Per-subcircuit MNA assembly.
//!
//! A [`SubcircuitContext`] resolves nets to matrix rows once; the convergence
//! loop then rebuilds the matrix from it on every pass with a different LED
//! hypothesis.

use std::collections::HashMap;

use crate::circuit::{Circuit, NetId, NodeKey, Subcircuit};
use crate::components::{
    Component, LedParams, MeterMode, Multimeter, Potentiometer, Pushbutton, RgbChannel,
};

use super::classify::{choose_ground, classify_sources, SourceEntry};
use super::mna::MnaMatrix;
use super::SolverConfig;

/// One LED die taking part in the on/off loop.
#[derive(Debug, Clone, PartialEq)]
pub struct DiodeSlot {
    /// Index of the owning component
    pub component: usize,
    /// RGB channel, or `None` for a single LED
    pub channel: Option<RgbChannel>,
    pub anode: NetId,
    pub cathode: NetId,
    pub params: LedParams,
    pub exploded: bool,
}

/// Switches that change how a pass is stamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Treat exploded LEDs as intact (what-if pass)
    pub ignore_exploded: bool,
}

/// Everything about one subcircuit that stays fixed across passes.
#[derive(Debug)]
pub struct SubcircuitContext<'c, 'a> {
    pub circuit: &'c Circuit<'a>,
    pub sub: &'c Subcircuit,
    pub sources: Vec<SourceEntry>,
    pub ground: Option<NetId>,
    pub diodes: Vec<DiodeSlot>,
    index: HashMap<NetId, usize>,
}

impl<'c, 'a> SubcircuitContext<'c, 'a> {
    pub fn new(circuit: &'c Circuit<'a>, sub: &'c Subcircuit) -> Self {
        let sources = classify_sources(circuit, sub);
        let ground = choose_ground(sub, &sources);

        let index: HashMap<NetId, usize> = sub
            .nets
            .iter()
            .filter(|&&net| Some(net) != ground)
            .enumerate()
            .map(|(row, &net)| (net, row))
            .collect();

        let mut diodes = Vec::new();
        for &idx in &sub.components {
            match &circuit.components[idx] {
                Component::Led(led) => diodes.push(DiodeSlot {
                    component: idx,
                    channel: None,
                    anode: circuit.terminal_net(idx, 0),
                    cathode: circuit.terminal_net(idx, 1),
                    params: led.params(),
                    exploded: led.is_exploded(),
                }),
                Component::RgbLed(led) => {
                    for ch in RgbChannel::ALL {
                        let (anode, cathode) = led.channel_terminals(ch);
                        diodes.push(DiodeSlot {
                            component: idx,
                            channel: Some(ch),
                            anode: circuit.terminal_net(idx, anode),
                            cathode: circuit.terminal_net(idx, cathode),
                            params: led.channel_params(ch),
                            exploded: led.is_channel_exploded(ch),
                        });
                    }
                }
                _ => {}
            }
        }

        Self {
            circuit,
            sub,
            sources,
            ground,
            diodes,
            index,
        }
    }

    /// Matrix row of a net, `None` for ground.
    pub fn node(&self, net: NetId) -> Option<usize> {
        self.index.get(&net).copied()
    }

    /// Number of non-ground node rows.
    pub fn num_nodes(&self) -> usize {
        self.index.len()
    }

    /// Whether the subcircuit has at least one independent source.
    pub fn powered(&self) -> bool {
        !self.sources.is_empty()
    }

    /// Voltage of a net in a solution vector.
    pub fn voltage(&self, solution: &[f64], net: NetId) -> f64 {
        self.node(net).map(|row| solution[row]).unwrap_or(0.0)
    }

    /// Matrix row holding the branch current of source `k`.
    pub fn branch_row(&self, k: usize) -> usize {
        self.num_nodes() + k
    }

    /// Source entries belonging to a component, with their positions.
    pub fn sources_of(&self, component: usize) -> impl Iterator<Item = (usize, &SourceEntry)> + '_ {
        self.sources
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.component == component)
    }

    /// Assemble the system for one LED hypothesis.
    ///
    /// `hypothesis` runs parallel to `diodes`, `limited` parallel to
    /// `sources`.
    pub fn build_matrix(
        &self,
        hypothesis: &[bool],
        limited: &[bool],
        overrides: Overrides,
        config: &SolverConfig,
    ) -> MnaMatrix {
        let mut m = MnaMatrix::new(self.num_nodes(), self.sources.len());
        let circuit = self.circuit;

        for &idx in &self.sub.components {
            let net = |t: usize| self.node(circuit.terminal_net(idx, t));
            match &circuit.components[idx] {
                Component::Resistor(r) => m.stamp_conductance(net(0), net(1), r.conductance()),
                Component::Photoresistor(r) => m.stamp_conductance(net(0), net(1), r.conductance()),
                Component::Lightbulb(b) => m.stamp_conductance(net(0), net(1), b.conductance()),
                Component::Pushbutton(btn) => {
                    let (a, b) = pushbutton_terminals(circuit, btn);
                    m.stamp_conductance(net(a), net(b), btn.conductance());
                }
                Component::Potentiometer(pot) => {
                    if wiper_floating(circuit, pot) {
                        m.stamp_conductance(net(0), net(2), 1.0 / pot.total());
                    } else {
                        m.stamp_conductance(net(0), net(1), 1.0 / pot.r_aw());
                        m.stamp_conductance(net(1), net(2), 1.0 / pot.r_wb());
                    }
                }
                Component::Multimeter(meter) => match meter.mode {
                    MeterMode::Voltage | MeterMode::Current => {
                        if let Some(g) = meter.shunt_conductance() {
                            m.stamp_conductance(net(0), net(1), g);
                        }
                    }
                    MeterMode::Resistance if !self.powered() => {
                        m.stamp_current_source(net(1), net(0), Multimeter::TEST_CURRENT);
                    }
                    MeterMode::Resistance | MeterMode::Off => {}
                },
                // Sources and LEDs are stamped below; the slide switch is
                // already folded into the topology.
                _ => {}
            }
        }

        for (slot, &on) in self.diodes.iter().zip(hypothesis) {
            if !on || (slot.exploded && !overrides.ignore_exploded) {
                continue;
            }
            let (g, i_eq) = slot.params.norton();
            let anode = self.node(slot.anode);
            let cathode = self.node(slot.cathode);
            m.stamp_conductance(anode, cathode, g);
            m.stamp_current_source(cathode, anode, i_eq);
        }

        for (k, source) in self.sources.iter().enumerate() {
            let br = m.branch_index(k);
            let pos = self.node(source.positive);
            let neg = self.node(source.negative);
            match source.current_limit {
                Some(limit) if limited.get(k).copied().unwrap_or(false) => {
                    m.stamp_open_branch(br);
                    m.stamp_current_source(neg, pos, limit);
                }
                _ => m.stamp_voltage_source(pos, neg, br, source.voltage, source.resistance),
            }
        }

        m.add_leakage(config.leakage);
        m
    }
}

/// Terminals the pushbutton contact is stamped between: the first wired leg
/// of each internally tied pair.
pub(crate) fn pushbutton_terminals(circuit: &Circuit<'_>, btn: &Pushbutton) -> (usize, usize) {
    let pick = |(first, second): (usize, usize)| {
        [first, second]
            .into_iter()
            .find(|&t| circuit.nets.is_wired(&btn.nodes[t]))
            .unwrap_or(first)
    };
    let [a, b] = Pushbutton::TIED_PAIRS;
    (pick(a), pick(b))
}

/// A potentiometer used as a plain two-terminal resistor.
pub(crate) fn wiper_floating(circuit: &Circuit<'_>, pot: &Potentiometer) -> bool {
    let wired = |key: &NodeKey| circuit.nets.is_wired(key);
    !wired(pot.wiper()) && wired(pot.a()) && wired(pot.b())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Wire;
    use crate::components::{Battery, Led, LedColor, PowerSupply, Resistor};

    fn n(key: &str) -> NodeKey {
        NodeKey::from(key)
    }

    #[test]
    fn test_ground_is_negative_of_first_source() {
        let components = vec![
            Component::Resistor(Resistor::new("R1", [n("r1"), n("r2")], 3.0)),
            Component::Battery(Battery::nine_volt("B1", [n("b+"), n("b-")])),
        ];
        let wires = vec![Wire::new("b+", "r1"), Wire::new("r2", "b-")];
        let circuit = Circuit::build(&components, &wires);
        let ctx = SubcircuitContext::new(&circuit, &circuit.subcircuits[0]);
        assert_eq!(ctx.ground, Some(circuit.terminal_net(1, 1)));
        assert_eq!(ctx.num_nodes(), 1);
        assert!(ctx.node(circuit.terminal_net(0, 1)).is_none());
        assert!(ctx.powered());
    }

    #[test]
    fn test_led_stamped_only_when_on() {
        let components = vec![
            Component::Battery(Battery::nine_volt("B1", [n("b+"), n("b-")])),
            Component::Led(Led::new("LED1", [n("a"), n("k")], LedColor::Red)),
        ];
        let wires = vec![Wire::new("b+", "a"), Wire::new("k", "b-")];
        let circuit = Circuit::build(&components, &wires);
        let ctx = SubcircuitContext::new(&circuit, &circuit.subcircuits[0]);
        let config = SolverConfig::default();

        let off = ctx.build_matrix(&[false], &[false], Overrides::default(), &config);
        let on = ctx.build_matrix(&[true], &[false], Overrides::default(), &config);
        let row = ctx.node(circuit.terminal_net(1, 0)).unwrap();
        assert!(off.get(row, row) < 1e-9);
        assert!((on.get(row, row) - 1.0 / 6.856).abs() < 1e-9);
        assert!((on.z[row] - 1.4 / 6.856).abs() < 1e-9);
    }

    #[test]
    fn test_limited_supply_becomes_current_injection() {
        let components = vec![
            Component::PowerSupply(PowerSupply::new("PS1", [n("p+"), n("p-")], 5.0, 0.5)),
            Component::Resistor(Resistor::new("R1", [n("a"), n("b")], 1.0)),
        ];
        let wires = vec![Wire::new("p+", "a"), Wire::new("b", "p-")];
        let circuit = Circuit::build(&components, &wires);
        let ctx = SubcircuitContext::new(&circuit, &circuit.subcircuits[0]);
        let m = ctx.build_matrix(&[], &[true], Overrides::default(), &SolverConfig::default());
        let br = ctx.branch_row(0);
        let pos = ctx.node(circuit.terminal_net(0, 0)).unwrap();
        assert_eq!(m.get(br, br), 1.0);
        assert_eq!(m.get(pos, br), 0.0);
        assert!((m.z[pos] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_unwired_wiper_uses_full_track() {
        let components = vec![Component::Potentiometer(Potentiometer::new(
            "P1",
            [n("a"), n("w"), n("b")],
            10_000.0,
            0.3,
        ))];
        let wires = vec![Wire::new("a", "x"), Wire::new("b", "y")];
        let circuit = Circuit::build(&components, &wires);
        let Component::Potentiometer(pot) = &components[0] else {
            unreachable!()
        };
        assert!(wiper_floating(&circuit, pot));

        let wired = vec![Wire::new("a", "x"), Wire::new("w", "z"), Wire::new("b", "y")];
        let circuit = Circuit::build(&components, &wired);
        assert!(!wiper_floating(&circuit, pot));
    }
}
