//! Topology reduction: node equivalence classes and subcircuit partitioning.

use std::collections::{BTreeMap, HashMap};

use super::types::{NetId, NodeKey, Wire};
use crate::components::Component;

/// Union-find over registration indices.
///
/// The smaller index always becomes the root, so a class is represented by
/// its first-registered member regardless of union order.
#[derive(Debug, Clone)]
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra < rb {
            self.parent[rb] = ra;
        } else if rb < ra {
            self.parent[ra] = rb;
        }
    }
}

/// Mapping from every node identity to the net it belongs to.
#[derive(Debug, Clone)]
pub struct NodeEquivalenceMap {
    ids: HashMap<NodeKey, usize>,
    keys: Vec<NodeKey>,
    roots: Vec<usize>,
    wired: Vec<bool>,
}

impl NodeEquivalenceMap {
    /// Reduce wires and hardware-tied terminals into nets.
    ///
    /// Nodes are registered in component terminal order, then wire endpoint
    /// order. Tied terminals are merged only when both are on an active wire,
    /// so an unused rail never pulls floating pins into a net.
    pub fn build(components: &[Component], wires: &[Wire]) -> Self {
        let mut ids: HashMap<NodeKey, usize> = HashMap::new();
        let mut keys: Vec<NodeKey> = Vec::new();

        let mut register = |key: &NodeKey, ids: &mut HashMap<NodeKey, usize>| -> usize {
            if let Some(&id) = ids.get(key) {
                id
            } else {
                let id = keys.len();
                keys.push(key.clone());
                ids.insert(key.clone(), id);
                id
            }
        };

        for component in components {
            for key in component.terminals() {
                register(key, &mut ids);
            }
        }
        let wire_ends: Vec<(usize, usize)> = wires
            .iter()
            .filter(|w| w.is_active())
            .map(|w| (register(&w.from, &mut ids), register(&w.to, &mut ids)))
            .collect();

        let mut wired = vec![false; keys.len()];
        let mut uf = UnionFind::new(keys.len());

        // Union connected endpoints.
        for &(a, b) in &wire_ends {
            wired[a] = true;
            wired[b] = true;
            uf.union(a, b);
        }

        // Union internally tied terminals.
        for component in components {
            let terminals = component.terminals();
            for (i, j) in component.tied_terminals() {
                let (Some(ka), Some(kb)) = (terminals.get(i), terminals.get(j)) else {
                    continue;
                };
                let (a, b) = (ids[ka], ids[kb]);
                if wired[a] && wired[b] {
                    uf.union(a, b);
                }
            }
        }

        let roots = (0..keys.len()).map(|i| uf.find(i)).collect();
        Self {
            ids,
            keys,
            roots,
            wired,
        }
    }

    /// Get the net a node belongs to.
    pub fn net_of(&self, key: &NodeKey) -> Option<NetId> {
        self.ids.get(key).map(|&id| NetId(self.roots[id]))
    }

    /// Whether the node is the endpoint of an active wire.
    pub fn is_wired(&self, key: &NodeKey) -> bool {
        self.ids.get(key).is_some_and(|&id| self.wired[id])
    }

    /// Get the node key that represents a net.
    pub fn net_name(&self, net: NetId) -> &NodeKey {
        &self.keys[net.0]
    }

    /// Number of distinct node identities seen.
    pub fn node_count(&self) -> usize {
        self.keys.len()
    }

    /// Whether two nodes are at the same potential by construction.
    pub fn same_net(&self, a: &NodeKey, b: &NodeKey) -> bool {
        match (self.net_of(a), self.net_of(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }
}

/// An electrically isolated part of the circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subcircuit {
    /// Nets in ascending order
    pub nets: Vec<NetId>,
    /// Indices of components with at least one terminal on these nets
    pub components: Vec<usize>,
}

impl Subcircuit {
    /// Check whether a net belongs to this subcircuit.
    pub fn contains(&self, net: NetId) -> bool {
        self.nets.binary_search(&net).is_ok()
    }
}

/// A circuit snapshot with its topology resolved.
#[derive(Debug)]
pub struct Circuit<'a> {
    /// All components, in caller order
    pub components: &'a [Component],
    /// Node equivalence classes
    pub nets: NodeEquivalenceMap,
    /// Net of each terminal, parallel to `Component::terminals`
    pub terminal_nets: Vec<Vec<NetId>>,
    /// Electrically isolated parts, ordered by their first net
    pub subcircuits: Vec<Subcircuit>,
}

impl<'a> Circuit<'a> {
    /// Reduce a snapshot into nets and subcircuits.
    pub fn build(components: &'a [Component], wires: &[Wire]) -> Self {
        let nets = NodeEquivalenceMap::build(components, wires);

        let terminal_nets: Vec<Vec<NetId>> = components
            .iter()
            .map(|c| {
                c.terminals()
                    .iter()
                    .filter_map(|key| nets.net_of(key))
                    .collect()
            })
            .collect();

        // Join nets through every component whose terminals share a body.
        let mut uf = UnionFind::new(nets.node_count());
        for (component, terminals) in components.iter().zip(&terminal_nets) {
            if !component.joins_terminals() {
                continue;
            }
            if let Some((first, rest)) = terminals.split_first() {
                for other in rest {
                    uf.union(first.0, other.0);
                }
            }
        }

        let mut groups: BTreeMap<usize, Vec<NetId>> = BTreeMap::new();
        for terminals in &terminal_nets {
            for &net in terminals {
                let group = groups.entry(uf.find(net.0)).or_default();
                if !group.contains(&net) {
                    group.push(net);
                }
            }
        }

        let mut subcircuits: Vec<Subcircuit> = groups
            .into_values()
            .map(|mut nets| {
                nets.sort_unstable();
                Subcircuit {
                    nets,
                    components: Vec::new(),
                }
            })
            .collect();

        let mut owner: HashMap<NetId, usize> = HashMap::new();
        for (idx, sub) in subcircuits.iter().enumerate() {
            for &net in &sub.nets {
                owner.insert(net, idx);
            }
        }
        for (comp_idx, terminals) in terminal_nets.iter().enumerate() {
            for net in terminals {
                let sub = &mut subcircuits[owner[net]];
                if !sub.components.contains(&comp_idx) {
                    sub.components.push(comp_idx);
                }
            }
        }

        log::debug!(
            "reduced {} nodes into {} subcircuits",
            nets.node_count(),
            subcircuits.len()
        );

        Circuit {
            components,
            nets,
            terminal_nets,
            subcircuits,
        }
    }

    /// Net of a component terminal.
    pub fn terminal_net(&self, component: usize, terminal: usize) -> NetId {
        self.terminal_nets[component][terminal]
    }

    /// Index of the subcircuit that owns a net.
    pub fn subcircuit_of(&self, net: NetId) -> Option<usize> {
        self.subcircuits.iter().position(|s| s.contains(net))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Battery, Microcontroller, PinRole, Pushbutton, Resistor};

    fn n(key: &str) -> NodeKey {
        NodeKey::from(key)
    }

    #[test]
    fn test_wires_merge_nodes() {
        let components = vec![
            Component::Battery(Battery::nine_volt("B1", [n("b+"), n("b-")])),
            Component::Resistor(Resistor::new("R1", [n("r1"), n("r2")], 100.0)),
        ];
        let wires = vec![Wire::new("b+", "r1"), Wire::new("r2", "b-")];
        let map = NodeEquivalenceMap::build(&components, &wires);
        assert!(map.same_net(&n("b+"), &n("r1")));
        assert!(map.same_net(&n("b-"), &n("r2")));
        assert!(!map.same_net(&n("b+"), &n("b-")));
        // Root is the first registered node
        assert_eq!(map.net_name(map.net_of(&n("r1")).unwrap()), &n("b+"));
    }

    #[test]
    fn test_deleted_wires_are_ignored() {
        let components = vec![Component::Resistor(Resistor::new("R1", [n("a"), n("b")], 1.0))];
        let mut wire = Wire::new("a", "b");
        wire.deleted = true;
        let map = NodeEquivalenceMap::build(&components, &[wire]);
        assert!(!map.same_net(&n("a"), &n("b")));
        assert!(!map.is_wired(&n("a")));
    }

    #[test]
    fn test_hidden_wires_still_conduct() {
        let components = vec![Component::Resistor(Resistor::new("R1", [n("a"), n("b")], 1.0))];
        let mut wire = Wire::new("a", "b");
        wire.hidden = true;
        let map = NodeEquivalenceMap::build(&components, &[wire]);
        assert!(map.same_net(&n("a"), &n("b")));
    }

    #[test]
    fn test_tied_terminals_need_both_wired() {
        let components = vec![Component::Pushbutton(Pushbutton::new(
            "BTN1",
            [n("a1"), n("a2"), n("b1"), n("b2")],
        ))];

        let only_one = NodeEquivalenceMap::build(&components, &[Wire::new("a1", "x")]);
        assert!(!only_one.same_net(&n("a1"), &n("a2")));

        let both = NodeEquivalenceMap::build(
            &components,
            &[Wire::new("a1", "x"), Wire::new("a2", "y")],
        );
        assert!(both.same_net(&n("a1"), &n("a2")));
        assert!(both.same_net(&n("x"), &n("y")));
        assert!(!both.same_net(&n("a1"), &n("b1")));
    }

    #[test]
    fn test_isolated_parts_become_separate_subcircuits() {
        let components = vec![
            Component::Battery(Battery::nine_volt("B1", [n("b+"), n("b-")])),
            Component::Resistor(Resistor::new("R1", [n("r1"), n("r2")], 100.0)),
            Component::Resistor(Resistor::new("R2", [n("q1"), n("q2")], 100.0)),
        ];
        let wires = vec![Wire::new("b+", "r1"), Wire::new("r2", "b-")];
        let circuit = Circuit::build(&components, &wires);
        assert_eq!(circuit.subcircuits.len(), 2);
        assert_eq!(circuit.subcircuits[0].components, vec![0, 1]);
        assert_eq!(circuit.subcircuits[1].components, vec![2]);
        assert_eq!(circuit.subcircuits[0].nets.len(), 2);
    }

    #[test]
    fn test_microcontroller_pins_do_not_join_subcircuits() {
        let mcu = Microcontroller::new(
            "U1",
            vec![
                (n("gnd"), PinRole::Ground),
                (n("3v3"), PinRole::Power3v3),
                (n("gp0"), PinRole::Digital(0)),
            ],
        );
        let components = vec![
            Component::Microcontroller(mcu),
            Component::Resistor(Resistor::new("R1", [n("r1"), n("r2")], 100.0)),
        ];
        let wires = vec![Wire::new("gp0", "r1"), Wire::new("r2", "gnd")];
        let circuit = Circuit::build(&components, &wires);

        // gp0 and gnd are joined through R1; 3v3 floats on its own
        assert_eq!(circuit.subcircuits.len(), 2);
        let main = circuit.subcircuit_of(circuit.terminal_net(0, 0)).unwrap();
        assert!(circuit.subcircuits[main].contains(circuit.terminal_net(0, 2)));
        assert!(!circuit.subcircuits[main].contains(circuit.terminal_net(0, 1)));
        assert_eq!(circuit.subcircuits[main].components, vec![0, 1]);
    }
}
