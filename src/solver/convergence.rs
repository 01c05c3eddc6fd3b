//! LED on/off fixed-point iteration.
//!
//! Each LED is either open or a Norton branch. Starting from a hypothesis,
//! the loop solves the linear system, re-derives every LED's state from its
//! bias and repeats until no LED changes or the pass limit is reached.

use serde::Serialize;

use crate::error::Result;

use super::stamp::{Overrides, SubcircuitContext};
use super::SolverConfig;

/// Bias band around the threshold that keeps an LED in its current state.
const HYSTERESIS: f64 = 1e-9;

/// How the on/off loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Convergence {
    /// No LED changed state in the last pass
    Converged,
    /// The pass limit was reached; the last iterate is used
    MaxIterationsExceeded,
}

/// Result of one run of the on/off loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Pass {
    /// Node voltages then source branch currents
    pub solution: Vec<f64>,
    /// LED states the solution was computed with
    pub hypothesis: Vec<bool>,
    pub convergence: Convergence,
    pub iterations: usize,
}

/// Run the on/off loop from an initial hypothesis.
///
/// Fails only if a pass hits a singular system.
pub fn converge(
    ctx: &SubcircuitContext<'_, '_>,
    initial: Vec<bool>,
    limited: &[bool],
    overrides: Overrides,
    config: &SolverConfig,
) -> Result<Pass> {
    let mut hypothesis = initial;
    let max_iterations = config.max_iterations.max(1);
    let mut iterations = 0;

    loop {
        iterations += 1;
        let matrix = ctx.build_matrix(&hypothesis, limited, overrides, config);
        let solution = matrix.solve(config.pivot_epsilon)?;
        let next = next_hypothesis(ctx, &solution, &hypothesis, overrides);

        let settled = next == hypothesis;
        if settled || iterations >= max_iterations {
            return Ok(Pass {
                solution,
                hypothesis,
                convergence: if settled {
                    Convergence::Converged
                } else {
                    Convergence::MaxIterationsExceeded
                },
                iterations,
            });
        }
        hypothesis = next;
    }
}

fn next_hypothesis(
    ctx: &SubcircuitContext<'_, '_>,
    solution: &[f64],
    hypothesis: &[bool],
    overrides: Overrides,
) -> Vec<bool> {
    ctx.diodes
        .iter()
        .zip(hypothesis)
        .map(|(slot, &was_on)| {
            if slot.exploded && !overrides.ignore_exploded {
                return false;
            }
            let bias = ctx.voltage(solution, slot.anode) - ctx.voltage(solution, slot.cathode);
            let vf = slot.params.forward_voltage;
            if was_on {
                bias >= vf - HYSTERESIS
            } else {
                bias > vf + HYSTERESIS
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::circuit::{Circuit, NodeKey, Wire};
    use crate::components::{Battery, Component, Led, LedColor, Resistor};

    fn n(key: &str) -> NodeKey {
        NodeKey::from(key)
    }

    fn battery_led(battery: Battery, series: Option<f64>) -> (Vec<Component>, Vec<Wire>) {
        let mut components = vec![
            Component::Battery(battery),
            Component::Led(Led::new("LED1", [n("a"), n("k")], LedColor::Red)),
        ];
        let mut wires = vec![Wire::new("k", "b-")];
        match series {
            Some(r) => {
                components.push(Component::Resistor(Resistor::new("R1", [n("r1"), n("r2")], r)));
                wires.push(Wire::new("b+", "r1"));
                wires.push(Wire::new("r2", "a"));
            }
            None => wires.push(Wire::new("b+", "a")),
        }
        (components, wires)
    }

    #[test]
    fn test_led_turns_on_above_threshold() {
        let (components, wires) = battery_led(Battery::nine_volt("B1", [n("b+"), n("b-")]), None);
        let circuit = Circuit::build(&components, &wires);
        let ctx = SubcircuitContext::new(&circuit, &circuit.subcircuits[0]);
        let config = SolverConfig::default();

        let pass = converge(&ctx, vec![false], &[false], Overrides::default(), &config).unwrap();
        assert_eq!(pass.convergence, Convergence::Converged);
        assert_eq!(pass.hypothesis, vec![true]);
        assert_eq!(pass.iterations, 2);

        let current = -pass.solution[ctx.branch_row(0)];
        assert_relative_eq!(current, 7.6 / (1.45 + 6.856), max_relative = 1e-9);
    }

    #[test]
    fn test_led_stays_off_below_threshold() {
        // 1.2 V is under the red threshold
        let battery = Battery::new("B1", [n("b+"), n("b-")], 1.2, 0.3);
        let (components, wires) = battery_led(battery, Some(100.0));
        let circuit = Circuit::build(&components, &wires);
        let ctx = SubcircuitContext::new(&circuit, &circuit.subcircuits[0]);

        let pass = converge(&ctx, vec![false], &[false], Overrides::default(), &SolverConfig::default())
            .unwrap();
        assert_eq!(pass.hypothesis, vec![false]);
        assert_eq!(pass.iterations, 1);
    }

    #[test]
    fn test_converged_hypothesis_is_a_fixed_point() {
        let (components, wires) =
            battery_led(Battery::nine_volt("B1", [n("b+"), n("b-")]), Some(330.0));
        let circuit = Circuit::build(&components, &wires);
        let ctx = SubcircuitContext::new(&circuit, &circuit.subcircuits[0]);
        let config = SolverConfig::default();

        let first = converge(&ctx, vec![false], &[false], Overrides::default(), &config).unwrap();
        let again =
            converge(&ctx, first.hypothesis.clone(), &[false], Overrides::default(), &config).unwrap();
        assert_eq!(again.iterations, 1);
        assert_eq!(again.hypothesis, first.hypothesis);
        assert_eq!(again.solution, first.solution);
    }

    #[test]
    fn test_exploded_led_stays_open_unless_overridden() {
        let (mut components, wires) =
            battery_led(Battery::nine_volt("B1", [n("b+"), n("b-")]), Some(330.0));
        if let Component::Led(led) = &mut components[1] {
            led.runtime.exploded = true;
        }
        let circuit = Circuit::build(&components, &wires);
        let ctx = SubcircuitContext::new(&circuit, &circuit.subcircuits[0]);
        let config = SolverConfig::default();

        let real = converge(&ctx, vec![false], &[false], Overrides::default(), &config).unwrap();
        assert_eq!(real.hypothesis, vec![false]);

        let what_if = Overrides {
            ignore_exploded: true,
        };
        let hypothetical = converge(&ctx, vec![false], &[false], what_if, &config).unwrap();
        assert_eq!(hypothetical.hypothesis, vec![true]);
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        let (components, wires) = battery_led(Battery::nine_volt("B1", [n("b+"), n("b-")]), None);
        let circuit = Circuit::build(&components, &wires);
        let ctx = SubcircuitContext::new(&circuit, &circuit.subcircuits[0]);
        let config = SolverConfig::default().with_max_iterations(1);

        let pass = converge(&ctx, vec![false], &[false], Overrides::default(), &config).unwrap();
        assert_eq!(pass.convergence, Convergence::MaxIterationsExceeded);
        assert_eq!(pass.hypothesis, vec![false]);
    }
}
