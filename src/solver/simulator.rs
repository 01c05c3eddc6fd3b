//! Main solver interface.

use serde::Serialize;

use crate::circuit::{Circuit, Snapshot, Wire};
use crate::components::{Component, RgbChannel};
use crate::error::Result;

use super::convergence::{converge, Convergence, Pass};
use super::extract::{extract_all, Computed, Detail, OperatingPoint, SolvedSubcircuit};
use super::stamp::{Overrides, SubcircuitContext};
use super::SolverConfig;

/// A component together with its solved state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolvedComponent {
    pub component: Component,
    pub computed: Computed,
}

/// Summary of one solve, for logging and diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SolveReport {
    /// Number of isolated subcircuits
    pub subcircuits: usize,
    /// Subcircuits without any independent source
    pub unpowered: usize,
    /// Subcircuits whose LED loop hit the pass limit
    pub not_converged: usize,
    /// Subcircuits without a unique solution (results zeroed)
    pub singular: usize,
    /// Bench supplies that switched to constant current
    pub current_limited: usize,
}

/// Solve one subcircuit: the LED loop, then the constant-current pass for
/// overloaded supplies, then the what-if pass for exploded LEDs.
fn solve_subcircuit(ctx: &SubcircuitContext<'_, '_>, config: &SolverConfig) -> Result<OperatingPoint> {
    let num_diodes = ctx.diodes.len();
    let unlimited = vec![false; ctx.sources.len()];
    let primary = converge(ctx, vec![false; num_diodes], &unlimited, Overrides::default(), config)?;

    let limited: Vec<bool> = ctx
        .sources
        .iter()
        .enumerate()
        .map(|(k, source)| match source.current_limit {
            Some(limit) => -primary.solution[ctx.branch_row(k)] > limit,
            None => false,
        })
        .collect();

    let pass = if limited.contains(&true) {
        converge(ctx, primary.hypothesis.clone(), &limited, Overrides::default(), config)?
    } else {
        primary
    };

    let what_if = if ctx.diodes.iter().any(|d| d.exploded) {
        let overrides = Overrides {
            ignore_exploded: true,
        };
        match converge(ctx, vec![false; num_diodes], &limited, overrides, config) {
            Ok(hypothetical) => Some(diode_currents(ctx, &hypothetical)),
            Err(err) => {
                log::debug!("what-if pass failed: {err}");
                None
            }
        }
    } else {
        None
    };

    Ok(OperatingPoint {
        solution: pass.solution,
        hypothesis: pass.hypothesis,
        limited,
        what_if,
        convergence: pass.convergence,
        iterations: pass.iterations,
    })
}

fn diode_currents(ctx: &SubcircuitContext<'_, '_>, pass: &Pass) -> Vec<f64> {
    ctx.diodes
        .iter()
        .zip(&pass.hypothesis)
        .map(|(slot, &on)| {
            if on {
                let bias = ctx.voltage(&pass.solution, slot.anode)
                    - ctx.voltage(&pass.solution, slot.cathode);
                slot.params.conducting_current(bias)
            } else {
                0.0
            }
        })
        .collect()
}

/// Solve a snapshot and report how each subcircuit went.
///
/// Never fails: unsolvable subcircuits yield zeroed results and are counted
/// in the report.
pub fn solve_with_report(
    components: &[Component],
    wires: &[Wire],
    config: &SolverConfig,
) -> (Vec<SolvedComponent>, SolveReport) {
    let circuit = Circuit::build(components, wires);
    let mut report = SolveReport {
        subcircuits: circuit.subcircuits.len(),
        ..SolveReport::default()
    };

    let solved: Vec<_> = circuit
        .subcircuits
        .iter()
        .map(|sub| {
            let ctx = SubcircuitContext::new(&circuit, sub);
            let name = sub
                .nets
                .first()
                .map(|&net| circuit.nets.net_name(net).to_string())
                .unwrap_or_default();
            if !ctx.powered() {
                report.unpowered += 1;
            }

            let point = match solve_subcircuit(&ctx, config) {
                Ok(point) => {
                    if point.convergence == Convergence::MaxIterationsExceeded {
                        report.not_converged += 1;
                        log::warn!(
                            "subcircuit at {name}: LED states did not settle after {} passes",
                            point.iterations
                        );
                    }
                    report.current_limited += point.limited.iter().filter(|&&l| l).count();
                    log::debug!(
                        "subcircuit at {name}: {} nets, {} sources, {} LEDs, {} passes",
                        sub.nets.len(),
                        ctx.sources.len(),
                        ctx.diodes.len(),
                        point.iterations
                    );
                    Some(point)
                }
                Err(err) => {
                    report.singular += 1;
                    log::warn!("subcircuit at {name} has no solution: {err}");
                    None
                }
            };
            SolvedSubcircuit { ctx, point }
        })
        .collect();

    let results = components
        .iter()
        .cloned()
        .zip(extract_all(&circuit, &solved))
        .map(|(component, computed)| SolvedComponent {
            component,
            computed,
        })
        .collect();

    (results, report)
}

/// Owns a circuit between ticks and advances its LED runtime state.
#[derive(Debug, Clone)]
pub struct Simulator {
    components: Vec<Component>,
    wires: Vec<Wire>,
    config: SolverConfig,
    results: Vec<SolvedComponent>,
    report: SolveReport,
}

impl Simulator {
    /// Create a new simulator for a snapshot with default configuration.
    pub fn new(snapshot: Snapshot) -> Self {
        Self::with_config(snapshot, SolverConfig::default())
    }

    /// Create a new simulator for a snapshot with custom configuration.
    pub fn with_config(snapshot: Snapshot, config: SolverConfig) -> Self {
        let Snapshot {
            mut components,
            wires,
        } = snapshot;
        for component in &mut components {
            component.seed_runtime();
        }
        Self {
            components,
            wires,
            config,
            results: Vec::new(),
            report: SolveReport::default(),
        }
    }

    /// Replace the circuit, keeping the configuration.
    pub fn load(&mut self, snapshot: Snapshot) {
        *self = Self::with_config(snapshot, self.config.clone());
    }

    /// Solve the circuit and advance every LED by `dt` seconds.
    ///
    /// The returned components carry their updated runtime state; the
    /// electrical values are those that drove the update.
    pub fn tick(&mut self, dt: f64, now: f64) -> &[SolvedComponent] {
        let (mut results, report) = solve_with_report(&self.components, &self.wires, &self.config);
        let thermal = &self.config.thermal;

        for (component, solved) in self.components.iter_mut().zip(results.iter_mut()) {
            match (&mut *component, &solved.computed.detail) {
                (Component::Led(led), Detail::Diode(reading)) => {
                    let params = led.params();
                    led.runtime = led.runtime.advance(&params, thermal, reading.inputs(), dt, now);
                }
                (Component::RgbLed(led), Detail::RgbLed { channels }) => {
                    for ch in RgbChannel::ALL {
                        let params = led.channel_params(ch);
                        let state = &mut led.runtime[ch.index()];
                        *state = state.advance(&params, thermal, channels[ch.index()].inputs(), dt, now);
                    }
                }
                _ => {}
            }
            solved.component = component.clone();
        }

        self.results = results;
        self.report = report;
        &self.results
    }

    /// Results of the last tick.
    pub fn results(&self) -> &[SolvedComponent] {
        &self.results
    }

    /// Report of the last tick.
    pub fn last_report(&self) -> &SolveReport {
        &self.report
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Mutable access for host-side edits between ticks (switches, knobs).
    pub fn components_mut(&mut self) -> &mut [Component] {
        &mut self.components
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Current state as a snapshot, runtime included.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            components: self.components.clone(),
            wires: self.wires.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::NodeKey;
    use crate::components::{
        Battery, FailureReason, Led, LedColor, MeterMode, Multimeter, Resistor, VisualState,
    };

    fn n(key: &str) -> NodeKey {
        NodeKey::from(key)
    }

    fn led_snapshot(resistance: f64) -> Snapshot {
        Snapshot {
            components: vec![
                Component::Battery(Battery::nine_volt("B1", [n("b+"), n("b-")])),
                Component::Resistor(Resistor::new("R1", [n("r1"), n("r2")], resistance)),
                Component::Led(Led::new("LED1", [n("a"), n("k")], LedColor::Green)),
            ],
            wires: vec![
                Wire::new("b+", "r1"),
                Wire::new("r2", "a"),
                Wire::new("k", "b-"),
            ],
        }
    }

    #[test]
    fn test_report_counts_subcircuits() {
        let mut snapshot = led_snapshot(470.0);
        snapshot.components.push(Component::Multimeter(Multimeter::new(
            "M1",
            [n("m+"), n("m-")],
            MeterMode::Voltage,
        )));
        let (results, report) =
            solve_with_report(&snapshot.components, &snapshot.wires, &SolverConfig::default());
        assert_eq!(results.len(), 4);
        assert_eq!(report.subcircuits, 2);
        assert_eq!(report.unpowered, 1);
        assert_eq!(report.singular, 0);
        assert_eq!(report.not_converged, 0);
    }

    #[test]
    fn test_tick_lights_led_with_series_resistor() {
        let mut sim = Simulator::new(led_snapshot(470.0));
        let results = sim.tick(0.1, 0.1);
        let Detail::Diode(reading) = &results[2].computed.detail else {
            panic!("expected a diode reading");
        };
        assert!(reading.conducting);
        assert!(reading.current > 0.01 && reading.current < 0.03);

        let Component::Led(led) = &sim.components()[2] else {
            panic!("expected an LED");
        };
        assert!(!led.runtime.exploded);
        assert_ne!(led.runtime.visual, VisualState::Off);
    }

    #[test]
    fn test_tick_explodes_unprotected_led() {
        let mut sim = Simulator::new(led_snapshot(1.0));
        sim.tick(0.05, 0.05);
        let Component::Led(led) = &sim.components()[2] else {
            panic!("expected an LED");
        };
        assert!(led.runtime.exploded);

        // The next solve sees it open and reports what it would draw
        let results = sim.tick(0.05, 0.1);
        let Detail::Diode(reading) = &results[2].computed.detail else {
            panic!("expected a diode reading");
        };
        assert_eq!(reading.current, 0.0);
        assert!(!reading.conducting);
        assert!(reading.explosion_current.is_some_and(|i| i > 0.5));
    }

    #[test]
    fn test_tick_fails_led_driven_past_rating() {
        // 9V through 160R into a blue LED: (9 - 2.5) / (1.45 + 160 + 4.9) ~ 1.3x rated
        let snapshot = Snapshot {
            components: vec![
                Component::Battery(Battery::nine_volt("B1", [n("b+"), n("b-")])),
                Component::Resistor(Resistor::new("R1", [n("r1"), n("r2")], 160.0)),
                Component::Led(Led::new("LED1", [n("a"), n("k")], LedColor::Blue)),
            ],
            wires: vec![
                Wire::new("b+", "r1"),
                Wire::new("r2", "a"),
                Wire::new("k", "b-"),
            ],
        };
        let mut sim = Simulator::new(snapshot);
        let results = sim.tick(0.05, 0.05).to_vec();
        let Detail::Diode(reading) = &results[2].computed.detail else {
            panic!("expected a diode reading");
        };
        let rated = LedColor::Blue.params().max_current;
        assert!(reading.current > 1.25 * rated && reading.current < 1.35 * rated);
        assert!(reading.forward_voltage > SolverConfig::default().thermal.low_voltage_bypass);

        let Component::Led(led) = &sim.components()[2] else {
            panic!("expected an LED");
        };
        assert!(led.is_exploded());
        assert_eq!(led.runtime.failure_reason, Some(FailureReason::Overcurrent));
        assert_eq!(led.runtime.explosion_current, Some(reading.current));
    }

    #[test]
    fn test_snapshot_keeps_runtime_between_loads() {
        let mut sim = Simulator::new(led_snapshot(1.0));
        sim.tick(0.05, 0.05);
        let saved = sim.snapshot();

        let mut restored = Simulator::new(Snapshot::default());
        restored.load(saved);
        let Component::Led(led) = &restored.components()[2] else {
            panic!("expected an LED");
        };
        assert!(led.is_exploded());
    }
}
