//! Per-component results read back from solved subcircuits.
//!
//! Sign conventions:
//! - `voltage` is terminal 0 minus terminal 1 (anode minus cathode, positive
//!   minus negative probe)
//! - `current` flows from terminal 0 to terminal 1 through passives and
//!   LEDs; sources report the current they deliver
//! - `terminal_currents[k]` is the current entering the component at
//!   terminal k, so they sum to zero for every component and to zero per net
//!   across components

use serde::Serialize;

use crate::circuit::Circuit;
use crate::components::{
    Component, ElectricalInputs, Lightbulb, MeterMode, Microcontroller, Multimeter, PinRole,
    Potentiometer, RgbChannel, RgbLed, SupplyMode,
};

use super::classify::SourceOrigin;
use super::convergence::Convergence;
use super::stamp::{pushbutton_terminals, wiper_floating, SubcircuitContext};

/// Solved electrical state of one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Computed {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    /// Current entering at each terminal, parallel to the terminal list
    pub terminal_currents: Vec<f64>,
    pub detail: Detail,
}

/// Kind-specific part of a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Detail {
    None,
    Diode(DiodeReading),
    RgbLed { channels: [DiodeReading; 3] },
    Potentiometer { segment_currents: [f64; 2] },
    Meter(MeterReading),
    Supply { mode: SupplyMode },
    Microcontroller { shorted: bool, powered: bool },
    Lamp { brightness: f64 },
}

/// Operating point of one LED die.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DiodeReading {
    /// Anode minus cathode (negative when reverse biased)
    pub forward_voltage: f64,
    pub current: f64,
    pub power: f64,
    pub conducting: bool,
    /// For an exploded die: the current it would carry if it were intact
    pub explosion_current: Option<f64>,
}

impl DiodeReading {
    /// Inputs for the thermal state machine.
    pub fn inputs(&self) -> ElectricalInputs {
        ElectricalInputs {
            forward_voltage: self.forward_voltage,
            current: self.current,
            power: self.power,
        }
    }
}

/// What the multimeter display shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeterReading {
    pub mode: MeterMode,
    /// Displayed value; `inf` for an open circuit, `NaN` on error.
    ///
    /// JSON has no encoding for either, so both serialize as `null`; use
    /// `open_circuit` and `error` to tell them apart.
    pub value: f64,
    pub unit: &'static str,
    /// Set when the ohmmeter sees no path between its probes
    pub open_circuit: bool,
    /// Set when measuring resistance on a powered circuit
    pub error: bool,
}

impl MeterReading {
    fn idle(mode: MeterMode) -> Self {
        Self {
            mode,
            value: 0.0,
            unit: unit_of(mode),
            open_circuit: false,
            error: false,
        }
    }
}

fn unit_of(mode: MeterMode) -> &'static str {
    match mode {
        MeterMode::Off => "",
        MeterMode::Voltage => "V",
        MeterMode::Current => "A",
        MeterMode::Resistance => "Ω",
    }
}

impl Detail {
    fn zeroed(component: &Component) -> Self {
        match component {
            Component::Led(_) => Detail::Diode(DiodeReading::default()),
            Component::RgbLed(_) => Detail::RgbLed {
                channels: [DiodeReading::default(); 3],
            },
            Component::Potentiometer(_) => Detail::Potentiometer {
                segment_currents: [0.0; 2],
            },
            Component::Multimeter(m) => Detail::Meter(MeterReading::idle(m.mode)),
            Component::PowerSupply(_) => Detail::Supply {
                mode: SupplyMode::Off,
            },
            Component::Microcontroller(_) => Detail::Microcontroller {
                shorted: false,
                powered: false,
            },
            Component::Lightbulb(_) => Detail::Lamp { brightness: 0.0 },
            _ => Detail::None,
        }
    }
}

impl Computed {
    /// All-zero result for a component with no solution.
    pub fn zeroed(component: &Component) -> Self {
        Self {
            voltage: 0.0,
            current: 0.0,
            power: 0.0,
            terminal_currents: vec![0.0; component.terminals().len()],
            detail: Detail::zeroed(component),
        }
    }

    fn two_terminal(voltage: f64, current: f64, detail: Detail) -> Self {
        Self {
            voltage,
            current,
            power: voltage * current,
            terminal_currents: vec![current, -current],
            detail,
        }
    }
}

/// Solved state of one subcircuit.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatingPoint {
    /// Node voltages then source branch currents
    pub solution: Vec<f64>,
    /// Conducting state of each diode slot
    pub hypothesis: Vec<bool>,
    /// Sources running in constant-current mode
    pub limited: Vec<bool>,
    /// Current of each diode slot with explosions ignored, when any exploded
    pub what_if: Option<Vec<f64>>,
    pub convergence: Convergence,
    pub iterations: usize,
}

/// A subcircuit context with its operating point, or `None` if unsolvable.
#[derive(Debug)]
pub struct SolvedSubcircuit<'c, 'a> {
    pub ctx: SubcircuitContext<'c, 'a>,
    pub point: Option<OperatingPoint>,
}

/// Read back results for every component, in component order.
pub fn extract_all(circuit: &Circuit<'_>, solved: &[SolvedSubcircuit<'_, '_>]) -> Vec<Computed> {
    circuit
        .components
        .iter()
        .enumerate()
        .map(|(idx, component)| {
            if let Component::Microcontroller(mcu) = component {
                return extract_microcontroller(circuit, solved, idx, mcu);
            }
            let owner = solved
                .iter()
                .find(|s| s.ctx.sub.components.binary_search(&idx).is_ok());
            match owner {
                Some(SolvedSubcircuit {
                    ctx,
                    point: Some(point),
                }) => extract_component(ctx, point, idx),
                _ => Computed::zeroed(component),
            }
        })
        .collect()
}

fn extract_component(ctx: &SubcircuitContext<'_, '_>, point: &OperatingPoint, idx: usize) -> Computed {
    let circuit = ctx.circuit;
    let sol = &point.solution;
    let v = |t: usize| ctx.voltage(sol, circuit.terminal_net(idx, t));
    let component = &circuit.components[idx];

    match component {
        Component::Resistor(r) => {
            let voltage = v(0) - v(1);
            Computed::two_terminal(voltage, voltage * r.conductance(), Detail::None)
        }
        Component::Photoresistor(r) => {
            let voltage = v(0) - v(1);
            Computed::two_terminal(voltage, voltage * r.conductance(), Detail::None)
        }
        Component::Lightbulb(bulb) => {
            let voltage = v(0) - v(1);
            let current = voltage * bulb.conductance();
            let brightness = Lightbulb::brightness(voltage * current);
            Computed::two_terminal(voltage, current, Detail::Lamp { brightness })
        }
        Component::Pushbutton(btn) => {
            let (a, b) = pushbutton_terminals(circuit, btn);
            let voltage = v(a) - v(b);
            let current = voltage * btn.conductance();
            let mut terminal_currents = vec![0.0; 4];
            terminal_currents[a] += current;
            terminal_currents[b] -= current;
            Computed {
                voltage,
                current,
                power: voltage * current,
                terminal_currents,
                detail: Detail::None,
            }
        }
        Component::Potentiometer(pot) => extract_potentiometer(ctx, pot, v(0), v(1), v(2)),
        Component::SlideSwitch(_) => Computed::zeroed(component),
        Component::Led(_) => {
            let reading = slot_reading(ctx, point, idx, None);
            Computed::two_terminal(reading.forward_voltage, reading.current, Detail::Diode(reading))
        }
        Component::RgbLed(led) => extract_rgb(ctx, point, idx, led),
        Component::Multimeter(meter) => extract_meter(ctx, meter, v(0) - v(1)),
        Component::Battery(_) | Component::PowerSupply(_) => {
            let Some((k, source)) = ctx.sources_of(idx).next() else {
                return Computed::zeroed(component);
            };
            let voltage = ctx.voltage(sol, source.positive) - ctx.voltage(sol, source.negative);
            let (current, mode) = match source.current_limit {
                Some(limit) if point.limited[k] => (limit, SupplyMode::Cc),
                _ => (-sol[ctx.branch_row(k)], SupplyMode::Cv),
            };
            let detail = match source.origin {
                SourceOrigin::Supply => Detail::Supply { mode },
                _ => Detail::None,
            };
            // Delivered current leaves the positive terminal
            Computed {
                voltage,
                current,
                power: voltage * current,
                terminal_currents: vec![-current, current],
                detail,
            }
        }
        Component::Microcontroller(_) => Computed::zeroed(component),
    }
}

fn extract_potentiometer(
    ctx: &SubcircuitContext<'_, '_>,
    pot: &Potentiometer,
    va: f64,
    vw: f64,
    vb: f64,
) -> Computed {
    let voltage = va - vb;
    if wiper_floating(ctx.circuit, pot) {
        let current = voltage / pot.total();
        return Computed {
            voltage,
            current,
            power: voltage * current,
            terminal_currents: vec![current, 0.0, -current],
            detail: Detail::Potentiometer {
                segment_currents: [current, current],
            },
        };
    }

    let i_aw = (va - vw) / pot.r_aw();
    let i_wb = (vw - vb) / pot.r_wb();
    let current = if i_aw.abs() >= i_wb.abs() { i_aw } else { i_wb };
    Computed {
        voltage,
        current,
        power: i_aw * i_aw * pot.r_aw() + i_wb * i_wb * pot.r_wb(),
        terminal_currents: vec![i_aw, i_wb - i_aw, -i_wb],
        detail: Detail::Potentiometer {
            segment_currents: [i_aw, i_wb],
        },
    }
}

fn slot_reading(
    ctx: &SubcircuitContext<'_, '_>,
    point: &OperatingPoint,
    idx: usize,
    channel: Option<RgbChannel>,
) -> DiodeReading {
    let Some(slot_idx) = ctx
        .diodes
        .iter()
        .position(|s| s.component == idx && s.channel == channel)
    else {
        return DiodeReading::default();
    };
    let slot = &ctx.diodes[slot_idx];
    let sol = &point.solution;
    let forward_voltage = ctx.voltage(sol, slot.anode) - ctx.voltage(sol, slot.cathode);
    let conducting = point.hypothesis[slot_idx] && !slot.exploded;
    let current = if conducting {
        slot.params.conducting_current(forward_voltage)
    } else {
        0.0
    };
    let explosion_current = if slot.exploded {
        point.what_if.as_ref().map(|w| w[slot_idx])
    } else {
        None
    };
    DiodeReading {
        forward_voltage,
        current,
        power: forward_voltage * current,
        conducting,
        explosion_current,
    }
}

fn extract_rgb(
    ctx: &SubcircuitContext<'_, '_>,
    point: &OperatingPoint,
    idx: usize,
    led: &RgbLed,
) -> Computed {
    let channels = RgbChannel::ALL.map(|ch| slot_reading(ctx, point, idx, Some(ch)));

    let mut terminal_currents = vec![0.0; 4];
    for ch in RgbChannel::ALL {
        let (anode, cathode) = led.channel_terminals(ch);
        let current = channels[ch.index()].current;
        terminal_currents[anode] += current;
        terminal_currents[cathode] -= current;
    }

    // Report the bias of whichever die carries the most current
    let dominant = channels
        .iter()
        .fold(&channels[0], |best, c| if c.current > best.current { c } else { best });

    Computed {
        voltage: dominant.forward_voltage,
        current: channels.iter().map(|c| c.current).sum(),
        power: channels.iter().map(|c| c.power).sum(),
        terminal_currents,
        detail: Detail::RgbLed { channels },
    }
}

fn extract_meter(ctx: &SubcircuitContext<'_, '_>, meter: &Multimeter, probe: f64) -> Computed {
    let mut reading = MeterReading::idle(meter.mode);
    match meter.mode {
        MeterMode::Off => Computed::two_terminal(0.0, 0.0, Detail::Meter(reading)),
        MeterMode::Voltage => {
            reading.value = probe;
            Computed::two_terminal(probe, probe / Multimeter::VOLTAGE_SHUNT, Detail::Meter(reading))
        }
        MeterMode::Current => {
            let current = probe / Multimeter::CURRENT_SHUNT;
            reading.value = current;
            Computed::two_terminal(probe, current, Detail::Meter(reading))
        }
        MeterMode::Resistance if ctx.powered() => {
            reading.value = f64::NAN;
            reading.error = true;
            Computed::two_terminal(probe, 0.0, Detail::Meter(reading))
        }
        MeterMode::Resistance => {
            reading.value = Multimeter::ohms(probe);
            reading.open_circuit = reading.value.is_infinite();
            // The test current leaves the meter at the positive probe
            let current = Multimeter::TEST_CURRENT;
            Computed {
                voltage: probe,
                current,
                power: probe * current,
                terminal_currents: vec![-current, current],
                detail: Detail::Meter(reading),
            }
        }
    }
}

/// A microcontroller can drive several subcircuits at once, so its result
/// gathers every source it owns across all of them.
fn extract_microcontroller(
    circuit: &Circuit<'_>,
    solved: &[SolvedSubcircuit<'_, '_>],
    idx: usize,
    mcu: &Microcontroller,
) -> Computed {
    let nets = &circuit.terminal_nets[idx];
    // Any 3V3 pin landing on the net of any GND pin shorts the regulator
    let shorted = mcu.pins_with_role(PinRole::Power3v3).any(|r| {
        mcu.pins_with_role(PinRole::Ground)
            .any(|g| matches!((nets.get(r), nets.get(g)), (Some(a), Some(b)) if a == b))
    });

    let mut result = Computed::zeroed(&circuit.components[idx]);
    let mut powered = false;
    for s in solved {
        let Some(point) = &s.point else {
            continue;
        };
        for (k, source) in s.ctx.sources_of(idx) {
            let j = point.solution[s.ctx.branch_row(k)];
            let voltage = s.ctx.voltage(&point.solution, source.positive)
                - s.ctx.voltage(&point.solution, source.negative);
            result.terminal_currents[source.pos_terminal] += j;
            result.terminal_currents[source.neg_terminal] -= j;
            result.power += voltage * -j;
            if source.origin == SourceOrigin::Rail {
                powered = true;
                result.voltage = voltage;
                result.current = -j;
            }
        }
    }
    result.detail = Detail::Microcontroller { shorted, powered };
    result
}
