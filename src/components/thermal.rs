//! LED thermal and failure state machine.
//!
//! Each LED (and each die of an RGB LED) carries a [`LedRuntimeState`] that
//! survives across ticks. Once per tick the host feeds it the electrical
//! quantities the solver extracted, and the state moves through
//!
//! ```text
//! Off -> On <-> Hot -> Exploded
//! ```
//!
//! `Exploded` is terminal. Overload beyond 1.2x the rating fails the die at
//! once; milder overload heats it until a delayed explosion is scheduled.
//! All randomness (explosion delay, flicker) is derived from the per-device
//! seed so a replayed circuit fails identically.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::diode::LedParams;

/// Tunables shared by every LED.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalParams {
    /// At or below this |forward voltage| a die never heats or fails
    pub low_voltage_bypass: f64,
    /// Reverse bias beyond this fails the die instantly
    pub reverse_voltage_limit: f64,
    /// Current or power above this multiple of the rating fails instantly
    pub instant_failure_factor: f64,
    /// Thermal energy gained per unit of stress per second
    pub heat_gain_rate: f64,
    /// Thermal energy shed per second while not conducting
    pub cooldown_rate: f64,
    /// Thermal energy at which an explosion is scheduled
    pub explosion_threshold: f64,
    /// Thermal energy above which the die visibly flickers
    pub flicker_threshold: f64,
    /// Minimum delay between scheduling and exploding, in seconds
    pub explosion_delay: f64,
    /// Additional seeded random delay, in seconds
    pub explosion_jitter: f64,
    /// Smallest current that counts as conducting
    pub conduction_current: f64,
    /// Perceptual gamma applied to the current ratio
    pub gamma: f64,
    /// Largest fraction of brightness the flicker can remove
    pub flicker_depth: f64,
}

impl Default for ThermalParams {
    fn default() -> Self {
        Self {
            low_voltage_bypass: 2.2,
            reverse_voltage_limit: 5.0,
            instant_failure_factor: 1.2,
            heat_gain_rate: 0.8,
            cooldown_rate: 0.35,
            explosion_threshold: 1.0,
            flicker_threshold: 0.6,
            explosion_delay: 0.25,
            explosion_jitter: 0.5,
            conduction_current: 1e-4,
            gamma: 2.2,
            flicker_depth: 0.35,
        }
    }
}

/// What the renderer should draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualState {
    #[default]
    Off,
    On,
    Hot,
    Exploded,
}

/// Why a die failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    ReverseBreakdown,
    Overcurrent,
    Overpower,
    ThermalRunaway,
}

/// Electrical quantities of one die for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElectricalInputs {
    /// Anode minus cathode voltage (negative when reverse biased)
    pub forward_voltage: f64,
    /// Forward current
    pub current: f64,
    /// Dissipated power
    pub power: f64,
}

/// Persistent per-die state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedRuntimeState {
    pub brightness: f64,
    pub thermal_energy: f64,
    pub exploded: bool,
    pub visual: VisualState,
    /// Time at which a scheduled explosion fires
    pub explode_at: Option<f64>,
    pub seed: u64,
    pub failure_reason: Option<FailureReason>,
    /// Current through the die when it failed
    pub explosion_current: Option<f64>,
}

impl LedRuntimeState {
    /// Create a fresh, cold state.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Derive a stable seed from a component id and a per-die salt.
    pub fn seed_for(id: &str, salt: u64) -> u64 {
        // FNV-1a
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in id.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        splitmix64(hash ^ salt.wrapping_mul(0x9e37_79b9_7f4a_7c15)).max(1)
    }

    /// Deterministic value in [0, 1) for this device and stream.
    pub fn jitter(&self, stream: u64) -> f64 {
        let bits = splitmix64(self.seed.wrapping_add(stream.wrapping_mul(0x9e37_79b9_7f4a_7c15)));
        (bits >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Compute the next state from this tick's electrical inputs.
    pub fn advance(
        &self,
        params: &LedParams,
        thermal: &ThermalParams,
        inputs: ElectricalInputs,
        dt: f64,
        now: f64,
    ) -> Self {
        let mut next = self.clone();
        if next.exploded {
            next.settle_exploded(thermal);
            return next;
        }

        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let v = finite_or_zero(inputs.forward_voltage);
        let i = finite_or_zero(inputs.current).max(0.0);
        let p = finite_or_zero(inputs.power).abs();

        if v < -thermal.reverse_voltage_limit {
            next.explode(FailureReason::ReverseBreakdown, i, now, thermal);
            return next;
        }

        let bypass = v.abs() <= thermal.low_voltage_bypass;
        if !bypass {
            if i > thermal.instant_failure_factor * params.max_current {
                next.explode(FailureReason::Overcurrent, i, now, thermal);
                return next;
            }
            if p > thermal.instant_failure_factor * params.max_power {
                next.explode(FailureReason::Overpower, i, now, thermal);
                return next;
            }
        }

        let conducting = i > thermal.conduction_current;
        let stress = (i / params.max_current).max(p / params.max_power) - 1.0;
        if !conducting {
            next.thermal_energy = (next.thermal_energy - thermal.cooldown_rate * dt).max(0.0);
        } else if !bypass && stress > 0.0 {
            next.thermal_energy += stress * thermal.heat_gain_rate * dt;
        }

        if next.explode_at.is_none() && next.thermal_energy >= thermal.explosion_threshold {
            let delay = thermal.explosion_delay + thermal.explosion_jitter * self.jitter(0);
            next.explode_at = Some(now + delay);
        }
        if let Some(at) = next.explode_at {
            if now >= at {
                next.explode(FailureReason::ThermalRunaway, i, now, thermal);
                return next;
            }
        }

        next.brightness = next.flickered_brightness(i / params.max_current, now, thermal);
        next.visual = if next.brightness < 0.02 {
            VisualState::Off
        } else if next.thermal_energy >= thermal.flicker_threshold || next.explode_at.is_some() {
            VisualState::Hot
        } else {
            VisualState::On
        };
        next
    }

    fn flickered_brightness(&self, ratio: f64, now: f64, thermal: &ThermalParams) -> f64 {
        let base = ratio.clamp(0.0, 1.0).powf(1.0 / thermal.gamma);
        if self.thermal_energy <= thermal.flicker_threshold {
            return base;
        }
        let span = (thermal.explosion_threshold - thermal.flicker_threshold).max(f64::EPSILON);
        let intensity = ((self.thermal_energy - thermal.flicker_threshold) / span).clamp(0.0, 1.0);
        let frequency = 8.0 + 6.0 * self.jitter(1);
        let phase = TAU * self.jitter(2);
        let wave = 0.5 + 0.5 * (TAU * frequency * finite_or_zero(now) + phase).sin();
        (base * (1.0 - thermal.flicker_depth * intensity * wave)).clamp(0.0, 1.0)
    }

    fn explode(&mut self, reason: FailureReason, current: f64, now: f64, thermal: &ThermalParams) {
        self.exploded = true;
        self.failure_reason = Some(reason);
        self.explosion_current = Some(current);
        self.explode_at.get_or_insert(now);
        self.settle_exploded(thermal);
        log::info!("LED exploded ({reason:?}) at {current:.3} A");
    }

    fn settle_exploded(&mut self, thermal: &ThermalParams) {
        self.brightness = 0.0;
        self.thermal_energy = self.thermal_energy.max(thermal.explosion_threshold);
        self.visual = VisualState::Exploded;
    }
}

/// Advance a die's runtime state by one tick.
pub fn advance_runtime(
    prev: &LedRuntimeState,
    params: &LedParams,
    inputs: ElectricalInputs,
    dt: f64,
    now: f64,
) -> LedRuntimeState {
    prev.advance(params, &ThermalParams::default(), inputs, dt, now)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::LedColor;

    fn inputs(forward_voltage: f64, current: f64) -> ElectricalInputs {
        ElectricalInputs {
            forward_voltage,
            current,
            power: forward_voltage * current,
        }
    }

    #[test]
    fn test_normal_operation_lights_without_heating() {
        let params = LedColor::Red.params();
        let state = LedRuntimeState::new(7);
        let next = advance_runtime(&state, &params, inputs(2.4, 0.015), 0.1, 0.0);
        assert!(!next.exploded);
        assert_eq!(next.thermal_energy, 0.0);
        assert_eq!(next.visual, VisualState::On);
        assert!(next.brightness > 0.5 && next.brightness < 1.0);
    }

    /// Inputs for a die conducting `current` on its own V-I curve.
    fn conducting(params: &LedParams, current: f64) -> ElectricalInputs {
        inputs(params.forward_voltage + current * params.series_resistance, current)
    }

    #[test]
    fn test_overcurrent_explodes_and_stays_exploded() {
        let params = LedColor::Blue.params();
        let overload = conducting(&params, 1.3 * params.max_current);
        assert!(overload.forward_voltage > ThermalParams::default().low_voltage_bypass);

        let mut state = LedRuntimeState::new(7);
        let mut now = 0.0;
        for _ in 0..5 {
            state = advance_runtime(&state, &params, overload, 0.05, now);
            now += 0.05;
        }
        assert!(state.exploded);
        assert_eq!(state.visual, VisualState::Exploded);
        assert_eq!(state.failure_reason, Some(FailureReason::Overcurrent));

        for _ in 0..5 {
            state = advance_runtime(&state, &params, inputs(0.0, 0.0), 0.05, now);
            now += 0.05;
        }
        assert!(state.exploded);
        assert_eq!(state.brightness, 0.0);
        assert!(state.thermal_energy >= ThermalParams::default().explosion_threshold);
        assert!(state.explosion_current.is_some());
    }

    #[test]
    fn test_low_voltage_bypass_never_heats() {
        let params = LedColor::Red.params();
        let mut state = LedRuntimeState::new(3);
        for tick in 0..100 {
            state = advance_runtime(&state, &params, inputs(1.5, 4.0 * params.max_current), 0.5, tick as f64 * 0.5);
        }
        assert!(!state.exploded);
        assert_eq!(state.thermal_energy, 0.0);
        assert_eq!(state.brightness, 1.0);
    }

    #[test]
    fn test_reverse_breakdown_is_instant() {
        let params = LedColor::Blue.params();
        let state = LedRuntimeState::new(3);
        let next = advance_runtime(&state, &params, inputs(-9.0, 0.0), 0.1, 1.0);
        assert!(next.exploded);
        assert_eq!(next.failure_reason, Some(FailureReason::ReverseBreakdown));
    }

    #[test]
    fn test_mild_overload_heats_then_explodes_after_delay() {
        let params = LedColor::Blue.params();
        let thermal = ThermalParams::default();
        let mut state = LedRuntimeState::new(11);
        let overload = conducting(&params, 1.1 * params.max_current);

        let mut saw_hot = false;
        let mut now = 0.0;
        for _ in 0..30 {
            now += 1.0;
            state = state.advance(&params, &thermal, overload, 1.0, now);
            saw_hot |= state.visual == VisualState::Hot;
            if state.exploded {
                break;
            }
        }
        assert!(saw_hot);
        assert!(state.exploded);
        assert_eq!(state.failure_reason, Some(FailureReason::ThermalRunaway));
    }

    #[test]
    fn test_cooldown_when_current_stops() {
        let params = LedColor::Red.params();
        let thermal = ThermalParams::default();
        let mut state = LedRuntimeState::new(1);
        state.thermal_energy = 0.5;
        let next = state.advance(&params, &thermal, inputs(0.0, 0.0), 1.0, 0.0);
        assert!((next.thermal_energy - 0.15).abs() < 1e-12);
        let cold = next.advance(&params, &thermal, inputs(0.0, 0.0), 10.0, 1.0);
        assert_eq!(cold.thermal_energy, 0.0);
    }

    #[test]
    fn test_heat_is_held_while_conducting_within_rating() {
        let params = LedColor::Blue.params();
        let thermal = ThermalParams::default();
        let mut state = LedRuntimeState::new(5);
        state.thermal_energy = 0.5;

        let within = conducting(&params, 0.9 * params.max_current);
        assert!(within.forward_voltage > thermal.low_voltage_bypass);
        let next = state.advance(&params, &thermal, within, 1.0, 0.0);
        assert_eq!(next.thermal_energy, 0.5);

        // Lit below the bypass voltage it neither heats nor cools
        let dim = inputs(2.0, 0.5 * params.max_current);
        let next = state.advance(&params, &thermal, dim, 1.0, 0.0);
        assert_eq!(next.thermal_energy, 0.5);
    }

    #[test]
    fn test_jitter_is_reproducible_per_seed() {
        let a = LedRuntimeState::new(LedRuntimeState::seed_for("LED1", 0));
        let b = LedRuntimeState::new(LedRuntimeState::seed_for("LED1", 0));
        let c = LedRuntimeState::new(LedRuntimeState::seed_for("LED2", 0));
        assert_eq!(a.jitter(0), b.jitter(0));
        assert_ne!(a.jitter(0), c.jitter(0));
        assert!((0.0..1.0).contains(&a.jitter(5)));
    }
}
