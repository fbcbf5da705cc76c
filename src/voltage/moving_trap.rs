// voltage/moving_trap.rs
// Travelling cosine potential that accelerates trapped atoms towards a target velocity

use super::SchemeParams;
use crate::units::{mm_to_m, MM_PER_M, N_IN_SECTION};
use std::f32::consts::PI;

/// Fitted trap frequency: f^2 = FREQ_C0 + FREQ_C1 * k * V, in Hz^2.
pub const FREQ_C0: f32 = -2.2e6;
pub const FREQ_C1: f32 = 4.1e5;
/// Used when the fit has no real root.
pub const FALLBACK_FREQUENCY: f32 = 20_000.0;
/// Sections per full period of the travelling wave.
const SECTIONS_PER_PERIOD: usize = 6;

/// Oscillation frequency (Hz) of an atom with mean Stark number `mean_k` in a trap at `max_voltage`.
pub fn trap_frequency(mean_k: f32, max_voltage: f32) -> f32 {
    let radicand = FREQ_C0 + FREQ_C1 * mean_k * max_voltage;
    if radicand > 0.0 {
        radicand.sqrt()
    } else {
        FALLBACK_FREQUENCY
    }
}

/// Switch-off time: the half-integer number of trap periods closest to
/// `transit`, never after `duration`.
pub fn off_time(frequency: f32, transit: f32, duration: f32) -> f32 {
    let period = 1.0 / frequency;
    let m = (transit / period - 0.5).round().max(0.0);
    ((m + 0.5) * period).min(duration)
}

#[derive(Clone, Debug)]
pub struct MovingTrapScheme {
    params: SchemeParams,
    frequency: f32,
    off_time: f32,
    switched_off: bool,
    voltages: Vec<f32>,
}

impl MovingTrapScheme {
    pub fn new(params: SchemeParams, mean_k: f32) -> Self {
        let frequency = trap_frequency(mean_k, params.max_voltage);
        let transit = mm_to_m(params.grid_length) / params.target_vel;
        let off_time = off_time(frequency, transit, params.duration);
        log::info!(
            "Moving trap at {:.1} kHz, switching off after {:.3e} s",
            frequency / 1000.0,
            off_time
        );
        Self {
            params,
            frequency,
            off_time,
            switched_off: false,
            voltages: vec![0.0; params.n_electrodes],
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn off_time(&self) -> f32 {
        self.off_time
    }

    /// Phase of the wave at time `t` seconds. Quadratic in time, i.e. the
    /// trap moves with constant acceleration.
    pub fn phase(&self, t: f32) -> f32 {
        PI * self.params.target_vel * t * t * MM_PER_M
            / (self.off_time * self.params.section_width * SECTIONS_PER_PERIOD as f32)
    }

    fn fill(&mut self, phase: f32) {
        let vmax = self.params.max_voltage;
        for (e, v) in self.voltages.iter_mut().enumerate() {
            let section = e / N_IN_SECTION;
            let angle = PI * ((section + 1) % SECTIONS_PER_PERIOD) as f32 / 3.0;
            *v = vmax * (angle - phase).cos();
        }
    }

    pub fn initial_voltages(&mut self) -> &[f32] {
        self.fill(0.0);
        &self.voltages
    }

    pub fn is_active(&self) -> bool {
        !self.switched_off
    }

    pub fn voltages(&mut self, step: usize) -> &[f32] {
        let t = step as f32 * self.params.time_step;
        if self.switched_off || t >= self.off_time {
            if !self.switched_off {
                log::info!("Moving trap switched off at {t:.3e} s");
                self.switched_off = true;
            }
            self.voltages.iter_mut().for_each(|v| *v = 0.0);
        } else {
            self.fill(self.phase(t));
        }
        &self.voltages
    }
}
