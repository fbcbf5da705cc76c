// voltage/exponential.rs
// Sections ramp up exponentially over the time the synchronous particle needs to cross them

use super::{SchemeParams, SyncState};
use crate::units::mm_to_m;
use std::ops::Range;

/// Growth rate of the ramp, 1/s.
pub const RAMP_TIME_CONSTANT: f32 = 1000.0;

#[derive(Clone, Debug)]
struct Ramp {
    electrodes: Range<usize>,
    /// Seconds.
    start: f32,
    /// Seconds.
    duration: f32,
}

#[derive(Clone, Debug)]
pub struct ExponentialScheme {
    params: SchemeParams,
    section: usize,
    ramp: Option<Ramp>,
    last_crossing_time: f32,
    last_crossing_vz: f32,
    voltages: Vec<f32>,
}

impl ExponentialScheme {
    pub fn new(params: SchemeParams, sync: SyncState) -> Self {
        Self {
            params,
            section: 2,
            ramp: None,
            last_crossing_time: 0.0,
            last_crossing_vz: sync.vz,
            voltages: vec![0.0; params.n_electrodes],
        }
    }

    pub fn section(&self) -> usize {
        self.section
    }

    /// Start and length (seconds) of the current ramp, if any.
    pub fn ramp_window(&self) -> Option<(f32, f32)> {
        self.ramp.as_ref().map(|r| (r.start, r.duration))
    }

    pub fn initial_voltages(&mut self) -> &[f32] {
        self.voltages = self.params.first_section_on();
        &self.voltages
    }

    /// Time to cover one section width starting at speed `vz` with the
    /// acceleration seen since the last crossing. `None` when the particle
    /// would not get there.
    pub fn traverse_time(&self, vz: f32, now: f32) -> Option<f32> {
        let elapsed = now - self.last_crossing_time;
        let accel = if elapsed > 0.0 {
            (vz - self.last_crossing_vz) / elapsed
        } else {
            0.0
        };
        let width = mm_to_m(self.params.section_width);
        // Root of w = v t + a t^2 / 2, written to stay finite as a -> 0.
        let denom = vz + (vz * vz + 2.0 * accel * width).sqrt();
        let dt = 2.0 * width / denom;
        (dt.is_finite() && dt > 0.0).then_some(dt)
    }

    pub fn is_active(&mut self, step: usize, sync: Option<SyncState>) -> bool {
        let now = step as f32 * self.params.time_step;
        if let Some(s) = sync {
            if self.section < self.params.n_sections()
                && s.z >= self.section as f32 * self.params.section_width
            {
                self.trigger(s, now);
            }
        }
        match &self.ramp {
            Some(ramp) => {
                let into = now - ramp.start;
                into >= 0.0 && into <= ramp.duration + 0.5 * self.params.time_step
            }
            None => false,
        }
    }

    fn trigger(&mut self, sync: SyncState, now: f32) {
        let Some(duration) = self.traverse_time(sync.vz, now) else {
            return;
        };
        if let Some(previous) = self.ramp.take() {
            for v in &mut self.voltages[previous.electrodes] {
                *v = self.params.max_voltage;
            }
        }
        let electrodes = self.params.section_electrodes(self.section);
        log::debug!(
            "Ramping section {} over {:.3e} s starting at {:.3e} s",
            self.section,
            duration,
            now
        );
        self.ramp = Some(Ramp {
            electrodes,
            start: now,
            duration,
        });
        self.section += 1;
        self.last_crossing_time = now;
        self.last_crossing_vz = sync.vz;
    }

    /// Voltage of a ramping electrode `elapsed` seconds into a ramp of length `duration`.
    pub fn ramp_voltage(&self, elapsed: f32, duration: f32) -> f32 {
        if elapsed >= duration {
            return self.params.max_voltage;
        }
        let k = RAMP_TIME_CONSTANT;
        // (e^{ke} - 1) / (e^{kd} - 1) rescaled by e^{-kd} so nothing overflows for long ramps.
        let fraction =
            (-k * (duration - elapsed)).exp() * (-k * elapsed).exp_m1() / (-k * duration).exp_m1();
        if fraction.is_finite() {
            self.params.max_voltage * fraction.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn voltages(&mut self, step: usize) -> &[f32] {
        let now = step as f32 * self.params.time_step;
        if let Some(ramp) = &self.ramp {
            let elapsed = now - ramp.start;
            if elapsed >= 0.0 {
                let v = self.ramp_voltage(elapsed, ramp.duration);
                let range = ramp.electrodes.clone();
                for slot in &mut self.voltages[range] {
                    *slot = v;
                }
            }
        }
        &self.voltages
    }
}
