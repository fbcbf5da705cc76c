// voltage/mod.rs
// Electrode voltage schedules: one closed set of schemes behind a shared contract

pub mod exponential;
pub mod instantaneous;
pub mod moving_trap;

pub use exponential::ExponentialScheme;
pub use instantaneous::InstantaneousScheme;
pub use moving_trap::MovingTrapScheme;

use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::field::GridDims;
use crate::particle::Particle;
use crate::units::N_IN_SECTION;
use std::ops::Range;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemeKind {
    Instantaneous,
    Exponential,
    MovingTrap,
}

impl FromStr for SchemeKind {
    type Err = SimError;

    fn from_str(s: &str) -> SimResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instantaneous" | "instant" => Ok(SchemeKind::Instantaneous),
            "exponential" | "exp" => Ok(SchemeKind::Exponential),
            "trap" | "moving_trap" | "movingtrap" => Ok(SchemeKind::MovingTrap),
            _ => Err(SimError::UnknownScheme(s.to_string())),
        }
    }
}

impl SchemeKind {
    /// Whether the schedule is timed by the synchronous particle.
    pub fn needs_sync_particle(self) -> bool {
        !matches!(self, SchemeKind::MovingTrap)
    }
}

/// Numbers shared by every scheme.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchemeParams {
    pub max_voltage: f32,
    pub n_electrodes: usize,
    /// Longitudinal length of one section, grid units (mm).
    pub section_width: f32,
    /// Seconds per timestep.
    pub time_step: f32,
    /// m/s
    pub target_vel: f32,
    /// Total simulated time, seconds.
    pub duration: f32,
    /// Longitudinal grid length, grid units (mm).
    pub grid_length: f32,
}

impl SchemeParams {
    pub fn from_config(sim: &SimulationConfig, dims: GridDims, n_electrodes: usize) -> Self {
        let nz = dims.nz;
        Self {
            max_voltage: sim.max_voltage,
            n_electrodes,
            section_width: (N_IN_SECTION * nz) as f32 / n_electrodes.max(1) as f32,
            time_step: sim.time_step,
            target_vel: sim.target_vel,
            duration: sim.duration,
            grid_length: nz as f32,
        }
    }

    pub fn n_sections(&self) -> usize {
        self.n_electrodes / N_IN_SECTION
    }

    /// Electrodes of 1-based `section`, clipped to the electrode count.
    pub fn section_electrodes(&self, section: usize) -> Range<usize> {
        let start = (N_IN_SECTION * section.saturating_sub(1)).min(self.n_electrodes);
        let end = (N_IN_SECTION * section).min(self.n_electrodes);
        start..end
    }

    /// Voltages with only the first section switched on.
    fn first_section_on(&self) -> Vec<f32> {
        let mut voltages = vec![0.0; self.n_electrodes];
        for v in &mut voltages[self.section_electrodes(1)] {
            *v = self.max_voltage;
        }
        voltages
    }
}

/// Longitudinal state of the synchronous particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncState {
    /// Grid units (mm).
    pub z: f32,
    /// m/s
    pub vz: f32,
}

impl From<&Particle> for SyncState {
    fn from(p: &Particle) -> Self {
        Self {
            z: p.pos.z,
            vz: p.vel.z,
        }
    }
}

/// The active voltage schedule of a run.
///
/// Per timestep the simulator asks [`VoltageScheme::is_active`] and, when
/// true, applies [`VoltageScheme::voltages`] to the electrodes.
#[derive(Clone, Debug)]
pub enum VoltageScheme {
    Instantaneous(InstantaneousScheme),
    Exponential(ExponentialScheme),
    MovingTrap(MovingTrapScheme),
}

impl VoltageScheme {
    /// `sync` is the synchronous particle's initial state; `mean_k` the ensemble's average Stark number.
    pub fn new(
        kind: SchemeKind,
        params: SchemeParams,
        sync: Option<SyncState>,
        mean_k: f32,
    ) -> SimResult<Self> {
        if kind.needs_sync_particle() && sync.is_none() {
            return Err(SimError::MissingSynchronousParticle);
        }
        let scheme = match kind {
            SchemeKind::Instantaneous => VoltageScheme::Instantaneous(InstantaneousScheme::new(params)),
            SchemeKind::Exponential => {
                let sync = sync.ok_or(SimError::MissingSynchronousParticle)?;
                VoltageScheme::Exponential(ExponentialScheme::new(params, sync))
            }
            SchemeKind::MovingTrap => VoltageScheme::MovingTrap(MovingTrapScheme::new(params, mean_k)),
        };
        Ok(scheme)
    }

    pub fn kind(&self) -> SchemeKind {
        match self {
            VoltageScheme::Instantaneous(_) => SchemeKind::Instantaneous,
            VoltageScheme::Exponential(_) => SchemeKind::Exponential,
            VoltageScheme::MovingTrap(_) => SchemeKind::MovingTrap,
        }
    }

    pub fn initial_voltages(&mut self) -> &[f32] {
        match self {
            VoltageScheme::Instantaneous(s) => s.initial_voltages(),
            VoltageScheme::Exponential(s) => s.initial_voltages(),
            VoltageScheme::MovingTrap(s) => s.initial_voltages(),
        }
    }

    /// Whether the voltages must be refreshed after timestep `step`.
    pub fn is_active(&mut self, step: usize, sync: Option<SyncState>) -> bool {
        match self {
            VoltageScheme::Instantaneous(s) => s.is_active(sync),
            VoltageScheme::Exponential(s) => s.is_active(step, sync),
            VoltageScheme::MovingTrap(s) => s.is_active(),
        }
    }

    pub fn voltages(&mut self, step: usize) -> &[f32] {
        match self {
            VoltageScheme::Instantaneous(s) => s.voltages(),
            VoltageScheme::Exponential(s) => s.voltages(step),
            VoltageScheme::MovingTrap(s) => s.voltages(step),
        }
    }
}

#[cfg(test)]
mod tests;
