// config.rs
// Run configuration loaded from TOML: accelerator, simulation, particles, storage

use crate::error::{SimError, SimResult};
use crate::field::GridDims;
use crate::io::ExportFormat;
use crate::particle::generator::KDistribution;
use crate::units::N_IN_SECTION;
use crate::voltage::SchemeKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MIN_THREADS: usize = 3; // Minimum number of threads to use
pub const THREADS_LEAVE_FREE: usize = 2; // Number of logical cores to leave free

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    pub accelerator: AcceleratorConfig,
    pub simulation: SimulationConfig,
    pub particles: ParticlesConfig,
    pub storage: StorageConfig,
}

impl RunConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: RunConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulator cannot run with. String-valued kinds are
    /// parsed here so a typo fails before any field is imported.
    pub fn validate(&self) -> SimResult<()> {
        let acc = &self.accelerator;
        if acc.n_electrodes == 0 {
            return Err(SimError::Config("n_electrodes must be positive".into()));
        }
        if acc.dimensions.iter().any(|&d| d < 3) {
            return Err(SimError::Config(format!(
                "dimensions {:?} too small, each axis needs at least 3 samples",
                acc.dimensions
            )));
        }
        let sim = &self.simulation;
        if !(sim.time_step > 0.0) || !(sim.duration > 0.0) {
            return Err(SimError::Config("time_step and duration must be positive".into()));
        }
        if !(sim.target_vel > 0.0) {
            return Err(SimError::Config("target_vel must be positive".into()));
        }
        sim.scheme_kind()?;
        sim.collision_mask()?;
        self.particles.k_distribution()?;
        self.storage.export_format()?;
        if self.particles.n < 2 {
            return Err(SimError::Config("principal quantum number n must be at least 2".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct AcceleratorConfig {
    pub n_electrodes: usize,
    /// Potential-array extent. The stored field grid is two samples smaller per axis.
    pub dimensions: [usize; 3],
    pub dat_directory: PathBuf,
    pub pa_name: String,
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        Self {
            n_electrodes: 36,
            dimensions: [54, 54, 200],
            dat_directory: PathBuf::from("."),
            pa_name: "cylinder".to_string(),
        }
    }
}

impl AcceleratorConfig {
    pub fn grid_dims(&self) -> GridDims {
        let [x, y, z] = self.dimensions;
        GridDims::new(x.saturating_sub(2), y.saturating_sub(2), z.saturating_sub(2))
    }

    /// Longitudinal length of one section of electrodes, in grid units.
    pub fn section_width(&self) -> f32 {
        (N_IN_SECTION * self.grid_dims().nz) as f32 / self.n_electrodes as f32
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub time_step: f32,
    pub duration: f32,
    pub max_voltage: f32,
    pub target_vel: f32,
    pub accel_scheme: String,
    pub inglis_teller: bool,
    /// "union", "none" or "electrode:N".
    pub collision_mask: String,
    pub seed: Option<u64>,
    /// Maximum voltages to run one after another on the same geometry. Empty runs `max_voltage` once.
    pub sweep: Vec<f32>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_step: 1e-6,
            duration: 6e-4,
            max_voltage: 100.0,
            target_vel: 500.0,
            accel_scheme: "trap".to_string(),
            inglis_teller: false,
            collision_mask: "union".to_string(),
            seed: None,
            sweep: Vec::new(),
        }
    }
}

impl SimulationConfig {
    pub fn scheme_kind(&self) -> SimResult<SchemeKind> {
        self.accel_scheme.parse()
    }

    pub fn collision_mask(&self) -> SimResult<CollisionMask> {
        self.collision_mask.parse()
    }

    pub fn n_time_steps(&self) -> usize {
        (self.duration / self.time_step).round().max(0.0) as usize
    }

    /// Voltages to run, in order.
    pub fn sweep_voltages(&self) -> Vec<f32> {
        if self.sweep.is_empty() {
            vec![self.max_voltage]
        } else {
            self.sweep.clone()
        }
    }

    pub fn with_max_voltage(&self, max_voltage: f32) -> Self {
        Self {
            max_voltage,
            ..self.clone()
        }
    }
}

/// Which electrodes contribute to the collision mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionMask {
    Disabled,
    Union,
    /// A single electrode, 1-based.
    Electrode(usize),
}

impl std::str::FromStr for CollisionMask {
    type Err = SimError;

    fn from_str(s: &str) -> SimResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "disabled" => Ok(CollisionMask::Disabled),
            "union" => Ok(CollisionMask::Union),
            other => other
                .strip_prefix("electrode:")
                .and_then(|n| n.trim().parse::<usize>().ok())
                .filter(|&n| n > 0)
                .map(CollisionMask::Electrode)
                .ok_or_else(|| SimError::UnknownCollisionMask(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ParticlesConfig {
    pub n_particles: usize,
    pub norm_dist: bool,
    /// Position spread of the normal cloud, grid units.
    pub sigma: [f32; 3],
    /// Ensemble temperature in kelvin.
    pub temperature: f32,
    pub n: u32,
    pub k: i32,
    pub k_dist: String,
    /// Longitudinal start of the synchronous particle, grid units.
    pub sync_start: f32,
}

impl Default for ParticlesConfig {
    fn default() -> Self {
        Self {
            n_particles: 50_000,
            norm_dist: false,
            sigma: [0.5, 0.5, 5.0],
            temperature: 1.0,
            n: 25,
            k: 20,
            k_dist: "single".to_string(),
            sync_start: 55.0,
        }
    }
}

impl ParticlesConfig {
    pub fn k_distribution(&self) -> SimResult<KDistribution> {
        match self.k_dist.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(KDistribution::Single(self.k)),
            "uniform" => Ok(KDistribution::Uniform),
            "triangle" => Ok(KDistribution::Triangle),
            _ => Err(SimError::UnknownDistribution(self.k_dist.clone())),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub output_dir: PathBuf,
    pub store_trajectories: bool,
    pub store_collisions: bool,
    /// "json" or "bincode".
    pub format: String,
    pub compress: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            store_trajectories: true,
            store_collisions: true,
            format: "json".to_string(),
            compress: true,
        }
    }
}

impl StorageConfig {
    pub fn export_format(&self) -> SimResult<ExportFormat> {
        match self.format.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "bincode" | "binary" => Ok(ExportFormat::Binary),
            other => Err(SimError::Config(format!("unknown storage format '{other}'"))),
        }
    }

    /// Default output file for a run at the given maximum voltage.
    pub fn output_path(&self, max_voltage: f32) -> PathBuf {
        let ext = match (self.export_format(), self.compress) {
            (Ok(ExportFormat::Binary), true) => "bin.gz",
            (Ok(ExportFormat::Binary), false) => "bin",
            (_, true) => "json.gz",
            (_, false) => "json",
        };
        self.output_dir.join(format!("trajectories_{max_voltage}V.{ext}"))
    }
}
