// simulation/simulation.rs
// The Simulator: owns geometry, ensemble and voltage scheme, and drives the timestep loop

use super::stats::SimulationNumbers;
use super::step::{advance_particle, StepContext, StepTally};
use crate::config::{SimulationConfig, StorageConfig};
use crate::error::SimResult;
use crate::field::ElectrodeLocator;
use crate::geometry::AcceleratorGeometry;
use crate::particle::Particle;
use crate::profile_scope;
use crate::voltage::{SchemeParams, SyncState, VoltageScheme};
use rayon::prelude::*;

pub struct Simulator {
    geometry: AcceleratorGeometry,
    particles: Vec<Particle>,
    scheme: VoltageScheme,
    locator: ElectrodeLocator,
    settings: SimulationConfig,
    storage: StorageConfig,
    totals: StepTally,
    field_evaluations: usize,
    steps_run: usize,
}

impl Simulator {
    /// Select the voltage scheme, build the collision mask and apply the
    /// initial voltages. The first particle is taken as synchronous.
    pub fn new(
        geometry: AcceleratorGeometry,
        particles: Vec<Particle>,
        settings: SimulationConfig,
        storage: StorageConfig,
    ) -> SimResult<Self> {
        let locator = geometry.electrode_locations(settings.collision_mask()?)?;
        log::debug!("Collision mask covers {} voxels", locator.occupied());
        let scheme = build_scheme(&geometry, &particles, &settings)?;
        let mut sim = Self {
            geometry,
            particles,
            scheme,
            locator,
            settings,
            storage,
            totals: StepTally::default(),
            field_evaluations: 0,
            steps_run: 0,
        };
        sim.apply_initial_voltages()?;
        Ok(sim)
    }

    /// Rebuild the voltage scheme for another maximum voltage. Meant for
    /// sweeps over one imported geometry, before [`Simulator::run`].
    pub fn with_max_voltage(mut self, max_voltage: f32) -> SimResult<Self> {
        self.settings = self.settings.with_max_voltage(max_voltage);
        self.scheme = build_scheme(&self.geometry, &self.particles, &self.settings)?;
        self.apply_initial_voltages()?;
        Ok(self)
    }

    fn apply_initial_voltages(&mut self) -> SimResult<()> {
        let voltages = self.scheme.initial_voltages().to_vec();
        self.geometry.apply_voltages(&voltages)
    }

    /// Integrate every particle over the configured duration.
    pub fn run(&mut self) -> SimResult<SimulationNumbers> {
        let n_steps = self.settings.n_time_steps();
        let report_every = (n_steps / 10).max(1);
        log::info!(
            "Running {} steps of {:.3e} s for {} particles ({:?} scheme, {} V)",
            n_steps,
            self.settings.time_step,
            self.particles.len(),
            self.scheme.kind(),
            self.settings.max_voltage
        );

        let dims = self.geometry.dims();
        let mut field = self.geometry.smart_field();
        for step in 0..n_steps {
            let tally = {
                profile_scope!("particle_sweep");
                let ctx = StepContext {
                    field: &field,
                    locator: &self.locator,
                    dims,
                    step,
                    time_step: self.settings.time_step,
                    inglis_teller: self.settings.inglis_teller,
                    store_trajectories: self.storage.store_trajectories,
                    store_collisions: self.storage.store_collisions,
                };
                self.particles
                    .par_iter_mut()
                    .fold(StepTally::default, |acc, p| acc + advance_particle(p, &ctx))
                    .reduce(StepTally::default, |a, b| a + b)
            };
            self.totals += tally;
            self.steps_run = step + 1;

            let sync = self.particles.first().map(SyncState::from);
            if self.scheme.is_active(step, sync) {
                profile_scope!("voltage_update");
                self.field_evaluations += field.evaluations();
                let cache = field.into_cache();
                let voltages = self.scheme.voltages(step).to_vec();
                self.geometry.apply_voltages(&voltages)?;
                field = self.geometry.smart_field_with_cache(cache);
            }

            if (step + 1) % report_every == 0 {
                log::info!(
                    "Step {}/{}: {} succeeded, {} collided, {} ionised",
                    step + 1,
                    n_steps,
                    self.totals.succeeded,
                    self.totals.collided,
                    self.totals.ionised
                );
            }
        }
        self.field_evaluations += field.evaluations();

        if !self.storage.store_trajectories {
            self.particles.par_iter_mut().for_each(|p| {
                if p.is_alive() {
                    p.memorise();
                }
                p.cut_down_memory();
            });
        }

        let numbers = self.basic_stats();
        log::info!("Run finished\n{numbers}");
        Ok(numbers)
    }

    pub fn basic_stats(&self) -> SimulationNumbers {
        SimulationNumbers::from_particles(&self.particles)
    }

    /// Event counts summed from the per-step reductions.
    pub fn totals(&self) -> StepTally {
        self.totals
    }

    /// Field magnitudes actually computed (cache misses) over the run.
    pub fn field_evaluations(&self) -> usize {
        self.field_evaluations
    }

    pub fn steps_run(&self) -> usize {
        self.steps_run
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn geometry(&self) -> &AcceleratorGeometry {
        &self.geometry
    }

    pub fn scheme(&self) -> &VoltageScheme {
        &self.scheme
    }

    pub fn locator(&self) -> &ElectrodeLocator {
        &self.locator
    }

    pub fn settings(&self) -> &SimulationConfig {
        &self.settings
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    /// Give back the geometry (for the next run of a sweep) and the ensemble.
    pub fn into_parts(self) -> (AcceleratorGeometry, Vec<Particle>) {
        (self.geometry, self.particles)
    }
}

fn build_scheme(
    geometry: &AcceleratorGeometry,
    particles: &[Particle],
    settings: &SimulationConfig,
) -> SimResult<VoltageScheme> {
    let kind = settings.scheme_kind()?;
    let params = SchemeParams::from_config(settings, geometry.dims(), geometry.n_electrodes());
    let mean_k = if particles.is_empty() {
        0.0
    } else {
        particles.iter().map(|p| p.k() as f32).sum::<f32>() / particles.len() as f32
    };
    VoltageScheme::new(kind, params, particles.first().map(SyncState::from), mean_k)
}
