// particle/generator.rs
// Initial ensemble: the synchronous particle followed by a thermal cloud

use super::Particle;
use crate::config::{AcceleratorConfig, ParticlesConfig};
use crate::error::{SimError, SimResult};
use crate::field::GridDims;
use crate::units::{BOLTZMANN, FWHM_FACTOR, HYDROGEN_MASS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, StandardNormal, Triangular};
use std::f32::consts::PI;
use ultraviolet::Vec3;

/// Transverse margin (grid units) kept between the uniform cloud and the electrodes.
const CYLINDER_MARGIN: f32 = 5.0;

/// How Stark numbers k are assigned across the ensemble.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KDistribution {
    Single(i32),
    /// Uniform over 1..=n-1.
    Uniform,
    /// Linearly falling density from 0 to n.
    Triangle,
}

impl KDistribution {
    pub fn sample<R: Rng>(&self, n: u32, rng: &mut R) -> i32 {
        let n = n.max(2) as i32;
        match *self {
            KDistribution::Single(k) => k,
            KDistribution::Uniform => rng.random_range(1..n),
            KDistribution::Triangle => match Triangular::new(0.0f32, n as f32, 0.0) {
                Ok(tri) => (tri.sample(rng).floor() as i32).clamp(0, n - 1),
                Err(_) => 0,
            },
        }
    }
}

pub struct EnsembleGenerator {
    config: ParticlesConfig,
    k_dist: KDistribution,
    dims: GridDims,
    section_width: f32,
    sigma_v: f32,
    rng: StdRng,
}

impl EnsembleGenerator {
    /// With a seed the ensemble is reproducible; without one the OS provides entropy.
    pub fn new(
        particles: &ParticlesConfig,
        accelerator: &AcceleratorConfig,
        seed: Option<u64>,
    ) -> SimResult<Self> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            config: particles.clone(),
            k_dist: particles.k_distribution()?,
            dims: accelerator.grid_dims(),
            section_width: accelerator.section_width(),
            sigma_v: thermal_velocity_spread(particles.temperature),
            rng,
        })
    }

    pub fn sigma_v(&self) -> f32 {
        self.sigma_v
    }

    fn centre(&self) -> (f32, f32) {
        (0.5 * self.dims.nx as f32, 0.5 * self.dims.ny as f32)
    }

    /// Reference particle on axis at `sync_start`, at rest.
    pub fn synchronous(&self) -> Particle {
        let (cx, cy) = self.centre();
        Particle::new(
            Vec3::new(cx, cy, self.config.sync_start),
            Vec3::zero(),
            self.config.n,
            self.config.k,
        )
    }

    /// `n_particles` particles, the first one synchronous.
    pub fn generate(&mut self) -> SimResult<Vec<Particle>> {
        let total = self.config.n_particles;
        let mut particles = Vec::with_capacity(total);
        if total == 0 {
            return Ok(particles);
        }
        particles.push(self.synchronous());

        if self.config.norm_dist {
            let (cx, cy) = self.centre();
            let [sx, sy, sz] = self.config.sigma;
            let normal = |mean: f32, sd: f32| {
                Normal::new(mean, sd).map_err(|e| SimError::Config(format!("bad spread {sd}: {e}")))
            };
            let px = normal(cx, sx)?;
            let py = normal(cy, sy)?;
            let pz = normal(self.config.sync_start, sz)?;
            let v = normal(0.0, self.sigma_v)?;
            for _ in 1..total {
                let pos = Vec3::new(px.sample(&mut self.rng), py.sample(&mut self.rng), pz.sample(&mut self.rng));
                let vel = Vec3::new(v.sample(&mut self.rng), v.sample(&mut self.rng), v.sample(&mut self.rng));
                let k = self.k_dist.sample(self.config.n, &mut self.rng);
                particles.push(Particle::new(pos, vel, self.config.n, k));
            }
        } else {
            for _ in 1..total {
                let (pos, vel) = self.uniform_cylinder_state();
                let k = self.k_dist.sample(self.config.n, &mut self.rng);
                particles.push(Particle::new(pos, vel, self.config.n, k));
            }
        }
        log::info!(
            "Generated {} particles (sigma_v = {:.1} m/s, {})",
            particles.len(),
            self.sigma_v,
            if self.config.norm_dist { "normal cloud" } else { "uniform cylinder" }
        );
        Ok(particles)
    }

    /// Uniform disc across the bore, three sections long, with isotropic
    /// velocities up to twice the thermal spread.
    fn uniform_cylinder_state(&mut self) -> (Vec3, Vec3) {
        let (cx, cy) = self.centre();
        let theta = 2.0 * PI * self.rng.random::<f32>();
        let r = (cy - CYLINDER_MARGIN).max(0.0) * self.rng.random::<f32>().sqrt();
        let z = self.section_width * (3.0 * self.rng.random::<f32>() + 1.0);
        let pos = Vec3::new(cx + r * theta.cos(), cy + r * theta.sin(), z);

        let speed = 2.0 * self.sigma_v * self.rng.random::<f32>().cbrt();
        let vel = random_direction(&mut self.rng) * speed;
        (pos, vel)
    }
}

/// Velocity spread (m/s) of hydrogen at `temperature` kelvin.
pub fn thermal_velocity_spread(temperature: f32) -> f32 {
    (2.0 * (temperature * BOLTZMANN / FWHM_FACTOR) / HYDROGEN_MASS).sqrt()
}

/// Unit vector uniformly distributed on the sphere (normalised Gaussian triple).
fn random_direction<R: Rng>(rng: &mut R) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.sample(StandardNormal),
            rng.sample(StandardNormal),
            rng.sample(StandardNormal),
        );
        let mag = v.mag();
        if mag > f32::EPSILON {
            return v / mag;
        }
    }
}
