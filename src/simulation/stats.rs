// simulation/stats.rs
// End-of-run particle counts

use crate::particle::{Particle, Status};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationNumbers {
    pub succeeded: usize,
    pub collided: usize,
    pub ionised: usize,
    pub neutralised: usize,
    pub total: usize,
}

impl SimulationNumbers {
    pub fn from_particles(particles: &[Particle]) -> Self {
        let mut numbers = SimulationNumbers {
            total: particles.len(),
            ..Default::default()
        };
        for p in particles {
            match p.status() {
                Status::Succeeded => numbers.succeeded += 1,
                Status::Collided => numbers.collided += 1,
                Status::Ionised => numbers.ionised += 1,
                Status::Alive => {}
            }
            if p.is_neutralised() {
                numbers.neutralised += 1;
            }
        }
        numbers
    }

    /// Particles still in flight.
    pub fn remaining(&self) -> usize {
        self.total - self.succeeded - self.collided - self.ionised
    }
}

impl fmt::Display for SimulationNumbers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of successful particles: {}", self.succeeded)?;
        writeln!(f, "Number of collided particles: {}", self.collided)?;
        writeln!(f, "Number of ionised particles: {}", self.ionised)?;
        write!(f, "Number of neutralised particles: {}", self.neutralised)
    }
}
