// particle/types.rs
// Rydberg atom state, status transitions and trajectory memory

use crate::field::GridCoord;
use crate::units::{BOHR_RADIUS, ELECTRON_CHARGE, F_ION, F_IT, HYDROGEN_MASS, MM_PER_M};
use serde::{Deserialize, Serialize};
use ultraviolet::Vec3;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Alive,
    Collided,
    Ionised,
    Succeeded,
}

impl Status {
    /// Collided, ionised and succeeded particles are never moved again.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Alive)
    }
}

/// Sampled positions (grid units) and velocities (m/s).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn push(&mut self, pos: Vec3, vel: Vec3) {
        self.positions.push(pos);
        self.velocities.push(vel);
    }

    pub fn clear(&mut self) {
        self.positions = Vec::new();
        self.velocities = Vec::new();
    }

    /// Keep only the first and last samples.
    pub fn cut_down(&mut self) {
        if self.positions.len() > 2 {
            let last = self.positions.len() - 1;
            self.positions.drain(1..last);
            self.velocities.drain(1..last);
            self.positions.shrink_to_fit();
            self.velocities.shrink_to_fit();
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Particle {
    /// Grid units (mm).
    pub pos: Vec3,
    /// m/s
    pub vel: Vec3,
    n: u32,
    k: i32,
    dipole_moment: f32,
    status: Status,
    neutralised_at: Option<usize>,
    max_field: f32,
    trajectory: Trajectory,
}

impl Particle {
    pub fn new(pos: Vec3, vel: Vec3, n: u32, k: i32) -> Self {
        let mut particle = Self {
            pos,
            vel,
            n,
            k,
            dipole_moment: 1.5 * n as f32 * k as f32 * ELECTRON_CHARGE * BOHR_RADIUS,
            status: Status::Alive,
            neutralised_at: None,
            max_field: 0.0,
            trajectory: Trajectory::default(),
        };
        particle.memorise();
        particle
    }

    pub fn n(&self) -> u32 {
        self.n
    }

    pub fn k(&self) -> i32 {
        self.k
    }

    pub fn mass(&self) -> f32 {
        HYDROGEN_MASS
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_alive(&self) -> bool {
        self.status == Status::Alive
    }

    /// Dipole moment felt by the field gradient. Zero once neutralised.
    pub fn dipole_moment(&self) -> f32 {
        if self.is_neutralised() {
            0.0
        } else {
            self.dipole_moment
        }
    }

    /// Dipole moment of the initial Stark state, 1.5 n k e a0.
    pub fn intrinsic_dipole_moment(&self) -> f32 {
        self.dipole_moment
    }

    /// Field (V/m) above which the atom ionises.
    pub fn ionisation_limit(&self) -> f32 {
        F_ION / (self.n as f32).powi(4)
    }

    /// Field (V/m) above which neighbouring Stark manifolds mix.
    pub fn inglis_teller_limit(&self) -> f32 {
        let n = self.n as f32;
        let k = self.k as f32;
        F_IT * (1.0 + 2.0 * n) / (n.powi(3) * (1.0 + n).powi(2) * (1.0 + k + n))
    }

    /// Hit electrode material or the grid boundary. Without `keep_history`
    /// the trajectory is dropped.
    pub fn collide(&mut self, keep_history: bool) {
        self.status = Status::Collided;
        if keep_history {
            self.memorise();
        } else {
            self.forget();
        }
    }

    pub fn ionise(&mut self) {
        self.status = Status::Ionised;
        self.memorise();
    }

    pub fn succeed(&mut self) {
        self.status = Status::Succeeded;
        self.memorise();
    }

    /// Record the timestep at which the Inglis-Teller limit was crossed. Only the first call counts.
    pub fn neutralise(&mut self, step: usize) {
        if self.neutralised_at.is_none() {
            self.neutralised_at = Some(step);
        }
    }

    pub fn is_neutralised(&self) -> bool {
        self.neutralised_at.is_some()
    }

    pub fn neutralised_at(&self) -> Option<usize> {
        self.neutralised_at
    }

    pub fn observe_field(&mut self, magnitude: f32) {
        if magnitude > self.max_field {
            self.max_field = magnitude;
        }
    }

    pub fn max_field(&self) -> f32 {
        self.max_field
    }

    /// Nearest grid voxel.
    pub fn grid_coord(&self) -> GridCoord {
        [
            self.pos.x.round() as i32,
            self.pos.y.round() as i32,
            self.pos.z.round() as i32,
        ]
    }

    /// Advance one timestep under constant acceleration (m/s^2). Velocity is
    /// updated first and the new velocity moves the particle.
    pub fn advance(&mut self, acc: Vec3, dt: f32) {
        self.vel += acc * dt;
        self.pos += (self.vel * dt + acc * (0.5 * dt * dt)) * MM_PER_M;
    }

    pub fn memorise(&mut self) {
        self.trajectory.push(self.pos, self.vel);
    }

    pub fn forget(&mut self) {
        self.trajectory.clear();
    }

    pub fn cut_down_memory(&mut self) {
        self.trajectory.cut_down();
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn recall_position(&self, i: usize) -> Option<Vec3> {
        self.trajectory.positions.get(i).copied()
    }

    pub fn recall_velocity(&self, i: usize) -> Option<Vec3> {
        self.trajectory.velocities.get(i).copied()
    }
}
