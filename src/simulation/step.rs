// simulation/step.rs
// Per-particle physics for one timestep and the counters it reduces into

use crate::field::{ElectrodeLocator, GridDims, SmartField};
use crate::particle::Particle;
use std::ops::{Add, AddAssign};

/// Events counted during a sweep. Summed across rayon workers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepTally {
    pub collided: usize,
    pub ionised: usize,
    pub succeeded: usize,
    pub neutralised: usize,
    /// Particles that reached the force and integration stage.
    pub integrated: usize,
}

impl Add for StepTally {
    type Output = StepTally;

    fn add(self, rhs: StepTally) -> StepTally {
        StepTally {
            collided: self.collided + rhs.collided,
            ionised: self.ionised + rhs.ionised,
            succeeded: self.succeeded + rhs.succeeded,
            neutralised: self.neutralised + rhs.neutralised,
            integrated: self.integrated + rhs.integrated,
        }
    }
}

impl AddAssign for StepTally {
    fn add_assign(&mut self, rhs: StepTally) {
        *self = *self + rhs;
    }
}

/// Read-only inputs shared by every particle in a sweep.
pub struct StepContext<'a> {
    pub field: &'a SmartField<'a>,
    pub locator: &'a ElectrodeLocator,
    pub dims: GridDims,
    pub step: usize,
    pub time_step: f32,
    pub inglis_teller: bool,
    pub store_trajectories: bool,
    pub store_collisions: bool,
}

impl StepContext<'_> {
    /// Boundary layer or electrode material.
    pub fn collides_at(&self, [x, y, z]: [i32; 3]) -> bool {
        let nx = self.dims.nx as i32;
        let ny = self.dims.ny as i32;
        x <= 1 || y <= 1 || z <= 1 || x >= nx - 1 || y >= ny - 1 || self.locator.exists_at([x, y, z])
    }
}

/// Classify and move one particle. The checks run in a fixed order and the
/// terminal ones end the step for this particle.
pub fn advance_particle(p: &mut Particle, ctx: &StepContext<'_>) -> StepTally {
    let mut tally = StepTally::default();
    if p.status().is_terminal() {
        return tally;
    }

    let c = p.grid_coord();
    if ctx.collides_at(c) {
        p.collide(ctx.store_collisions);
        tally.collided = 1;
        return tally;
    }

    let magnitude = ctx.field.magnitude_at(c);
    if magnitude >= p.ionisation_limit() {
        p.ionise();
        tally.ionised = 1;
        return tally;
    }

    if ctx.inglis_teller && !p.is_neutralised() && magnitude >= p.inglis_teller_limit() {
        p.neutralise(ctx.step);
        tally.neutralised = 1;
    }

    if c[2] >= ctx.dims.nz as i32 {
        p.succeed();
        tally.succeeded = 1;
        return tally;
    }

    p.observe_field(magnitude);

    let acc = ctx.field.gradient_at(c) * (p.dipole_moment() / p.mass());
    p.advance(acc, ctx.time_step);
    tally.integrated = 1;

    if ctx.store_trajectories {
        p.memorise();
    }
    tally
}
