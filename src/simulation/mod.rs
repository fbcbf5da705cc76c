// simulation/mod.rs
// Re-exports and module declarations for simulation submodules

pub mod simulation;
pub mod stats;
pub mod step;

pub use simulation::*;
pub use stats::SimulationNumbers;
pub use step::{advance_particle, StepContext, StepTally};
