// particle/mod.rs
// Re-exports for the particle module

mod types;
pub mod generator;

pub use generator::{EnsembleGenerator, KDistribution};
pub use types::*;

#[cfg(test)]
mod tests;
