// field/mod.rs
// Electrode field maps, their superposition, and the collision mask

pub mod electrode;
pub mod import;
pub mod locator;
pub mod smart;
pub mod voxel;

pub use electrode::Electrode;
pub use import::{DatFieldReader, FieldSource, FnFieldSource, UniformFieldSource};
pub use locator::ElectrodeLocator;
pub use smart::{MagnitudeCache, SmartField};
pub use voxel::{GridCoord, GridDims, VoxelField};
