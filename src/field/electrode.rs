// field/electrode.rs
// A single electrode: its unit-voltage field and the voltage currently applied

use super::voxel::{GridCoord, GridDims, VoxelField};
use ultraviolet::Vec3;

/// One electrode of the accelerator. The stored field is the field produced
/// with 1 V applied, so any other voltage is a scalar multiple of it.
#[derive(Clone, Debug)]
pub struct Electrode {
    number: usize,
    field: VoxelField,
    voltage: f32,
}

impl Electrode {
    /// `number` is the 1-based index of the electrode within the geometry.
    pub fn new(number: usize, field: VoxelField) -> Self {
        Self {
            number,
            field,
            voltage: 1.0,
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn voltage(&self) -> f32 {
        self.voltage
    }

    pub fn apply_voltage(&mut self, voltage: f32) {
        self.voltage = voltage;
    }

    pub fn dims(&self) -> GridDims {
        self.field.dims()
    }

    pub fn unit_field(&self) -> &VoxelField {
        &self.field
    }

    /// Unit-voltage vector at `c`, zero outside the sampled grid.
    #[inline]
    pub fn stored_vector(&self, c: GridCoord) -> Vec3 {
        self.field.get(c).unwrap_or_else(Vec3::zero)
    }

    /// Field produced by this electrode at its current voltage.
    #[inline]
    pub fn field_at(&self, c: GridCoord) -> Vec3 {
        self.stored_vector(c) * self.voltage
    }
}
