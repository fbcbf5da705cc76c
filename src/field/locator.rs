// field/locator.rs
// Boolean mask of voxels occupied by electrode material

use super::electrode::Electrode;
use super::voxel::{GridCoord, GridDims};

/// Marks voxels that are treated as solid electrode for collision testing.
///
/// Material is detected from a zero-field signature: a voxel is solid where
/// the transverse (y) component of an electrode's unit-voltage field is
/// exactly zero. The comparison is an exact float equality and has not been
/// validated against real geometries, so the mask is a derived view rather
/// than ground truth.
#[derive(Clone, Debug)]
pub struct ElectrodeLocator {
    dims: GridDims,
    mask: Vec<bool>,
}

impl ElectrodeLocator {
    /// A mask with no material anywhere.
    pub fn empty(dims: GridDims) -> Self {
        Self {
            dims,
            mask: vec![false; dims.len()],
        }
    }

    /// Mask derived from a single electrode.
    pub fn from_electrode(electrode: &Electrode) -> Self {
        let mask = electrode
            .unit_field()
            .as_slice()
            .iter()
            .map(|v| v.y == 0.0)
            .collect();
        Self {
            dims: electrode.dims(),
            mask,
        }
    }

    /// Union of the per-electrode masks.
    pub fn from_electrodes<'a, I>(dims: GridDims, electrodes: I) -> Self
    where
        I: IntoIterator<Item = &'a Electrode>,
    {
        let mut locator = Self::empty(dims);
        for electrode in electrodes {
            locator.merge(&Self::from_electrode(electrode));
        }
        locator
    }

    /// OR another mask of the same extent into this one.
    pub fn merge(&mut self, other: &ElectrodeLocator) {
        debug_assert_eq!(self.dims, other.dims);
        for (a, b) in self.mask.iter_mut().zip(&other.mask) {
            *a |= *b;
        }
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Whether electrode material occupies `c`. Outside the grid there is none.
    #[inline]
    pub fn exists_at(&self, c: GridCoord) -> bool {
        self.dims.linear(c).map(|i| self.mask[i]).unwrap_or(false)
    }

    /// Number of solid voxels.
    pub fn occupied(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}
