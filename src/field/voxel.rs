// field/voxel.rs
// Dense 3-D grid of field vectors, one per voxel

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};
use ultraviolet::Vec3;

/// Integer grid coordinate. Signed so that rounded particle positions
/// outside the grid can be represented and rejected.
pub type GridCoord = [i32; 3];

/// Extent of a voxel grid along x, y and z.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDims {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl GridDims {
    pub const fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// Number of voxels.
    pub fn len(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_array(&self) -> [usize; 3] {
        [self.nx, self.ny, self.nz]
    }

    /// Row-major offset with z fastest, or `None` outside the grid.
    #[inline]
    pub fn linear(&self, c: GridCoord) -> Option<usize> {
        let [x, y, z] = c;
        if x < 0 || y < 0 || z < 0 {
            return None;
        }
        let (x, y, z) = (x as usize, y as usize, z as usize);
        if x >= self.nx || y >= self.ny || z >= self.nz {
            return None;
        }
        Some(self.offset(x, y, z))
    }

    #[inline]
    pub fn contains(&self, c: GridCoord) -> bool {
        self.linear(c).is_some()
    }

    #[inline]
    fn offset(&self, x: usize, y: usize, z: usize) -> usize {
        (x * self.ny + y) * self.nz + z
    }
}

/// A 3-D array of 3-vectors. Each electrode owns one, holding the field it
/// produces at unit voltage.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelField {
    dims: GridDims,
    data: Vec<Vec3>,
}

impl VoxelField {
    /// Zero-filled field of the given extent.
    pub fn new(dims: GridDims) -> Self {
        Self {
            dims,
            data: vec![Vec3::zero(); dims.len()],
        }
    }

    /// Fill every voxel from a function of its coordinate.
    pub fn from_fn<F>(dims: GridDims, f: F) -> Self
    where
        F: Fn(usize, usize, usize) -> Vec3,
    {
        let mut data = Vec::with_capacity(dims.len());
        for x in 0..dims.nx {
            for y in 0..dims.ny {
                for z in 0..dims.nz {
                    data.push(f(x, y, z));
                }
            }
        }
        Self { dims, data }
    }

    pub fn uniform(dims: GridDims, value: Vec3) -> Self {
        Self {
            dims,
            data: vec![value; dims.len()],
        }
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Vector at a signed coordinate, `None` outside the grid.
    #[inline]
    pub fn get(&self, c: GridCoord) -> Option<Vec3> {
        self.dims.linear(c).map(|i| self.data[i])
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: Vec3) {
        self[(x, y, z)] = value;
    }

    /// Write one Cartesian component (0 = x, 1 = y, 2 = z) of a voxel.
    pub fn set_component(&mut self, x: usize, y: usize, z: usize, axis: usize, value: f32) {
        let v = &mut self[(x, y, z)];
        match axis {
            0 => v.x = value,
            1 => v.y = value,
            _ => v.z = value,
        }
    }

    /// Change the extent. All samples are reset to zero.
    pub fn resize(&mut self, dims: GridDims) {
        self.dims = dims;
        self.data.clear();
        self.data.resize(dims.len(), Vec3::zero());
    }

    pub fn magnitude_at(&self, c: GridCoord) -> f32 {
        self.get(c).map(|v| v.mag()).unwrap_or(0.0)
    }

    pub fn as_slice(&self) -> &[Vec3] {
        &self.data
    }

    /// Iterate voxels as `((x, y, z), vector)`.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize, usize), &Vec3)> + '_ {
        let GridDims { ny, nz, .. } = self.dims;
        self.data.iter().enumerate().map(move |(i, v)| {
            let z = i % nz;
            let y = (i / nz) % ny;
            let x = i / (nz * ny);
            ((x, y, z), v)
        })
    }
}

impl Index<(usize, usize, usize)> for VoxelField {
    type Output = Vec3;

    fn index(&self, (x, y, z): (usize, usize, usize)) -> &Vec3 {
        assert!(
            x < self.dims.nx && y < self.dims.ny && z < self.dims.nz,
            "voxel ({x}, {y}, {z}) outside {:?}",
            self.dims
        );
        &self.data[self.dims.offset(x, y, z)]
    }
}

impl IndexMut<(usize, usize, usize)> for VoxelField {
    fn index_mut(&mut self, (x, y, z): (usize, usize, usize)) -> &mut Vec3 {
        assert!(
            x < self.dims.nx && y < self.dims.ny && z < self.dims.nz,
            "voxel ({x}, {y}, {z}) outside {:?}",
            self.dims
        );
        let i = self.dims.offset(x, y, z);
        &mut self.data[i]
    }
}
