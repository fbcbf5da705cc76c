// field/smart.rs
// Lazy superposition of electrode fields with memoized magnitudes

use super::electrode::Electrode;
use super::voxel::{GridCoord, GridDims};
use crate::units::MM_PER_M;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use ultraviolet::Vec3;

/// Flat per-voxel store of field magnitudes with a validity bitset.
///
/// Safe to fill from many threads at once. Two threads racing on the same
/// voxel compute the same value, so whichever store lands last is correct.
/// The value is written before its valid bit is published (Release) and
/// read after the bit is observed (Acquire).
pub struct MagnitudeCache {
    dims: GridDims,
    values: Vec<AtomicU32>,
    valid: Vec<AtomicU64>,
}

impl MagnitudeCache {
    pub fn new(dims: GridDims) -> Self {
        let n = dims.len();
        Self {
            dims,
            values: (0..n).map(|_| AtomicU32::new(0)).collect(),
            valid: (0..n.div_ceil(64)).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<f32> {
        let bit = 1u64 << (index % 64);
        if self.valid[index / 64].load(Ordering::Acquire) & bit != 0 {
            Some(f32::from_bits(self.values[index].load(Ordering::Relaxed)))
        } else {
            None
        }
    }

    #[inline]
    pub fn insert(&self, index: usize, value: f32) {
        self.values[index].store(value.to_bits(), Ordering::Relaxed);
        self.valid[index / 64].fetch_or(1u64 << (index % 64), Ordering::Release);
    }

    /// Forget every entry. Requires exclusive access, so no query can be in flight.
    pub fn clear(&mut self) {
        for word in &mut self.valid {
            *word.get_mut() = 0;
        }
    }

    /// Number of cached voxels.
    pub fn len(&self) -> usize {
        self.valid
            .iter()
            .map(|w| w.load(Ordering::Relaxed).count_ones() as usize)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Queryable view of the total field of a set of electrodes at their
/// current voltages.
///
/// Vectors are summed on demand; magnitudes are memoized per voxel. The
/// cache is only valid for the voltages in effect when the field was built:
/// after any voltage change the field must be rebuilt (or [`SmartField::invalidate`]d)
/// before it is queried again.
pub struct SmartField<'a> {
    electrodes: &'a [Electrode],
    cache: MagnitudeCache,
    evaluations: AtomicUsize,
}

impl<'a> SmartField<'a> {
    pub fn new(electrodes: &'a [Electrode], dims: GridDims) -> Self {
        Self::with_cache(electrodes, MagnitudeCache::new(dims))
    }

    /// Build on top of a recycled cache allocation. The cache is cleared.
    pub fn with_cache(electrodes: &'a [Electrode], mut cache: MagnitudeCache) -> Self {
        cache.clear();
        Self {
            electrodes,
            cache,
            evaluations: AtomicUsize::new(0),
        }
    }

    /// Give back the cache allocation so it can be reused after voltages change.
    pub fn into_cache(self) -> MagnitudeCache {
        self.cache
    }

    pub fn dims(&self) -> GridDims {
        self.cache.dims()
    }

    pub fn electrodes(&self) -> &'a [Electrode] {
        self.electrodes
    }

    /// Superposed field vector: sum of voltage times stored vector over all electrodes.
    pub fn vector_at(&self, c: GridCoord) -> Vec3 {
        self.electrodes
            .iter()
            .fold(Vec3::zero(), |acc, electrode| acc + electrode.field_at(c))
    }

    /// |E| at `c`, computed once per voxel and then served from the cache.
    pub fn magnitude_at(&self, c: GridCoord) -> f32 {
        match self.cache.dims().linear(c) {
            Some(index) => {
                if let Some(mag) = self.cache.get(index) {
                    return mag;
                }
                let mag = self.vector_at(c).mag();
                self.evaluations.fetch_add(1, Ordering::Relaxed);
                self.cache.insert(index, mag);
                mag
            }
            // Field is zero outside the sampled grid.
            None => 0.0,
        }
    }

    /// d|E|/dx by central difference, in V/m per metre.
    pub fn gradient_x_at(&self, [x, y, z]: GridCoord) -> f32 {
        0.5 * MM_PER_M * (self.magnitude_at([x + 1, y, z]) - self.magnitude_at([x - 1, y, z]))
    }

    pub fn gradient_y_at(&self, [x, y, z]: GridCoord) -> f32 {
        0.5 * MM_PER_M * (self.magnitude_at([x, y + 1, z]) - self.magnitude_at([x, y - 1, z]))
    }

    pub fn gradient_z_at(&self, [x, y, z]: GridCoord) -> f32 {
        0.5 * MM_PER_M * (self.magnitude_at([x, y, z + 1]) - self.magnitude_at([x, y, z - 1]))
    }

    pub fn gradient_at(&self, c: GridCoord) -> Vec3 {
        Vec3::new(self.gradient_x_at(c), self.gradient_y_at(c), self.gradient_z_at(c))
    }

    /// Discard all memoized magnitudes.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    /// How many magnitudes have actually been computed (cache misses).
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
