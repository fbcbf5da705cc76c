// geometry.rs
// The accelerator: an arena of electrodes sharing one grid

use crate::config::{AcceleratorConfig, CollisionMask};
use crate::error::{SimError, SimResult};
use crate::field::{
    Electrode, ElectrodeLocator, FieldSource, GridDims, MagnitudeCache, SmartField, VoxelField,
};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Owns every electrode. Fields and masks borrow from here.
#[derive(Clone, Debug)]
pub struct AcceleratorGeometry {
    dims: GridDims,
    electrodes: Vec<Electrode>,
}

impl AcceleratorGeometry {
    pub fn new(dims: GridDims) -> Self {
        Self {
            dims,
            electrodes: Vec::new(),
        }
    }

    /// Build from unit-voltage fields given in electrode order. All must share one extent.
    pub fn from_fields(fields: Vec<VoxelField>) -> SimResult<Self> {
        let dims = match fields.first() {
            Some(f) => f.dims(),
            None => return Err(SimError::Config("geometry needs at least one electrode".into())),
        };
        let mut geometry = Self::new(dims);
        for field in fields {
            geometry.push(field)?;
        }
        Ok(geometry)
    }

    /// Append an electrode, numbered after the existing ones.
    pub fn push(&mut self, field: VoxelField) -> SimResult<()> {
        if field.dims() != self.dims {
            return Err(SimError::FieldShape {
                expected: self.dims.as_array(),
                found: field.dims().as_array(),
            });
        }
        let number = self.electrodes.len() + 1;
        self.electrodes.push(Electrode::new(number, field));
        Ok(())
    }

    /// Load every electrode of the configured accelerator, in parallel.
    pub fn import(config: &AcceleratorConfig, source: &dyn FieldSource) -> SimResult<Self> {
        crate::profile_scope!("import_geometry");
        let dims = config.grid_dims();
        let total = config.n_electrodes;
        log::info!("Importing {total} electrodes on a {}x{}x{} grid", dims.nx, dims.ny, dims.nz);

        let done = AtomicUsize::new(0);
        let fields = (1..=total)
            .into_par_iter()
            .map(|e| {
                let field = source.load(e, dims)?;
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                log::debug!("Imported electrode {e} ({n}/{total})");
                Ok(field)
            })
            .collect::<SimResult<Vec<_>>>()?;

        let mut geometry = Self::new(dims);
        for field in fields {
            geometry.push(field)?;
        }
        log::info!("Geometry import finished");
        Ok(geometry)
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn n_electrodes(&self) -> usize {
        self.electrodes.len()
    }

    pub fn electrodes(&self) -> &[Electrode] {
        &self.electrodes
    }

    /// Set one voltage per electrode. Any field built before this call is stale.
    pub fn apply_voltages(&mut self, voltages: &[f32]) -> SimResult<()> {
        if voltages.len() != self.electrodes.len() {
            return Err(SimError::ElectrodeCount {
                expected: self.electrodes.len(),
                found: voltages.len(),
            });
        }
        for (electrode, &v) in self.electrodes.iter_mut().zip(voltages) {
            electrode.apply_voltage(v);
        }
        Ok(())
    }

    pub fn voltages(&self) -> Vec<f32> {
        self.electrodes.iter().map(Electrode::voltage).collect()
    }

    pub fn smart_field(&self) -> SmartField<'_> {
        SmartField::new(&self.electrodes, self.dims)
    }

    /// Same as [`Self::smart_field`] but reusing a previous field's cache allocation.
    pub fn smart_field_with_cache(&self, cache: MagnitudeCache) -> SmartField<'_> {
        if cache.dims() == self.dims {
            SmartField::with_cache(&self.electrodes, cache)
        } else {
            self.smart_field()
        }
    }

    pub fn electrode_locations(&self, mask: CollisionMask) -> SimResult<ElectrodeLocator> {
        match mask {
            CollisionMask::Disabled => Ok(ElectrodeLocator::empty(self.dims)),
            CollisionMask::Union => Ok(ElectrodeLocator::from_electrodes(self.dims, &self.electrodes)),
            CollisionMask::Electrode(i) => self
                .electrodes
                .get(i.wrapping_sub(1))
                .map(ElectrodeLocator::from_electrode)
                .ok_or(SimError::ElectrodeCount {
                    expected: i,
                    found: self.electrodes.len(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FnFieldSource, UniformFieldSource};
    use ultraviolet::Vec3;

    #[test]
    fn import_numbers_electrodes_in_order() {
        let config = AcceleratorConfig {
            n_electrodes: 4,
            dimensions: [5, 5, 7],
            ..Default::default()
        };
        let source = FnFieldSource::new(|e, _, _, _| Vec3::new(0.0, e as f32, 0.0));
        let geometry = AcceleratorGeometry::import(&config, &source).unwrap();

        assert_eq!(geometry.dims(), GridDims::new(3, 3, 5));
        assert_eq!(geometry.n_electrodes(), 4);
        for (i, electrode) in geometry.electrodes().iter().enumerate() {
            assert_eq!(electrode.number(), i + 1);
            assert_eq!(electrode.stored_vector([1, 1, 1]).y, (i + 1) as f32);
        }
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let a = VoxelField::new(GridDims::new(2, 2, 2));
        let b = VoxelField::new(GridDims::new(2, 2, 3));
        let err = AcceleratorGeometry::from_fields(vec![a, b]).unwrap_err();
        assert!(matches!(err, SimError::FieldShape { found: [2, 2, 3], .. }));
    }

    #[test]
    fn voltage_count_must_match() {
        let dims = GridDims::new(2, 2, 2);
        let source = UniformFieldSource { vector: Vec3::unit_y() };
        let mut geometry = AcceleratorGeometry::from_fields(vec![
            source.load(1, dims).unwrap(),
            source.load(2, dims).unwrap(),
        ])
        .unwrap();

        assert!(geometry.apply_voltages(&[1.0]).is_err());
        geometry.apply_voltages(&[3.0, -1.0]).unwrap();
        assert_eq!(geometry.voltages(), vec![3.0, -1.0]);
        assert_eq!(geometry.smart_field().vector_at([0, 0, 0]), Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn collision_mask_selection() {
        let dims = GridDims::new(2, 2, 2);
        let hollow = VoxelField::from_fn(dims, |x, _, _| if x == 0 { Vec3::zero() } else { Vec3::unit_y() });
        let geometry =
            AcceleratorGeometry::from_fields(vec![hollow, VoxelField::uniform(dims, Vec3::unit_y())]).unwrap();

        assert_eq!(geometry.electrode_locations(CollisionMask::Union).unwrap().occupied(), 4);
        assert_eq!(geometry.electrode_locations(CollisionMask::Electrode(2)).unwrap().occupied(), 0);
        assert_eq!(geometry.electrode_locations(CollisionMask::Disabled).unwrap().occupied(), 0);
        assert!(geometry.electrode_locations(CollisionMask::Electrode(3)).is_err());
    }
}
