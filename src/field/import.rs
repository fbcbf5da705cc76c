// field/import.rs
// Sources of per-electrode unit-voltage fields: SIMION .dat layers and analytic fields

use super::voxel::{GridDims, VoxelField};
use crate::error::{SimError, SimResult};
use crate::units::SIMION_CORRECTION;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use ultraviolet::Vec3;

/// Header lines at the top of every exported SIMION layer.
const DAT_HEADER_LINES: usize = 8;
const AXES: [char; 3] = ['X', 'Y', 'Z'];

/// Anything able to produce the unit-voltage field of electrode `electrode` (1-based).
pub trait FieldSource: Sync {
    fn load(&self, electrode: usize, dims: GridDims) -> SimResult<VoxelField>;
}

/// Reader for SIMION potential-array exports.
///
/// Each electrode is stored as one file per x-layer and per field axis,
/// named `{pa_name}_E{m}_L{layer}_{axis}.dat` where electrode numbering is
/// reversed (`m = n_electrodes - e + 1`) and layers start at 2. Rows are z,
/// tab-separated columns are y.
#[derive(Clone, Debug)]
pub struct DatFieldReader {
    directory: PathBuf,
    pa_name: String,
    n_electrodes: usize,
}

impl DatFieldReader {
    pub fn new(directory: impl Into<PathBuf>, pa_name: impl Into<String>, n_electrodes: usize) -> Self {
        Self {
            directory: directory.into(),
            pa_name: pa_name.into(),
            n_electrodes,
        }
    }

    pub fn layer_path(&self, electrode: usize, layer: usize, axis: char) -> PathBuf {
        let file_number = self.n_electrodes + 1 - electrode;
        self.directory.join(format!(
            "{}_E{}_L{}_{}.dat",
            self.pa_name,
            file_number,
            layer + 2,
            axis
        ))
    }

    fn read_layer(path: &Path, field: &mut VoxelField, x: usize, axis: usize) -> SimResult<()> {
        let dims = field.dims();
        let reader = BufReader::new(File::open(path)?);
        for (line_no, line) in reader.lines().enumerate().skip(DAT_HEADER_LINES) {
            let line = line?;
            let z = line_no - DAT_HEADER_LINES;
            if z >= dims.nz {
                break;
            }
            for (y, token) in line.split('\t').enumerate() {
                let token = token.trim();
                if token.is_empty() || y >= dims.ny {
                    continue;
                }
                let raw: f32 = token.parse().map_err(|e| SimError::FieldFile {
                    path: path.to_path_buf(),
                    line: line_no + 1,
                    message: format!("'{token}': {e}"),
                })?;
                field.set_component(x, y, z, axis, raw * SIMION_CORRECTION);
            }
        }
        Ok(())
    }
}

impl FieldSource for DatFieldReader {
    fn load(&self, electrode: usize, dims: GridDims) -> SimResult<VoxelField> {
        let mut field = VoxelField::new(dims);
        for x in 0..dims.nx {
            for (axis, &name) in AXES.iter().enumerate() {
                let path = self.layer_path(electrode, x, name);
                if !path.exists() {
                    log::warn!("Field layer {} not found, component left at zero", path.display());
                    continue;
                }
                Self::read_layer(&path, &mut field, x, axis)?;
            }
        }
        Ok(field)
    }
}

/// Every electrode produces the same constant field.
#[derive(Clone, Copy, Debug)]
pub struct UniformFieldSource {
    pub vector: Vec3,
}

impl FieldSource for UniformFieldSource {
    fn load(&self, _electrode: usize, dims: GridDims) -> SimResult<VoxelField> {
        Ok(VoxelField::uniform(dims, self.vector))
    }
}

/// Field given by a closure of `(electrode, x, y, z)`.
pub struct FnFieldSource<F> {
    f: F,
}

impl<F> FnFieldSource<F>
where
    F: Fn(usize, usize, usize, usize) -> Vec3 + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> FieldSource for FnFieldSource<F>
where
    F: Fn(usize, usize, usize, usize) -> Vec3 + Sync,
{
    fn load(&self, electrode: usize, dims: GridDims) -> SimResult<VoxelField> {
        Ok(VoxelField::from_fn(dims, |x, y, z| (self.f)(electrode, x, y, z)))
    }
}
