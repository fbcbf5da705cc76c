// io.rs
// Trajectory export grouped by final particle status, as JSON or bincode, optionally gzipped

use crate::error::SimResult;
use crate::particle::{Particle, Status};
use crate::profile_scope;
use crate::simulation::{SimulationNumbers, Simulator};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use ultraviolet::Vec3;

/// Sentinel neutralisation time for particles that never crossed the Inglis-Teller limit.
pub const NEVER_NEUTRALISED: i64 = -1;

pub const PARTITION_NAMES: [&str; 4] = ["Succeeded", "Collided", "Ionised", "Remaining"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Binary,
}

/// One particle's history, split per axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    /// x, y, z sample series in grid units.
    pub positions: [Vec<f32>; 3],
    /// x, y, z sample series in m/s.
    pub velocities: [Vec<f32>; 3],
    /// Timestep of neutralisation, or [`NEVER_NEUTRALISED`].
    pub neutralisation_time: i64,
    pub k: i32,
    pub max_field: f32,
}

impl ParticleRecord {
    pub fn from_particle(p: &Particle) -> Self {
        let traj = p.trajectory();
        let axes = |samples: &[Vec3]| -> [Vec<f32>; 3] {
            [
                samples.iter().map(|v| v.x).collect(),
                samples.iter().map(|v| v.y).collect(),
                samples.iter().map(|v| v.z).collect(),
            ]
        };
        Self {
            positions: axes(traj.positions.as_slice()),
            velocities: axes(traj.velocities.as_slice()),
            neutralisation_time: p
                .neutralised_at()
                .map(|t| t as i64)
                .unwrap_or(NEVER_NEUTRALISED),
            k: p.k(),
            max_field: p.max_field(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub name: String,
    pub particles: Vec<ParticleRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryExport {
    pub stats: SimulationNumbers,
    pub time_step: f32,
    pub max_voltage: f32,
    /// Whether every step was recorded or only the endpoints.
    pub store_trajectories: bool,
    pub partitions: Vec<Partition>,
}

impl TrajectoryExport {
    pub fn from_simulator(sim: &Simulator) -> Self {
        let mut partitions: Vec<Partition> = PARTITION_NAMES
            .iter()
            .map(|name| Partition {
                name: name.to_string(),
                particles: Vec::new(),
            })
            .collect();
        let store_collisions = sim.storage().store_collisions;

        for p in sim.particles() {
            let slot = match p.status() {
                Status::Succeeded => 0,
                Status::Collided if !store_collisions => continue,
                Status::Collided => 1,
                Status::Ionised => 2,
                Status::Alive => 3,
            };
            partitions[slot].particles.push(ParticleRecord::from_particle(p));
        }

        Self {
            stats: sim.basic_stats(),
            time_step: sim.settings().time_step,
            max_voltage: sim.settings().max_voltage,
            store_trajectories: sim.storage().store_trajectories,
            partitions,
        }
    }

    pub fn partition(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == name)
    }
}

/// Write through a temporary file and rename over `path`.
pub fn write_export<P: AsRef<Path>>(
    path: P,
    export: &TrajectoryExport,
    format: ExportFormat,
    compress: bool,
) -> SimResult<()> {
    profile_scope!("write_export");
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension({
        let mut os = path.extension().map(|e| e.to_os_string()).unwrap_or_default();
        os.push(".tmp");
        os
    });
    {
        let file = std::fs::File::create(&tmp_path)?;
        let writer = BufWriter::new(file);
        match (format, compress) {
            (ExportFormat::Json, false) => {
                let mut writer = writer;
                serde_json::to_writer(&mut writer, export)?;
                writer.flush()?;
            }
            (ExportFormat::Json, true) => {
                let mut encoder = GzEncoder::new(writer, Compression::default());
                serde_json::to_writer(&mut encoder, export)?;
                let mut writer = encoder.finish()?;
                writer.flush()?;
            }
            (ExportFormat::Binary, false) => {
                let mut writer = writer;
                bincode::serialize_into(&mut writer, export)?;
                writer.flush()?;
            }
            (ExportFormat::Binary, true) => {
                let mut encoder = GzEncoder::new(writer, Compression::default());
                bincode::serialize_into(&mut encoder, export)?;
                let mut writer = encoder.finish()?;
                writer.flush()?;
            }
        }
    }
    std::fs::rename(&tmp_path, path)?;
    log::info!("Trajectories written to {}", path.display());
    Ok(())
}

/// Read an export back, whatever format and compression it was written with.
pub fn read_export<P: AsRef<Path>>(path: P) -> SimResult<TrajectoryExport> {
    profile_scope!("read_export");
    let data = std::fs::read(path.as_ref())?;
    match maybe_decompress_gzip(&data)? {
        Some(decoded) => parse_export_bytes(&decoded),
        None => parse_export_bytes(&data),
    }
}

fn parse_export_bytes(bytes: &[u8]) -> SimResult<TrajectoryExport> {
    let looks_like_json = bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'{');
    match serde_json::from_slice(bytes) {
        Ok(export) => Ok(export),
        Err(json_err) => bincode::deserialize(bytes).map_err(|bin_err| {
            if looks_like_json {
                json_err.into()
            } else {
                bin_err.into()
            }
        }),
    }
}

fn maybe_decompress_gzip(data: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
    if data.len() < 2 || data[0] != 0x1f || data[1] != 0x8b {
        return Ok(None);
    }
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(Some(out))
}
