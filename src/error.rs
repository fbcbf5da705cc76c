// error.rs
// Crate-wide error type

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown acceleration scheme '{0}' (expected \"instantaneous\", \"exponential\" or \"trap\")")]
    UnknownScheme(String),

    #[error("Unknown k distribution '{0}' (expected \"single\", \"uniform\" or \"triangle\")")]
    UnknownDistribution(String),

    #[error("Unknown collision mask '{0}'")]
    UnknownCollisionMask(String),

    #[error("The selected voltage scheme needs a synchronous particle but the ensemble is empty")]
    MissingSynchronousParticle,

    #[error("Expected {expected} electrode voltages, got {found}")]
    ElectrodeCount { expected: usize, found: usize },

    #[error("Field shape mismatch: expected {expected:?}, found {found:?}")]
    FieldShape {
        expected: [usize; 3],
        found: [usize; 3],
    },

    #[error("Bad field sample in {path:?} line {line}: {message}")]
    FieldFile {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Binary encoding error: {0}")]
    Bincode(#[from] bincode::Error),
}

pub type SimResult<T> = Result<T, SimError>;
