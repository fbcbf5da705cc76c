//! Physical constants and unit conversions.
//!
//! Base units:
//! - Length: grid voxel = millimetre (mm) for positions, metre for velocities
//! - Time: second (s)
//! - Field: volt per metre (V/m)
//! - Mass: kilogram (kg)

/// Electron charge in coulombs (signed, antihydrogen positron cloud convention).
pub const ELECTRON_CHARGE: f32 = -1.602_176_57e-19;
/// Bohr radius in metres.
pub const BOHR_RADIUS: f32 = 5.291_772_1e-11;
/// Hydrogen mass in kilograms.
pub const HYDROGEN_MASS: f32 = 1.6737e-27;
/// Boltzmann constant in J/K.
pub const BOLTZMANN: f32 = 1.380_648_8e-23;
/// Ionisation threshold excluding the n^-4 factor (V/m).
pub const F_ION: f32 = 1.14222e11;
/// Inglis-Teller limit excluding the algebraic n, k terms (V/m).
pub const F_IT: f32 = 1.71407e11;
/// FWHM to standard deviation, 2 sqrt(2 ln 2).
pub const FWHM_FACTOR: f32 = 2.35482;

/// Number of electrodes switched together as one section.
pub const N_IN_SECTION: usize = 4;
/// Scale applied to raw SIMION samples to obtain V/m.
pub const SIMION_CORRECTION: f32 = 0.1;
/// Millimetres per metre. Grid coordinates are millimetres.
pub const MM_PER_M: f32 = 1000.0;

/// Convert a grid length (mm) to metres.
#[inline]
pub fn mm_to_m(mm: f32) -> f32 {
    mm / MM_PER_M
}
