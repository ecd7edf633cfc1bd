//! magnet-coils: Drive the three-coil magnetic trap from field setpoints
//!
//! This crate provides:
//! - Typed driver settings (DAQ channels, coil mapping, field calibration)
//! - The [`AnalogOutput`] seam to the DAQ analog output task
//! - [`MagnetCoils`], which solves field setpoints with `field-solver` and
//!   writes the coil voltages
//!
//! The field solve itself is pure and lives in the `field-solver` crate.

pub mod driver;
pub mod error;
pub mod output;
pub mod settings;

pub use driver::{FieldUpdate, MagnetCoils, SAMPLES_PER_WRITE};
pub use error::CoilsError;
pub use output::{AnalogOutput, OutputError, RecordedWrite, RecordingOutput};
pub use settings::{AnalogChannel, MagnetChannels, MagnetCoilsSettings, MagneticFields};

pub use field_solver::{FieldSolution, SolverConfig};
