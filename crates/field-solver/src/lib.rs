//! field-solver: Convert 3-axis magnetic field setpoints to coil drive voltages
//!
//! This crate provides:
//! - Typed per-coil calibration records and the calibration matrix built from them
//! - Exact inversion of the field calibration
//! - Bounds checking against each coil's rated voltage and drive polarity
//! - A bounded least-squares fallback for fields outside the reachable set
//!
//! The calibration matrix maps coil drive to field: column j holds the x, y
//! and z field produced by coil j at its maximum rated voltage. Everything
//! here is a pure function of (target field, calibration, mode); hardware
//! output lives in a separate crate.

pub mod axis;
pub mod calibration;
pub mod error;
pub mod optimize;
pub mod solver;

pub use axis::{Axis, AxisList};
pub use calibration::{Calibration, CoilCalibration, FieldCalibration};
pub use error::{SolveError, Violation};
pub use optimize::{bounded_least_squares, ApproximationSettings, BoxedSolution};
pub use solver::{check_bounds, solve, solve_exact, solve_with, FieldSolution, SolverConfig};

pub use nalgebra::{Matrix3, Vector3};
