//! Solver error types

use std::fmt;
use thiserror::Error;

use crate::axis::{Axis, AxisList};

/// Why a requested field cannot be produced exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// |voltage| exceeds the coil's rated maximum
    Magnitude,
    /// Negative voltage, which the coil driver cannot output
    Polarity,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Magnitude => f.write_str("maximum field exceeded"),
            Violation::Polarity => f.write_str("polarity switch required"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SolveError {
    #[error(
        "calibration matrix is singular (determinant {determinant:e}), \
         coil responses are not linearly independent"
    )]
    SingularCalibration { determinant: f64 },

    #[error("invalid calibration for {coil} coil: {reason}")]
    InvalidCalibration { coil: Axis, reason: String },

    #[error("target field is not finite on axis {axis}")]
    NonFiniteTarget { axis: Axis },

    #[error("field not reachable, {cause} on {axes}")]
    UnreachableField { cause: Violation, axes: AxisList },

    #[error("bounded optimizer found no finite minimizer (residual {residual:e})")]
    OptimizationFailure { residual: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_message_names_axes_and_cause() {
        let err = SolveError::UnreachableField {
            cause: Violation::Polarity,
            axes: AxisList(vec![Axis::X, Axis::Z]),
        };
        assert_eq!(err.to_string(), "field not reachable, polarity switch required on x,z");
    }
}
