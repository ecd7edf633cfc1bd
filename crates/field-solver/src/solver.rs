//! Field to voltage solve with out-of-bounds policy

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::axis::{Axis, AxisList};
use crate::calibration::Calibration;
use crate::error::{SolveError, Violation};
use crate::optimize::{bounded_least_squares, ApproximationSettings};

/// What to do when the requested field is outside the reachable set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverConfig {
    /// Fail with [`SolveError::UnreachableField`]
    Strict,
    /// Output the closest reachable field instead
    #[default]
    Approximate,
}

/// Voltages to apply to the x, y and z coils
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSolution {
    /// Absolute voltage per coil (V)
    pub voltages: Vector3<f64>,
    /// False when the voltages only approximate the requested field
    pub reachable: bool,
}

/// Solve C * V = target for the coil voltages.
///
/// The calibration columns are absolute field per axis at max drive, so the
/// result is already an absolute voltage per coil.
pub fn solve_exact(target: &Vector3<f64>, calibration: &Calibration) -> Vector3<f64> {
    calibration.inverse() * target
}

/// Check voltages against each coil's rating and the driver polarity.
///
/// Magnitude violations take precedence; polarity is only reported when
/// every axis is within its rated magnitude.
pub fn check_bounds(
    voltages: &Vector3<f64>,
    max_voltages: &Vector3<f64>,
) -> Result<(), SolveError> {
    let exceeded =
        AxisList::matching(|axis| voltages[axis.index()].abs() > max_voltages[axis.index()]);
    if !exceeded.is_empty() {
        return Err(SolveError::UnreachableField {
            cause: Violation::Magnitude,
            axes: exceeded,
        });
    }

    let negative = AxisList::matching(|axis| voltages[axis.index()] < 0.0);
    if !negative.is_empty() {
        return Err(SolveError::UnreachableField {
            cause: Violation::Polarity,
            axes: negative,
        });
    }

    Ok(())
}

/// Solve for coil voltages with default optimizer settings
pub fn solve(
    target: Vector3<f64>,
    calibration: &Calibration,
    mode: SolverConfig,
) -> Result<FieldSolution, SolveError> {
    solve_with(target, calibration, mode, &ApproximationSettings::default())
}

/// Solve for coil voltages.
///
/// In approximate mode an unreachable field is replaced by the bounded
/// least-squares projection onto relative drives in [0, 1]^3, that is
/// voltages in [0, max_voltage] per coil, and `reachable` is false.
pub fn solve_with(
    target: Vector3<f64>,
    calibration: &Calibration,
    mode: SolverConfig,
    settings: &ApproximationSettings,
) -> Result<FieldSolution, SolveError> {
    if let Some(axis) = Axis::ALL.into_iter().find(|axis| !target[axis.index()].is_finite()) {
        return Err(SolveError::NonFiniteTarget { axis });
    }

    let max_voltages = calibration.max_voltages();
    let voltages = solve_exact(&target, calibration);

    let violation = match check_bounds(&voltages, max_voltages) {
        Ok(()) => {
            tracing::debug!(?target, ?voltages, "Exact field solution");
            return Ok(FieldSolution {
                voltages,
                reachable: true,
            });
        }
        Err(err) => err,
    };

    match mode {
        SolverConfig::Strict => Err(violation),
        SolverConfig::Approximate => {
            let boxed = bounded_least_squares(&calibration.drive_matrix(), &target, settings)?;
            let voltages = boxed.drive.component_mul(max_voltages);
            tracing::warn!(
                %violation,
                ?voltages,
                residual = boxed.residual,
                "Requested field not reachable, outputting best approximation"
            );
            Ok(FieldSolution {
                voltages,
                reachable: false,
            })
        }
    }
}
