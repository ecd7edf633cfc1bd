//! Bounded least-squares approximation of unreachable fields
//!
//! Minimizes |A x - b|^2 over the unit cube x in [0, 1]^3. The objective is a
//! convex quadratic and A has full rank, so the minimizer is the
//! unconstrained minimizer of the face of the cube it lies on. Each
//! coordinate is either held at 0, held at 1 or left free, which gives 27
//! faces; every feasible face minimizer is a candidate and the lowest
//! objective wins. The result is exact regardless of how badly the coil
//! responses are conditioned.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::SolveError;

/// Rank cutoff for the reduced least-squares solves
const SVD_EPSILON: f64 = 1e-14;

/// Feasibility slack for the bounded optimizer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApproximationSettings {
    /// A free component may overshoot [0, 1] by this much before its face
    /// is rejected; accepted components are clamped back into the box
    pub tolerance: f64,
}

impl Default for ApproximationSettings {
    fn default() -> Self {
        Self { tolerance: 1e-12 }
    }
}

/// Result of a bounded least-squares solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxedSolution {
    /// Relative drive, every component within [0, 1]
    pub drive: Vector3<f64>,
    /// |A x - b| at the solution
    pub residual: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Lower,
    Upper,
    Free,
}

impl Bound {
    fn from_digit(digit: usize) -> Self {
        match digit {
            0 => Bound::Lower,
            1 => Bound::Upper,
            _ => Bound::Free,
        }
    }
}

/// Minimizer of |A x - b|^2 with the bounded coordinates held fixed, or
/// `None` if a free coordinate lands outside the box.
fn face_minimizer(
    matrix: &Matrix3<f64>,
    target: &Vector3<f64>,
    face: [Bound; 3],
    tolerance: f64,
) -> Option<Vector3<f64>> {
    let mut drive = Vector3::zeros();
    let mut free = Vec::with_capacity(3);
    for (i, bound) in face.iter().enumerate() {
        match bound {
            Bound::Lower => drive[i] = 0.0,
            Bound::Upper => drive[i] = 1.0,
            Bound::Free => free.push(i),
        }
    }
    if free.is_empty() {
        return Some(drive);
    }

    let reduced = DMatrix::from_fn(3, free.len(), |row, col| matrix[(row, free[col])]);
    let rhs = target - matrix * drive;
    let rhs = DVector::from_column_slice(rhs.as_slice());
    let solved = reduced.svd(true, true).solve(&rhs, SVD_EPSILON).ok()?;

    for (k, &i) in free.iter().enumerate() {
        let value = solved[k];
        if !value.is_finite() || value < -tolerance || value > 1.0 + tolerance {
            return None;
        }
        drive[i] = value.clamp(0.0, 1.0);
    }
    Some(drive)
}

/// Find the relative drive in [0, 1]^3 whose field is closest to `target`.
///
/// Fails with [`SolveError::OptimizationFailure`] only when no face yields a
/// finite objective, which means non-finite input.
pub fn bounded_least_squares(
    matrix: &Matrix3<f64>,
    target: &Vector3<f64>,
    settings: &ApproximationSettings,
) -> Result<BoxedSolution, SolveError> {
    let mut best: Option<BoxedSolution> = None;

    for code in 0..27 {
        let face = [
            Bound::from_digit(code % 3),
            Bound::from_digit(code / 3 % 3),
            Bound::from_digit(code / 9),
        ];
        let Some(drive) = face_minimizer(matrix, target, face, settings.tolerance) else {
            continue;
        };
        let residual = (matrix * drive - target).norm();
        if !residual.is_finite() {
            continue;
        }
        if best.map_or(true, |b| residual < b.residual) {
            best = Some(BoxedSolution { drive, residual });
        }
    }

    let solution = best.ok_or(SolveError::OptimizationFailure { residual: f64::NAN })?;
    tracing::debug!(drive = ?solution.drive, residual = solution.residual, "Bounded least squares");
    Ok(solution)
}
