//! Coil calibration records and the field calibration matrix

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::axis::Axis;
use crate::error::SolveError;

/// Relative determinant threshold below which the calibration is treated as singular.
/// Compared against |det| / (|c0| * |c1| * |c2|), so it does not depend on field units.
pub const SINGULARITY_TOLERANCE: f64 = 1e-12;

/// Field response of a single coil, measured at its maximum drive voltage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoilCalibration {
    /// Input voltage corresponding to the max field (V)
    pub voltage_at_max_field: f64,
    /// x field at max input voltage
    pub x_field_max: f64,
    /// y field at max input voltage
    pub y_field_max: f64,
    /// z field at max input voltage
    pub z_field_max: f64,
}

impl CoilCalibration {
    pub fn new(
        voltage_at_max_field: f64,
        x_field_max: f64,
        y_field_max: f64,
        z_field_max: f64,
    ) -> Self {
        Self {
            voltage_at_max_field,
            x_field_max,
            y_field_max,
            z_field_max,
        }
    }

    /// (x, y, z) field produced at max voltage, one column of the calibration matrix
    pub fn field_response(&self) -> Vector3<f64> {
        Vector3::new(self.x_field_max, self.y_field_max, self.z_field_max)
    }
}

/// Calibration of all three coils, as stored in driver settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldCalibration {
    pub x_coil: CoilCalibration,
    pub y_coil: CoilCalibration,
    pub z_coil: CoilCalibration,
}

impl Default for FieldCalibration {
    /// Bench calibration of the levitation trap coils (fields in Gauss)
    fn default() -> Self {
        Self {
            x_coil: CoilCalibration::new(0.368, 32.8, 0.4, -11.4),
            y_coil: CoilCalibration::new(0.278, -5.7, -24.0, -7.9),
            z_coil: CoilCalibration::new(0.245, 1.9, -5.6, 47.7),
        }
    }
}

impl FieldCalibration {
    pub fn coil(&self, axis: Axis) -> &CoilCalibration {
        match axis {
            Axis::X => &self.x_coil,
            Axis::Y => &self.y_coil,
            Axis::Z => &self.z_coil,
        }
    }

    /// Coil responses as columns: B = C * V
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::from_columns(&[
            self.x_coil.field_response(),
            self.y_coil.field_response(),
            self.z_coil.field_response(),
        ])
    }

    pub fn max_voltages(&self) -> Vector3<f64> {
        Vector3::new(
            self.x_coil.voltage_at_max_field,
            self.y_coil.voltage_at_max_field,
            self.z_coil.voltage_at_max_field,
        )
    }
}

/// Validated calibration matrix with its cached inverse.
///
/// Built once from configuration and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    matrix: Matrix3<f64>,
    inverse: Matrix3<f64>,
    max_voltages: Vector3<f64>,
}

impl Calibration {
    /// Build the calibration matrix from per-coil records.
    ///
    /// Fails with [`SolveError::SingularCalibration`] if the three coil
    /// responses are not linearly independent.
    pub fn new(field_calibration: &FieldCalibration) -> Result<Self, SolveError> {
        Self::from_matrix(field_calibration.matrix(), field_calibration.max_voltages())
    }

    /// Build from an explicit matrix (coils as columns) and per-coil max voltages
    pub fn from_matrix(
        matrix: Matrix3<f64>,
        max_voltages: Vector3<f64>,
    ) -> Result<Self, SolveError> {
        for coil in Axis::ALL {
            let j = coil.index();
            if matrix.column(j).iter().any(|v| !v.is_finite()) {
                return Err(SolveError::InvalidCalibration {
                    coil,
                    reason: "field response must be finite".to_string(),
                });
            }
            let max_voltage = max_voltages[j];
            if !max_voltage.is_finite() || max_voltage <= 0.0 {
                return Err(SolveError::InvalidCalibration {
                    coil,
                    reason: format!("voltage at max field must be positive, got {}", max_voltage),
                });
            }
        }

        let determinant = matrix.determinant();
        let scale: f64 = matrix.column_iter().map(|c| c.norm()).product();
        if scale == 0.0 || determinant.abs() <= SINGULARITY_TOLERANCE * scale {
            return Err(SolveError::SingularCalibration { determinant });
        }
        let inverse = matrix
            .try_inverse()
            .ok_or(SolveError::SingularCalibration { determinant })?;

        tracing::debug!(?matrix, determinant, "Built field calibration");

        Ok(Self {
            matrix,
            inverse,
            max_voltages,
        })
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn inverse(&self) -> &Matrix3<f64> {
        &self.inverse
    }

    pub fn max_voltages(&self) -> &Vector3<f64> {
        &self.max_voltages
    }

    /// Field produced by the given coil voltages (C * V)
    pub fn field_for(&self, voltages: &Vector3<f64>) -> Vector3<f64> {
        self.matrix * voltages
    }

    /// Field per unit relative drive: C * diag(max_voltages)
    pub fn drive_matrix(&self) -> Matrix3<f64> {
        self.matrix * Matrix3::from_diagonal(&self.max_voltages)
    }

    /// Field produced by a relative drive vector, each component a fraction
    /// of that coil's max voltage
    pub fn field_for_drive(&self, drive: &Vector3<f64>) -> Vector3<f64> {
        self.field_for(&drive.component_mul(&self.max_voltages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coils_are_columns() {
        let cal = FieldCalibration::default();
        let m = cal.matrix();
        // x coil column
        assert_eq!(m[(0, 0)], 32.8);
        assert_eq!(m[(1, 0)], 0.4);
        assert_eq!(m[(2, 0)], -11.4);
        // z coil's x response sits in the first row, last column
        assert_eq!(m[(0, 2)], 1.9);
    }

    #[test]
    fn test_inverse_is_cached_inverse() {
        let cal = Calibration::new(&FieldCalibration::default()).unwrap();
        let product = cal.matrix() * cal.inverse();
        assert!((product - Matrix3::identity()).amax() < 1e-12);
    }

    #[test]
    fn test_drive_matrix_scales_columns_by_max_voltage() {
        let cal = Calibration::new(&FieldCalibration::default()).unwrap();
        let drive = Vector3::new(1.0, 0.0, 0.0);
        let expected = cal.matrix().column(0) * 0.368;
        assert!((cal.field_for_drive(&drive) - expected).amax() < 1e-12);
        assert!((cal.drive_matrix() * drive - expected).amax() < 1e-12);
    }

    #[test]
    fn test_identical_coils_are_singular() {
        let coil = CoilCalibration::new(1.0, 3.0, -2.0, 5.0);
        let cal = FieldCalibration {
            x_coil: coil,
            y_coil: coil,
            z_coil: CoilCalibration::new(1.0, 0.0, 0.0, 1.0),
        };
        match Calibration::new(&cal) {
            Err(SolveError::SingularCalibration { .. }) => {}
            other => panic!("Expected SingularCalibration, got {:?}", other),
        }
    }

    #[test]
    fn test_nearly_dependent_coils_are_singular() {
        #[rustfmt::skip]
        let m = Matrix3::new(
            1.0, 1.0, 0.0,
            0.0, 1e-14, 0.0,
            0.0, 0.0, 1.0,
        );
        let result = Calibration::from_matrix(m, Vector3::new(1.0, 1.0, 1.0));
        assert!(matches!(result, Err(SolveError::SingularCalibration { .. })));
    }

    #[test]
    fn test_singularity_is_scale_invariant() {
        // A well conditioned calibration in tiny units is still invertible
        let m = Matrix3::identity() * 1e-6;
        assert!(Calibration::from_matrix(m, Vector3::new(1.0, 1.0, 1.0)).is_ok());
    }

    #[test]
    fn test_non_positive_max_voltage_rejected() {
        let mut cal = FieldCalibration::default();
        cal.y_coil.voltage_at_max_field = 0.0;
        match Calibration::new(&cal) {
            Err(SolveError::InvalidCalibration { coil, .. }) => assert_eq!(coil, Axis::Y),
            other => panic!("Expected InvalidCalibration, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_response_rejected() {
        let mut cal = FieldCalibration::default();
        cal.z_coil.y_field_max = f64::NAN;
        assert!(matches!(
            Calibration::new(&cal),
            Err(SolveError::InvalidCalibration { coil: Axis::Z, .. })
        ));
    }

    #[test]
    fn test_parse_partial_calibration() {
        let json = r#"{
            "x_coil": {
                "voltage_at_max_field": 10.0,
                "x_field_max": 1.0,
                "y_field_max": 0.0,
                "z_field_max": 0.0
            }
        }"#;
        let cal: FieldCalibration = serde_json::from_str(json).unwrap();
        assert_eq!(cal.x_coil, CoilCalibration::new(10.0, 1.0, 0.0, 0.0));
        assert_eq!(cal.y_coil, FieldCalibration::default().y_coil);
    }
}
