//! Magnet coil driver: field setpoints in, DAQ analog output writes out

use field_solver::{solve_with, ApproximationSettings, Axis, Calibration, FieldSolution};
use nalgebra::Vector3;

use crate::error::CoilsError;
use crate::output::AnalogOutput;
use crate::settings::{MagnetCoilsSettings, MagneticFields};

/// Each coil voltage is written as a short constant buffer of this many samples
pub const SAMPLES_PER_WRITE: usize = 2;

/// Partial field update; `None` keeps the current component
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl FieldUpdate {
    pub fn full(field: Vector3<f64>) -> Self {
        Self {
            x: Some(field.x),
            y: Some(field.y),
            z: Some(field.z),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }

    /// `current` with the provided components replaced
    pub fn apply_to(&self, current: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            self.x.unwrap_or(current.x),
            self.y.unwrap_or(current.y),
            self.z.unwrap_or(current.z),
        )
    }
}

pub struct MagnetCoils<O: AnalogOutput> {
    settings: MagnetCoilsSettings,
    calibration: Calibration,
    approximation: ApproximationSettings,
    output: O,
}

impl<O: AnalogOutput> MagnetCoils<O> {
    /// Validate settings and build the field calibration once.
    ///
    /// The stored setpoint is not written to hardware until the first update.
    pub fn new(settings: MagnetCoilsSettings, output: O) -> Result<Self, CoilsError> {
        settings.validate()?;
        let calibration = Calibration::new(&settings.field_calibration)?;
        Ok(Self {
            settings,
            calibration,
            approximation: ApproximationSettings::default(),
            output,
        })
    }

    pub fn with_approximation(mut self, approximation: ApproximationSettings) -> Self {
        self.approximation = approximation;
        self
    }

    pub fn settings(&self) -> &MagnetCoilsSettings {
        &self.settings
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    /// Current field setpoint
    pub fn field(&self) -> Vector3<f64> {
        self.settings.magnetic_fields.as_vector()
    }

    /// Set all three field components and write the coil voltages
    pub fn set_field(&mut self, field: Vector3<f64>) -> Result<FieldSolution, CoilsError> {
        self.solve_and_write(field)
    }

    /// Apply a partial field update.
    ///
    /// Returns `Ok(None)` without touching the hardware when no component is
    /// given.
    pub fn update(&mut self, update: FieldUpdate) -> Result<Option<FieldSolution>, CoilsError> {
        if update.is_empty() {
            return Ok(None);
        }
        let target = update.apply_to(&self.field());
        self.solve_and_write(target).map(Some)
    }

    /// The stored setpoint only changes once the write succeeded
    fn solve_and_write(&mut self, target: Vector3<f64>) -> Result<FieldSolution, CoilsError> {
        let solution = solve_with(
            target,
            &self.calibration,
            self.settings.solver_mode(),
            &self.approximation,
        )?;
        tracing::debug!(
            ?target,
            voltages = ?solution.voltages,
            reachable = solution.reachable,
            "Solved coil voltages"
        );

        let (channels, waveform) = self.waveform(&solution.voltages)?;
        self.write(&channels, &waveform)?;

        self.settings.magnetic_fields = MagneticFields::from_vector(&target);
        Ok(solution)
    }

    /// Physical channel names and sample buffers in x, y, z coil order
    fn waveform(
        &self,
        voltages: &Vector3<f64>,
    ) -> Result<(Vec<String>, Vec<Vec<f64>>), CoilsError> {
        let mut channels = Vec::with_capacity(3);
        let mut waveform = Vec::with_capacity(3);

        for axis in Axis::ALL {
            let name = self.settings.magnet_channels.channel_for(axis);
            let ao = self.settings.output_channel(axis)?;
            let voltage = voltages[axis.index()];
            if voltage < ao.min_voltage || voltage > ao.max_voltage {
                return Err(CoilsError::ChannelRange {
                    axis,
                    channel: name.to_string(),
                    voltage,
                    min: ao.min_voltage,
                    max: ao.max_voltage,
                });
            }
            channels.push(format!("{}/ao{}", self.settings.device, ao.channel));
            waveform.push(vec![voltage; SAMPLES_PER_WRITE]);
        }

        Ok((channels, waveform))
    }

    fn write(&mut self, channels: &[String], waveform: &[Vec<f64>]) -> Result<(), CoilsError> {
        self.output.init(channels, waveform)?;
        let result = self
            .output
            .run()
            .and_then(|_| self.output.wait_until_done());
        if let Err(err) = result {
            if let Err(stop_err) = self.output.stop() {
                tracing::error!("Failed to stop analog output after error: {}", stop_err);
            }
            return Err(err.into());
        }
        self.output.stop()?;
        Ok(())
    }
}
