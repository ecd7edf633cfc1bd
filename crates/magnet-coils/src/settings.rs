//! Typed driver settings for the magnet coil DAQ module

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use field_solver::{Axis, FieldCalibration, SolverConfig};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::CoilsError;

/// Number of analog output channels on the DAQ module
pub const CHANNEL_COUNT: u8 = 4;

/// One analog output channel of the DAQ module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalogChannel {
    /// Output channel number (0..=3)
    pub channel: u8,
    /// Output sample rate (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
    /// Minimum output voltage (V)
    #[serde(default = "default_min_voltage")]
    pub min_voltage: f64,
    /// Maximum output voltage (V)
    #[serde(default = "default_max_voltage")]
    pub max_voltage: f64,
}

fn default_sample_rate() -> f64 {
    1000.0
}

fn default_min_voltage() -> f64 {
    -10.0
}

fn default_max_voltage() -> f64 {
    10.0
}

impl AnalogChannel {
    pub fn new(channel: u8) -> Self {
        Self {
            channel,
            sample_rate: default_sample_rate(),
            min_voltage: default_min_voltage(),
            max_voltage: default_max_voltage(),
        }
    }
}

/// Which analog output drives each coil
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagnetChannels {
    pub x_channel: String,
    pub y_channel: String,
    pub z_channel: String,
}

impl Default for MagnetChannels {
    fn default() -> Self {
        Self {
            x_channel: "ao1".to_string(),
            y_channel: "ao2".to_string(),
            z_channel: "ao0".to_string(),
        }
    }
}

impl MagnetChannels {
    pub fn channel_for(&self, axis: Axis) -> &str {
        match axis {
            Axis::X => &self.x_channel,
            Axis::Y => &self.y_channel,
            Axis::Z => &self.z_channel,
        }
    }
}

/// Field setpoint (Gauss)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MagneticFields {
    pub x_field: f64,
    pub y_field: f64,
    pub z_field: f64,
}

impl MagneticFields {
    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x_field, self.y_field, self.z_field)
    }

    pub fn from_vector(field: &Vector3<f64>) -> Self {
        Self {
            x_field: field.x,
            y_field: field.y,
            z_field: field.z,
        }
    }
}

/// Complete settings of the magnet coil driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MagnetCoilsSettings {
    /// Name of DAQ device
    pub device: String,
    pub analog_output: BTreeMap<String, AnalogChannel>,
    pub magnet_channels: MagnetChannels,
    pub magnetic_fields: MagneticFields,
    pub field_calibration: FieldCalibration,
    /// If out of bounds fields are given, output the closest allowed field
    pub use_approximate_fields: bool,
}

impl Default for MagnetCoilsSettings {
    fn default() -> Self {
        let analog_output = (0..CHANNEL_COUNT)
            .map(|n| (format!("ao{}", n), AnalogChannel::new(n)))
            .collect();
        Self {
            device: "cDAQ9184-1BA7633Mod4".to_string(),
            analog_output,
            magnet_channels: MagnetChannels::default(),
            magnetic_fields: MagneticFields::default(),
            field_calibration: FieldCalibration::default(),
            use_approximate_fields: true,
        }
    }
}

impl MagnetCoilsSettings {
    /// Parse settings from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self, CoilsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoilsError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, CoilsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn solver_mode(&self) -> SolverConfig {
        if self.use_approximate_fields {
            SolverConfig::Approximate
        } else {
            SolverConfig::Strict
        }
    }

    /// Analog output configured for the given coil
    pub fn output_channel(&self, axis: Axis) -> Result<&AnalogChannel, CoilsError> {
        let name = self.magnet_channels.channel_for(axis);
        self.analog_output.get(name).ok_or_else(|| {
            CoilsError::Settings(format!(
                "{} coil mapped to unknown analog output {:?}",
                axis, name
            ))
        })
    }

    pub fn validate(&self) -> Result<(), CoilsError> {
        if self.device.trim().is_empty() {
            return Err(CoilsError::Settings("device name is empty".to_string()));
        }

        for (name, ao) in &self.analog_output {
            if ao.channel >= CHANNEL_COUNT {
                return Err(CoilsError::Settings(format!(
                    "{}: channel {} out of range 0..{}",
                    name, ao.channel, CHANNEL_COUNT
                )));
            }
            if !(ao.min_voltage < ao.max_voltage) {
                return Err(CoilsError::Settings(format!(
                    "{}: min_voltage {} must be below max_voltage {}",
                    name, ao.min_voltage, ao.max_voltage
                )));
            }
            if !(ao.sample_rate > 0.0) {
                return Err(CoilsError::Settings(format!(
                    "{}: sample_rate must be positive, got {}",
                    name, ao.sample_rate
                )));
            }
        }

        let mut physical = Vec::with_capacity(3);
        for axis in Axis::ALL {
            let ao = self.output_channel(axis)?;
            if physical.contains(&ao.channel) {
                return Err(CoilsError::Settings(format!(
                    "{} coil shares output channel {} with another coil",
                    axis, ao.channel
                )));
            }
            physical.push(ao.channel);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = MagnetCoilsSettings::default();
        settings.validate().unwrap();
        assert_eq!(settings.output_channel(Axis::X).unwrap().channel, 1);
        assert_eq!(settings.output_channel(Axis::Z).unwrap().channel, 0);
        assert_eq!(settings.solver_mode(), SolverConfig::Approximate);
    }

    #[test]
    fn test_parse_partial_settings() {
        let json = r#"{
            "magnet_channels": {"x_channel": "ao3"},
            "magnetic_fields": {"z_field": 12.5},
            "use_approximate_fields": false
        }"#;
        let settings = MagnetCoilsSettings::from_json(json).unwrap();
        assert_eq!(settings.magnet_channels.x_channel, "ao3");
        assert_eq!(settings.magnet_channels.y_channel, "ao2");
        assert_eq!(settings.magnetic_fields.as_vector(), Vector3::new(0.0, 0.0, 12.5));
        assert_eq!(settings.solver_mode(), SolverConfig::Strict);
        assert_eq!(settings.analog_output.len(), 4);
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let json = r#"{"magnet_channels": {"y_channel": "ao7"}}"#;
        let err = MagnetCoilsSettings::from_json(json).unwrap_err();
        assert!(err.to_string().contains("ao7"));
    }

    #[test]
    fn test_shared_channel_rejected() {
        let mut settings = MagnetCoilsSettings::default();
        settings.magnet_channels.z_channel = "ao1".to_string();
        assert!(matches!(settings.validate(), Err(CoilsError::Settings(_))));
    }

    #[test]
    fn test_inverted_voltage_range_rejected() {
        let mut settings = MagnetCoilsSettings::default();
        if let Some(ao) = settings.analog_output.get_mut("ao2") {
            ao.min_voltage = 5.0;
            ao.max_voltage = -5.0;
        }
        assert!(settings.validate().is_err());
    }
}
