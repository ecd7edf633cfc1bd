use std::io::Write;

use magnet_coils::{CoilsError, MagnetCoils, MagnetCoilsSettings, RecordingOutput, SolverConfig};
use nalgebra::Vector3;
use pretty_assertions::assert_eq;

fn write_settings(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_settings_file_round_trip() {
    let mut settings = MagnetCoilsSettings::default();
    settings.device = "cDAQ1Mod2".to_string();
    settings.use_approximate_fields = false;
    settings.magnetic_fields.y_field = -2.5;

    let file = write_settings(&settings.to_json().unwrap());
    let loaded = MagnetCoilsSettings::from_json_file(file.path()).unwrap();
    assert_eq!(loaded, settings);
    assert_eq!(loaded.solver_mode(), SolverConfig::Strict);
}

#[test]
fn test_missing_settings_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = MagnetCoilsSettings::from_json_file(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, CoilsError::Io(_)));
}

#[test]
fn test_malformed_settings_file_is_json_error() {
    let file = write_settings("{\"device\": 42}");
    let err = MagnetCoilsSettings::from_json_file(file.path()).unwrap_err();
    assert!(matches!(err, CoilsError::Json(_)));
}

#[test]
fn test_bench_calibration_drives_requested_field() {
    let file = write_settings(r#"{"use_approximate_fields": false}"#);
    let settings = MagnetCoilsSettings::from_json_file(file.path()).unwrap();
    let mut coils = MagnetCoils::new(settings, RecordingOutput::new()).unwrap();

    // Reachable with positive voltages on every coil
    let voltages = Vector3::new(0.12, 0.04, 0.2);
    let field = coils.calibration().field_for(&voltages);
    let solution = coils.set_field(field).unwrap();

    assert!(solution.reachable);
    assert!((solution.voltages - voltages).amax() < 1e-9);
    let write = coils.output().last_write().unwrap();
    // x coil on ao1, y on ao2, z on ao0
    assert!((write.waveform[0][0] - 0.12).abs() < 1e-9);
    assert!((write.waveform[1][1] - 0.04).abs() < 1e-9);
    assert!((write.waveform[2][0] - 0.2).abs() < 1e-9);
}

#[test]
fn test_bench_calibration_approximates_out_of_range_field() {
    let mut coils =
        MagnetCoils::new(MagnetCoilsSettings::default(), RecordingOutput::new()).unwrap();
    let solution = coils.set_field(Vector3::new(10.0, 10.0, 40.0)).unwrap();

    assert!(!solution.reachable);
    let max = coils.calibration().max_voltages();
    for i in 0..3 {
        assert!(solution.voltages[i] >= 0.0 && solution.voltages[i] <= max[i]);
    }
    assert_eq!(coils.output().writes().len(), 1);
}
