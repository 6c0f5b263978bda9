use flight_core::{ConfigError, DelayRange, SimulatorConfig};
use std::io::Write;

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "success_probability = 0.5\n\n[delay]\nmin_ms = 200\nmax_ms = 800"
    )
    .unwrap();

    let config = SimulatorConfig::load(file.path()).unwrap();
    assert_eq!(config.delay, DelayRange { min_ms: 200, max_ms: 800 });
    assert!((config.success_probability - 0.5).abs() < f64::EPSILON);
}

#[test]
fn test_empty_file_gives_defaults() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let config = SimulatorConfig::load(file.path()).unwrap();
    assert_eq!(config, SimulatorConfig::default());
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SimulatorConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_file_values_are_validated() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[delay]\nmin_ms = 900\nmax_ms = 100").unwrap();
    let err = SimulatorConfig::load(file.path()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::InvalidDelayRange { min_ms: 900, max_ms: 100 }
    ));
}
