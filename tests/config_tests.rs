// Integration tests for configuration loading and validation

mod common;

use common::{create_temp_file, create_test_config};
use market_regime::{Config, ConfigError, RegimeDetector};
use std::fs;

#[test]
fn test_default_config_values() {
    let config = Config::default();

    assert_eq!(config.data.symbol, "XBTUSD");
    assert_eq!(config.data.interval, "1d");
    assert_eq!(config.data.warmup_days, 200);
    assert_eq!(config.indicators.short_window, 50);
    assert_eq!(config.indicators.long_window, 200);
    assert_eq!(config.smoothing.window_length, 15);
    assert_eq!(config.smoothing.polyorder, 3);
    assert_eq!(config.model.n_iter, 3000);
    assert_eq!(config.model.random_seed, 42);
    assert_eq!(config.model.kmeans_n_init, 50);
    assert!((config.model.tol - 1e-2).abs() < 1e-15);
    assert!((config.model.covariance_epsilon - 1e-5).abs() < 1e-15);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_serialization_deserialization() {
    let config = create_test_config();

    let toml_string = toml::to_string(&config).expect("Failed to serialize config");
    assert!(toml_string.contains("window_length"));
    assert!(toml_string.contains("XBTUSD"));

    let deserialized: Config = toml::from_str(&toml_string).expect("Failed to deserialize config");
    assert_eq!(deserialized.data.symbol, config.data.symbol);
    assert_eq!(deserialized.model.kmeans_n_init, 10);
}

#[test]
fn test_config_file_round_trip() {
    let (_temp_dir, path) = create_temp_file("regime.toml");
    let mut config = create_test_config();
    config.data.symbol = "ETHUSD".to_string();
    config.smoothing.window_length = 21;

    config.to_file(&path).expect("Failed to write config");
    let loaded = Config::from_file(&path).expect("Failed to load config");

    assert_eq!(loaded.data.symbol, "ETHUSD");
    assert_eq!(loaded.smoothing.window_length, 21);
}

#[test]
fn test_load_or_create_writes_defaults() {
    let (_temp_dir, path) = create_temp_file("fresh.toml");
    assert!(!path.exists());

    let config = Config::load_or_create(&path).expect("Failed to create config");
    assert!(path.exists());
    assert_eq!(config.smoothing.window_length, 15);

    // Second call reads the file it just wrote
    let again = Config::load_or_create(&path).expect("Failed to reload config");
    assert_eq!(again.model.random_seed, config.model.random_seed);
}

#[test]
fn test_partial_file_uses_defaults() {
    let (_temp_dir, path) = create_temp_file("partial.toml");
    fs::write(&path, "[data]\nsymbol = \"SOLUSD\"\n").expect("Failed to write config");

    let config = Config::from_file(&path).expect("Failed to load config");
    assert_eq!(config.data.symbol, "SOLUSD");
    assert_eq!(config.data.interval, "1d");
    assert_eq!(config.model.n_iter, 3000);
}

#[test]
fn test_even_window_rejected() {
    let (_temp_dir, path) = create_temp_file("even.toml");
    fs::write(&path, "[smoothing]\nwindow_length = 14\n").expect("Failed to write config");

    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("odd")));
}

#[test]
fn test_polyorder_must_be_below_window() {
    let mut config = create_test_config();
    config.smoothing.window_length = 5;
    config.smoothing.polyorder = 5;
    assert!(config.validate().is_err());
    assert!(RegimeDetector::new(config.detector_config()).is_err());
}

#[test]
fn test_bad_start_date_rejected() {
    let mut config = create_test_config();
    config.data.start = "01/02/2021".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let (_temp_dir, path) = create_temp_file("broken.toml");
    fs::write(&path, "[model\nn_iter = ").expect("Failed to write config");
    assert!(matches!(Config::from_file(&path), Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_file_is_read_error() {
    let (_temp_dir, path) = create_temp_file("absent.toml");
    assert!(matches!(Config::from_file(&path), Err(ConfigError::FileRead(_))));
}

#[test]
fn test_detector_config_carries_sections() {
    let mut config = create_test_config();
    config.logging.log_fit_progress = true;
    config.model.n_iter = 500;

    let detector_config = config.detector_config();
    assert!(detector_config.log_fit_progress);
    assert_eq!(detector_config.model.n_iter, 500);
    assert_eq!(detector_config.smoothing.window_length, config.smoothing.window_length);
}

#[test]
fn test_logging_level_parsed() {
    let mut config = create_test_config();
    assert_eq!(config.logging.max_level().unwrap(), tracing::Level::INFO);

    config.logging.level = "DEBUG".to_string();
    assert_eq!(config.logging.max_level().unwrap(), tracing::Level::DEBUG);
    config.logging.level = "warn".to_string();
    assert_eq!(config.logging.max_level().unwrap(), tracing::Level::WARN);
}

#[test]
fn test_unknown_logging_level_rejected() {
    let (_temp_dir, path) = create_temp_file("loud.toml");
    fs::write(&path, "[logging]\nlevel = \"shouty\"\n").expect("Failed to write config");

    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("shouty")));
}
