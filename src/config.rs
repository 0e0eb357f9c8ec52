// Configuration management for the regime detector

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Where price history comes from and how far back it reaches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_start")]
    pub start: String, // YYYY-MM-DD
    #[serde(default = "default_warmup_days")]
    pub warmup_days: i64, // calendar days fetched before `start`
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            rest_url: default_rest_url(),
            symbol: default_symbol(),
            interval: default_interval(),
            start: default_start(),
            warmup_days: default_warmup_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default = "default_short_window")]
    pub short_window: usize,
    #[serde(default = "default_long_window")]
    pub long_window: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            short_window: default_short_window(),
            long_window: default_long_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingConfig {
    #[serde(default = "default_window_length")]
    pub window_length: usize, // must be odd
    #[serde(default = "default_polyorder")]
    pub polyorder: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_length: default_window_length(),
            polyorder: default_polyorder(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_n_iter")]
    pub n_iter: usize,
    #[serde(default = "default_tol")]
    pub tol: f64,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    #[serde(default = "default_kmeans_n_init")]
    pub kmeans_n_init: usize,
    #[serde(default = "default_kmeans_max_iter")]
    pub kmeans_max_iter: usize,
    #[serde(default = "default_covariance_epsilon")]
    pub covariance_epsilon: f64, // added to k-means cluster variances
    #[serde(default = "default_covars_prior")]
    pub covars_prior: f64, // EM variance prior
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_iter: default_n_iter(),
            tol: default_tol(),
            random_seed: default_random_seed(),
            kmeans_n_init: default_kmeans_n_init(),
            kmeans_max_iter: default_kmeans_max_iter(),
            covariance_epsilon: default_covariance_epsilon(),
            covars_prior: default_covars_prior(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub log_fit_progress: bool,
}

impl LoggingConfig {
    /// Subscriber level named by `level` (error, warn, info, debug or trace)
    pub fn max_level(&self) -> Result<tracing::Level, ConfigError> {
        self.level.trim().parse::<tracing::Level>().map_err(|_| {
            ConfigError::Validation(format!(
                "logging level must be one of error, warn, info, debug, trace (got '{}')",
                self.level
            ))
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_fit_progress: false,
        }
    }
}

/// Everything the pipeline itself needs, without data source or logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub indicators: IndicatorConfig,
    pub smoothing: SmoothingConfig,
    pub model: ModelConfig,
    pub log_fit_progress: bool,
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let smoothing = &self.smoothing;
        if smoothing.window_length % 2 == 0 {
            return Err(ConfigError::Validation(format!(
                "window_length must be odd (got {})",
                smoothing.window_length
            )));
        }
        if smoothing.polyorder >= smoothing.window_length {
            return Err(ConfigError::Validation(format!(
                "polyorder ({}) must be less than window_length ({})",
                smoothing.polyorder, smoothing.window_length
            )));
        }

        let indicators = &self.indicators;
        if indicators.short_window == 0 || indicators.long_window == 0 {
            return Err(ConfigError::Validation("moving average windows must be greater than 0".to_string()));
        }

        let model = &self.model;
        if model.n_iter == 0 {
            return Err(ConfigError::Validation("n_iter must be greater than 0".to_string()));
        }
        if !(model.tol >= 0.0) {
            return Err(ConfigError::Validation("tol must be non-negative".to_string()));
        }
        if model.kmeans_n_init < 10 {
            return Err(ConfigError::Validation(format!(
                "kmeans_n_init must be at least 10 (got {})",
                model.kmeans_n_init
            )));
        }
        if model.kmeans_max_iter == 0 {
            return Err(ConfigError::Validation("kmeans_max_iter must be greater than 0".to_string()));
        }
        if !(model.covariance_epsilon > 0.0) {
            return Err(ConfigError::Validation("covariance_epsilon must be positive".to_string()));
        }
        if !(model.covars_prior >= 0.0) {
            return Err(ConfigError::Validation("covars_prior must be non-negative".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::FileWrite(e.to_string()))?;

        Ok(())
    }

    /// Load configuration from file, or create default if file doesn't exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let config = Self::default();
            config.to_file(&path)?;
            tracing::info!("📁 Created default config file: {}", path.as_ref().display());
            Ok(config)
        }
    }

    /// Pipeline settings, detached from data source and logging
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            indicators: self.indicators.clone(),
            smoothing: self.smoothing.clone(),
            model: self.model.clone(),
            log_fit_progress: self.logging.log_fit_progress,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.symbol.trim().is_empty() {
            return Err(ConfigError::Validation("symbol must not be empty".to_string()));
        }

        if chrono::NaiveDate::parse_from_str(&self.data.start, "%Y-%m-%d").is_err() {
            return Err(ConfigError::Validation(format!(
                "start must be a YYYY-MM-DD date (got '{}')",
                self.data.start
            )));
        }

        if self.data.warmup_days < 0 {
            return Err(ConfigError::Validation("warmup_days must be non-negative".to_string()));
        }

        self.logging.max_level()?;

        self.detector_config().validate()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(String),

    #[error("Failed to write config file: {0}")]
    FileWrite(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

fn default_rest_url() -> String {
    "https://api.kraken.com".to_string()
}

fn default_symbol() -> String {
    "XBTUSD".to_string()
}

fn default_interval() -> String {
    "1d".to_string()
}

fn default_start() -> String {
    "2021-01-01".to_string()
}

fn default_warmup_days() -> i64 {
    200
}

fn default_short_window() -> usize {
    50
}

fn default_long_window() -> usize {
    200
}

fn default_window_length() -> usize {
    15
}

fn default_polyorder() -> usize {
    3
}

fn default_n_iter() -> usize {
    3000
}

fn default_tol() -> f64 {
    1e-2
}

fn default_random_seed() -> u64 {
    42
}

fn default_kmeans_n_init() -> usize {
    50
}

fn default_kmeans_max_iter() -> usize {
    300
}

fn default_covariance_epsilon() -> f64 {
    1e-5
}

fn default_covars_prior() -> f64 {
    1e-2
}

fn default_log_level() -> String {
    "info".to_string()
}
