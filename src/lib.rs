// Market Regime Detector Library
//
// Labels price history as Bearish, Neutral or Bullish with a three-state
// Gaussian hidden Markov model fitted to smoothed, standardized returns

pub mod analysis;
pub mod config;
pub mod data;
pub mod error; // Unified error handling
pub mod hmm;
pub mod progress;
pub mod regime;
pub mod types;

// Re-export error types
pub use error::{RegimeError, RegimeResult};

// Re-export configuration
pub use config::{
    Config, ConfigError, DataConfig, DetectorConfig, IndicatorConfig, LoggingConfig, ModelConfig, SmoothingConfig,
};

// Re-export data sources
pub use data::kraken_api::{KrakenApiError, KrakenHistoricalClient};
pub use data::loader::load_series;
pub use data::{PriceBar, PriceSeries};

// Re-export pipeline components
pub use analysis::{normalize_returns, KMeans, KMeansFit, NormalizedReturns, SavitzkyGolay};
pub use hmm::{FitReport, Gaussian, GaussianHmm, HmmParams};
pub use regime::{
    LabelMap, LabelStats, ModelSummary, RegimeDetector, RegimeFrame, RegimePoint, RegimeReport, RegimeStats, Segment,
    SeriesPoint, StateLabel,
};
pub use types::{RegimeColor, RegimeLabel, REGIME_COUNT};

pub use progress::Spinner;
