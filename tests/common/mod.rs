// Common test utilities and helpers
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use market_regime::{Config, DetectorConfig, PriceBar, PriceSeries};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;
use std::path::PathBuf;

/// Rows consumed by the 200-period moving average before the first usable row
pub const WARMUP_ROWS: usize = 199;

/// Default configuration with a smaller k-means restart count to keep tests quick
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.data.symbol = "XBTUSD".to_string();
    config.model.kmeans_n_init = 10;
    config
}

pub fn create_detector_config() -> DetectorConfig {
    create_test_config().detector_config()
}

/// Create a temporary directory holding a path for a config or report file
pub fn create_temp_file(name: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join(name);
    (temp_dir, path)
}

/// Daily timestamps starting 2020-01-01
pub fn generate_test_timestamps(count: usize) -> Vec<DateTime<Utc>> {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    (0..count).map(|i| start + Duration::days(i as i64)).collect()
}

/// Daily series whose bars all open, close and trade at the given prices
pub fn series_from_closes(closes: &[f64]) -> PriceSeries {
    let bars = generate_test_timestamps(closes.len())
        .into_iter()
        .zip(closes)
        .map(|(timestamp, &close)| PriceBar {
            timestamp,
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 1000.0,
        })
        .collect();
    PriceSeries::from_bars(bars, "XBTUSD".to_string(), "1d".to_string())
}

/// Seeded geometric random walk
pub fn random_walk(count: usize, drift: f64, volatility: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut prices = Vec::with_capacity(count);
    let mut current = 100.0;

    for _ in 0..count {
        let change = drift + rng.gen_range(-volatility..volatility);
        current *= 1.0 + change;
        prices.push(current);
    }

    prices
}

/// Closes 100, 101, 102, ... one per day
pub fn linear_prices(count: usize) -> Vec<f64> {
    (0..count).map(|i| 100.0 + i as f64).collect()
}

/// Prices that fall `step` per day for `block` days, then rise for `block` days, repeatedly
pub fn alternating_prices(count: usize, block: usize, step: f64) -> Vec<f64> {
    let mut current = 100.0;
    (0..count)
        .map(|i| {
            let falling = (i / block) % 2 == 0;
            current *= if falling { 1.0 - step } else { 1.0 + step };
            current
        })
        .collect()
}
