//! End-to-end regime detection
//!
//! `RegimeDetector::detect` takes raw bars and runs, in order: cleaning,
//! moving-average warm-up trimming, Savitzky-Golay smoothing, return
//! standardization, k-means seeding, Gaussian HMM fitting and decoding,
//! return-ranked labeling and segment statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::frame::RegimeFrame;
use super::labeler::{current_regime, label_regimes, LabelMap};
use super::segments::{build_segments, RegimeStats, Segment};
use crate::analysis::{first_complete_row, normalize_returns, rolling_mean, KMeans, SavitzkyGolay};
use crate::config::DetectorConfig;
use crate::data::PriceSeries;
use crate::error::{RegimeError, RegimeResult};
use crate::hmm::{Gaussian, GaussianHmm};
use crate::types::{RegimeLabel, REGIME_COUNT};

/// One trimmed input row with its derived columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub smoothed_close: f64,
    pub sma_short: f64,
    pub sma_long: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimePoint {
    pub timestamp: DateTime<Utc>,
    pub state: usize,
    pub label: RegimeLabel,
}

/// Fitted model parameters and EM outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub iterations: usize,
    pub converged: bool,
    pub log_likelihood: f64,
    /// Emission means in standardized-return units
    pub means: Vec<f64>,
    pub variances: Vec<f64>,
    pub start_probabilities: Vec<f64>,
    pub transition_matrix: Vec<Vec<f64>>,
    pub kmeans_inertia: f64,
    pub return_mean: f64,
    pub return_std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeReport {
    pub symbol: String,
    pub interval: String,
    /// Rows left after warm-up trimming
    pub series: Vec<SeriesPoint>,
    /// Decoded state per row, starting at the second trimmed row
    pub regimes: Vec<RegimePoint>,
    pub labels: LabelMap,
    pub current_regime: RegimeLabel,
    pub regime_stats: RegimeStats,
    pub segments: Vec<Segment>,
    pub model: ModelSummary,
}

impl RegimeReport {
    /// Raw state ids in row order
    pub fn assignment(&self) -> Vec<usize> {
        self.regimes.iter().map(|r| r.state).collect()
    }
}

pub struct RegimeDetector {
    config: DetectorConfig,
    smoother: SavitzkyGolay,
}

impl RegimeDetector {
    pub fn new(config: DetectorConfig) -> RegimeResult<Self> {
        config.validate()?;
        let smoother = SavitzkyGolay::new(config.smoothing.window_length, config.smoothing.polyorder)?;
        Ok(Self { config, smoother })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn detect(&self, series: &PriceSeries) -> RegimeResult<RegimeReport> {
        let cleaned = series.clean();
        if cleaned.is_empty() {
            return Err(RegimeError::InsufficientData("no usable price rows after cleaning".to_string()));
        }
        if cleaned.len() < series.len() {
            debug!("Dropped {} incomplete or duplicate rows", series.len() - cleaned.len());
        }

        // Warm-up trimming: keep rows where both moving averages exist
        let closes = cleaned.closes.to_vec();
        let sma_short = rolling_mean(&closes, self.config.indicators.short_window);
        let sma_long = rolling_mean(&closes, self.config.indicators.long_window);
        let first = first_complete_row(&[sma_short.as_slice(), sma_long.as_slice()]).ok_or_else(|| {
            RegimeError::InsufficientData(format!(
                "{} rows cannot fill a {}-row moving average",
                cleaned.len(),
                self.config.indicators.short_window.max(self.config.indicators.long_window)
            ))
        })?;

        let trimmed = cleaned.tail_from(first);
        let window = self.smoother.window_length();
        if trimmed.len() < window {
            return Err(RegimeError::InsufficientData(format!(
                "{} rows after warm-up trimming; smoothing window needs {}",
                trimmed.len(),
                window
            )));
        }
        info!("📊 Detecting regimes on {} rows ({} warm-up rows dropped)", trimmed.len(), first);

        let trimmed_closes = trimmed.closes.to_vec();
        let smoothed = self.smoother.smooth(&trimmed_closes)?;
        let normalized = normalize_returns(&smoothed)?;
        debug!(
            "Smoothed {} closes (window {}, order {}); {} returns, mean {:.6}, std {:.6}",
            smoothed.len(),
            window,
            self.smoother.polyorder(),
            normalized.len(),
            normalized.scaler.mean,
            normalized.scaler.std
        );

        // Seed the HMM emissions from k-means on standardized returns
        let model_config = &self.config.model;
        let observations = normalized.standardized.to_vec();
        let clusters = KMeans::new(REGIME_COUNT, model_config.random_seed)
            .with_n_init(model_config.kmeans_n_init)
            .with_max_iter(model_config.kmeans_max_iter)
            .fit(&observations)?;
        let variances = clusters.cluster_variances(&observations, model_config.covariance_epsilon);
        debug!("k-means centers {:?}, variances {:?}", clusters.centers, variances);

        let emissions = clusters
            .centers
            .iter()
            .zip(&variances)
            .map(|(&mean, &variance)| Gaussian::new(mean, variance))
            .collect();

        let mut hmm = GaussianHmm::with_emissions(emissions)
            .with_n_iter(model_config.n_iter)
            .with_tol(model_config.tol)
            .with_covars_prior(model_config.covars_prior)
            .with_seed(model_config.random_seed)
            .with_progress_every(if self.config.log_fit_progress { 10 } else { 0 });
        let fit = hmm.fit(&normalized.standardized)?;
        let states = hmm.predict(&normalized.standardized)?;

        let frame = RegimeFrame::new(trimmed.timestamps.clone(), trimmed_closes.clone())?
            .with_smoothed(smoothed.clone())?
            .with_regimes(states)?;
        let labels = label_regimes(&frame)?;
        let current = current_regime(&frame, &labels)?;
        let segments = build_segments(&frame, &labels)?;
        let regime_stats = RegimeStats::from_segments(&segments);

        info!(
            "🎯 Current regime: {} ({} segments, EM {} after {} iterations)",
            current,
            segments.len(),
            if fit.converged { "converged" } else { "capped" },
            fit.iterations
        );

        let series_points = trimmed
            .timestamps
            .iter()
            .enumerate()
            .map(|(i, &timestamp)| SeriesPoint {
                timestamp,
                close: trimmed_closes[i],
                smoothed_close: smoothed[i],
                sma_short: sma_short[first + i].unwrap_or(f64::NAN),
                sma_long: sma_long[first + i].unwrap_or(f64::NAN),
            })
            .collect();

        let regime_points = frame
            .timestamps
            .iter()
            .zip(frame.regimes()?)
            .map(|(&timestamp, &state)| {
                let label = labels
                    .label_of(state)
                    .ok_or_else(|| RegimeError::Internal(format!("state {} has no label", state)))?;
                Ok(RegimePoint { timestamp, state, label })
            })
            .collect::<RegimeResult<Vec<_>>>()?;

        let params = &hmm.params;
        let model = ModelSummary {
            iterations: fit.iterations,
            converged: fit.converged,
            log_likelihood: fit.log_likelihood,
            means: params.means(),
            variances: params.variances(),
            start_probabilities: params.start.to_vec(),
            transition_matrix: params.transitions.rows().into_iter().map(|r| r.to_vec()).collect(),
            kmeans_inertia: clusters.inertia,
            return_mean: normalized.scaler.mean,
            return_std: normalized.scaler.std,
        };

        Ok(RegimeReport {
            symbol: series.symbol.clone(),
            interval: series.interval.clone(),
            series: series_points,
            regimes: regime_points,
            labels,
            current_regime: current,
            regime_stats,
            segments,
            model,
        })
    }
}
