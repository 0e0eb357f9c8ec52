//! Column store passed between the late pipeline stages

use chrono::{DateTime, Utc};

use crate::error::{RegimeError, RegimeResult};
use crate::types::REGIME_COUNT;

/// Rows of the warm-up-trimmed series. Columns are filled in stage by
/// stage; readers ask for the column they need and get `MissingColumn` if
/// an earlier stage has not run.
#[derive(Debug, Clone)]
pub struct RegimeFrame {
    pub timestamps: Vec<DateTime<Utc>>,
    pub close: Vec<f64>,
    smoothed_close: Option<Vec<f64>>,
    regimes: Option<Vec<usize>>,
}

impl RegimeFrame {
    pub fn new(timestamps: Vec<DateTime<Utc>>, close: Vec<f64>) -> RegimeResult<Self> {
        if timestamps.len() != close.len() {
            return Err(RegimeError::Internal(format!(
                "{} timestamps for {} close prices",
                timestamps.len(),
                close.len()
            )));
        }
        Ok(Self {
            timestamps,
            close,
            smoothed_close: None,
            regimes: None,
        })
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn with_smoothed(mut self, smoothed: Vec<f64>) -> RegimeResult<Self> {
        if smoothed.len() != self.len() {
            return Err(RegimeError::Internal(format!(
                "smoothed series has {} rows, frame has {}",
                smoothed.len(),
                self.len()
            )));
        }
        self.smoothed_close = Some(smoothed);
        Ok(self)
    }

    /// Attach decoded states. Differencing consumed the first row, so the
    /// frame drops it and every column is re-aligned to the states.
    pub fn with_regimes(mut self, states: Vec<usize>) -> RegimeResult<Self> {
        if self.is_empty() || states.len() + 1 != self.len() {
            return Err(RegimeError::Internal(format!(
                "{} states cannot align with {} rows (expected rows - 1)",
                states.len(),
                self.len()
            )));
        }
        if let Some(bad) = states.iter().find(|&&s| s >= REGIME_COUNT) {
            return Err(RegimeError::InvalidParameter(
                "regimes".to_string(),
                format!("state id {} outside 0..{}", bad, REGIME_COUNT),
            ));
        }

        self.timestamps.remove(0);
        self.close.remove(0);
        if let Some(smoothed) = self.smoothed_close.as_mut() {
            smoothed.remove(0);
        }
        self.regimes = Some(states);
        Ok(self)
    }

    pub fn smoothed_close(&self) -> RegimeResult<&[f64]> {
        self.smoothed_close
            .as_deref()
            .ok_or_else(|| RegimeError::MissingColumn("smoothed_close".to_string()))
    }

    pub fn regimes(&self) -> RegimeResult<&[usize]> {
        self.regimes
            .as_deref()
            .ok_or_else(|| RegimeError::MissingColumn("regime".to_string()))
    }
}
