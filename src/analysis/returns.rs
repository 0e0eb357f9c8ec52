//! Percent-change returns and z-score standardization

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{RegimeError, RegimeResult};

/// Below this the return series is treated as constant.
pub const MIN_RETURN_STD: f64 = 1e-12;

/// Period-over-period percent change; one element shorter than the input.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect()
}

/// Mean and population standard deviation fitted on one batch of returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnScaler {
    pub mean: f64,
    pub std: f64,
}

impl ReturnScaler {
    pub fn fit(returns: &[f64]) -> RegimeResult<Self> {
        if returns.is_empty() {
            return Err(RegimeError::InsufficientData("no returns to standardize".to_string()));
        }
        if returns.iter().any(|r| !r.is_finite()) {
            return Err(RegimeError::DegenerateInput(
                "non-finite return (zero or missing price in smoothed series)".to_string(),
            ));
        }

        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();

        if std < MIN_RETURN_STD {
            return Err(RegimeError::DegenerateInput(format!(
                "returns have zero variance (std = {:e})",
                std
            )));
        }

        Ok(Self { mean, std })
    }

    pub fn transform(&self, returns: &[f64]) -> Array1<f64> {
        returns.iter().map(|r| (r - self.mean) / self.std).collect()
    }

    pub fn inverse(&self, z: f64) -> f64 {
        z * self.std + self.mean
    }
}

/// Observation vector fed to the state initializer and the HMM.
#[derive(Debug, Clone)]
pub struct NormalizedReturns {
    pub returns: Vec<f64>,
    pub standardized: Array1<f64>,
    pub scaler: ReturnScaler,
}

impl NormalizedReturns {
    pub fn len(&self) -> usize {
        self.standardized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.standardized.is_empty()
    }
}

pub fn normalize_returns(smoothed: &[f64]) -> RegimeResult<NormalizedReturns> {
    if smoothed.len() < 2 {
        return Err(RegimeError::InsufficientData(format!(
            "need at least 2 smoothed prices to compute returns, got {}",
            smoothed.len()
        )));
    }

    let returns = pct_change(smoothed);
    let scaler = ReturnScaler::fit(&returns)?;
    let standardized = scaler.transform(&returns);

    Ok(NormalizedReturns {
        returns,
        standardized,
        scaler,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_change() {
        let r = pct_change(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.1).abs() < 1e-12);
        assert!((r[1] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_standardized_has_zero_mean_unit_variance() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let normalized = normalize_returns(&prices).unwrap();

        assert_eq!(normalized.len(), prices.len() - 1);
        let n = normalized.len() as f64;
        let mean = normalized.standardized.sum() / n;
        let var = normalized.standardized.iter().map(|z| (z - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 1e-10);
        assert!((var - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_scaler_inverse() {
        let normalized = normalize_returns(&[1.0, 2.0, 3.0, 5.0]).unwrap();
        let z = normalized.standardized[1];
        assert!((normalized.scaler.inverse(z) - normalized.returns[1]).abs() < 1e-12);
    }

    #[test]
    fn test_constant_series_is_degenerate() {
        let err = normalize_returns(&[50.0; 30]).unwrap_err();
        assert!(matches!(err, RegimeError::DegenerateInput(_)));
    }

    #[test]
    fn test_constant_growth_rate_is_degenerate() {
        let prices: Vec<f64> = (0..20).map(|i| 2f64.powi(i)).collect();
        assert!(matches!(normalize_returns(&prices), Err(RegimeError::DegenerateInput(_))));
    }

    #[test]
    fn test_zero_price_is_degenerate() {
        assert!(matches!(
            normalize_returns(&[0.0, 1.0, 2.0]),
            Err(RegimeError::DegenerateInput(_))
        ));
    }

    #[test]
    fn test_single_price_is_insufficient() {
        assert!(matches!(normalize_returns(&[1.0]), Err(RegimeError::InsufficientData(_))));
    }
}
