//! Savitzky-Golay smoothing of close prices
//!
//! Each output point is a least-squares polynomial fitted to the window of
//! `window_length` points around it, evaluated at the window center. The
//! first and last `window_length / 2` points have no centered window; they
//! are evaluated on the polynomial fitted to the first (last) full window.

use nalgebra::{DMatrix, DVector};
use ndarray::Array1;

use crate::error::{RegimeError, RegimeResult};

#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    window_length: usize,
    polyorder: usize,
    /// weights[k] evaluates the window polynomial at offset `k - half`
    weights: Vec<Array1<f64>>,
}

impl SavitzkyGolay {
    pub fn new(window_length: usize, polyorder: usize) -> RegimeResult<Self> {
        if window_length % 2 == 0 {
            return Err(RegimeError::InvalidParameter(
                "window_length".to_string(),
                format!("must be odd (got {})", window_length),
            ));
        }
        if polyorder >= window_length {
            return Err(RegimeError::InvalidParameter(
                "polyorder".to_string(),
                format!("must be less than window_length ({} >= {})", polyorder, window_length),
            ));
        }

        let half = window_length / 2;
        let weights = (0..window_length)
            .map(|k| evaluation_weights(window_length, polyorder, k as f64 - half as f64))
            .collect::<RegimeResult<Vec<_>>>()?;

        Ok(Self {
            window_length,
            polyorder,
            weights,
        })
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn polyorder(&self) -> usize {
        self.polyorder
    }

    /// Weights of the centered filter (the classic convolution coefficients)
    pub fn center_coefficients(&self) -> &Array1<f64> {
        &self.weights[self.window_length / 2]
    }

    pub fn smooth(&self, values: &[f64]) -> RegimeResult<Vec<f64>> {
        let n = values.len();
        let w = self.window_length;
        if n < w {
            return Err(RegimeError::InsufficientData(format!(
                "smoothing needs at least {} points, got {}",
                w, n
            )));
        }

        let half = w / 2;
        let apply = |start: usize, weights: &Array1<f64>| -> f64 {
            values[start..start + w]
                .iter()
                .zip(weights.iter())
                .map(|(v, h)| v * h)
                .sum()
        };

        let mut smoothed = Vec::with_capacity(n);
        for i in 0..n {
            let value = if i < half {
                apply(0, &self.weights[i])
            } else if i + half >= n {
                apply(n - w, &self.weights[i + w - n])
            } else {
                apply(i - half, self.center_coefficients())
            };
            smoothed.push(value);
        }

        Ok(smoothed)
    }
}

/// Weights `h` such that `h · y` is the least-squares polynomial through the
/// window evaluated at `offset` (relative to the window center).
fn evaluation_weights(window_length: usize, polyorder: usize, offset: f64) -> RegimeResult<Array1<f64>> {
    let half = (window_length / 2).max(1) as f64;
    let terms = polyorder + 1;

    // Offsets are scaled to [-1, 1] to keep the normal equations well conditioned
    let design = DMatrix::from_fn(window_length, terms, |j, k| {
        let x = (j as f64 - (window_length / 2) as f64) / half;
        x.powi(k as i32)
    });

    let t = offset / half;
    let target = DVector::from_fn(terms, |k, _| t.powi(k as i32));

    // (A'A) z = e(t), then h = A z
    let normal = design.transpose() * &design;
    let z = normal.lu().solve(&target).ok_or_else(|| {
        RegimeError::Internal("singular normal equations in Savitzky-Golay fit".to_string())
    })?;

    Ok(Array1::from_iter((design * z).iter().copied()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_even_window() {
        assert!(matches!(
            SavitzkyGolay::new(14, 3),
            Err(RegimeError::InvalidParameter(name, _)) if name == "window_length"
        ));
    }

    #[test]
    fn test_rejects_order_not_below_window() {
        assert!(SavitzkyGolay::new(3, 3).is_err());
        assert!(SavitzkyGolay::new(5, 7).is_err());
    }

    #[test]
    fn test_short_input_is_insufficient() {
        let filter = SavitzkyGolay::new(15, 3).unwrap();
        let values = vec![1.0; 14];
        assert!(matches!(filter.smooth(&values), Err(RegimeError::InsufficientData(_))));
    }

    #[test]
    fn test_known_coefficients() {
        // Classic 5-point quadratic filter: (-3, 12, 17, 12, -3) / 35
        let filter = SavitzkyGolay::new(5, 2).unwrap();
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0];
        for (h, e) in filter.center_coefficients().iter().zip(expected.iter()) {
            assert!((h - e / 35.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_center_coefficients_sum_to_one() {
        let filter = SavitzkyGolay::new(15, 3).unwrap();
        let sum: f64 = filter.center_coefficients().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cubic_passes_through_unchanged() {
        let filter = SavitzkyGolay::new(15, 3).unwrap();
        let values: Vec<f64> = (0..40)
            .map(|i| {
                let x = i as f64;
                0.01 * x * x * x - 0.3 * x * x + 2.0 * x + 100.0
            })
            .collect();

        let smoothed = filter.smooth(&values).unwrap();
        assert_eq!(smoothed.len(), values.len());
        for (s, v) in smoothed.iter().zip(values.iter()) {
            assert!((s - v).abs() < 1e-6, "{} vs {}", s, v);
        }
    }

    #[test]
    fn test_reduces_noise() {
        let filter = SavitzkyGolay::new(15, 3).unwrap();
        let values: Vec<f64> = (0..100)
            .map(|i| 100.0 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();

        let smoothed = filter.smooth(&values).unwrap();
        let interior_dev: f64 = smoothed[10..90].iter().map(|s| (s - 100.0).abs()).fold(0.0, f64::max);
        assert!(interior_dev < 0.5);
    }

    #[test]
    fn test_edge_weights_match_polynomial_fit() {
        // 5-point quadratic evaluated at the first window point: (31, 9, -3, -5, 3) / 35
        let h = evaluation_weights(5, 2, -2.0).unwrap();
        let expected = [31.0, 9.0, -3.0, -5.0, 3.0];
        for (w, e) in h.iter().zip(expected.iter()) {
            assert!((w - e / 35.0).abs() < 1e-12);
        }

        let filter = SavitzkyGolay::new(15, 3).unwrap();
        for k in 0..15 {
            let sum: f64 = filter.weights[k].sum();
            assert!((sum - 1.0).abs() < 1e-10, "offset {} sums to {}", k, sum);
        }
    }
}
