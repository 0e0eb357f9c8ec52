//! Univariate Gaussian emission density

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    pub mean: f64,
    pub variance: f64,
}

impl Gaussian {
    pub fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }

    pub fn log_pdf(&self, x: f64) -> f64 {
        let diff = x - self.mean;
        -0.5 * ((2.0 * PI * self.variance).ln() + diff * diff / self.variance)
    }

    /// Box-Muller draw
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
        let u2: f64 = rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        self.mean + z * self.variance.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_standard_normal_log_pdf() {
        let g = Gaussian::new(0.0, 1.0);
        let expected = -0.5 * (2.0 * PI).ln();
        assert!((g.log_pdf(0.0) - expected).abs() < 1e-12);
        assert!((g.log_pdf(1.0) - (expected - 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_sample_moments() {
        let g = Gaussian::new(2.0, 0.25);
        let mut rng = StdRng::seed_from_u64(42);
        let draws: Vec<f64> = (0..20_000).map(|_| g.sample(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        assert!((mean - 2.0).abs() < 0.02);
        assert!((var - 0.25).abs() < 0.02);
    }
}
