//! Gaussian hidden Markov model over 1-D observations
//!
//! Fitting is Baum-Welch EM, decoding is Viterbi; both run in log space so
//! long daily histories do not underflow.

mod algorithms;
mod gaussian;
mod model;

pub use algorithms::{backward, baum_welch_step, forward, log_emissions, logsumexp, posteriors, viterbi};
pub use gaussian::Gaussian;
pub use model::{FitReport, GaussianHmm};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HmmParams {
    /// Initial state probabilities
    pub start: Array1<f64>,
    /// State transition matrix, rows sum to 1
    pub transitions: Array2<f64>,
    /// Emission distribution per state
    pub emissions: Vec<Gaussian>,
}

impl HmmParams {
    /// Uniform start and transition probabilities around the given emissions
    pub fn uniform(emissions: Vec<Gaussian>) -> Self {
        let n = emissions.len();
        let p = 1.0 / n as f64;
        Self {
            start: Array1::from_elem(n, p),
            transitions: Array2::from_elem((n, n), p),
            emissions,
        }
    }

    pub fn n_states(&self) -> usize {
        self.emissions.len()
    }

    pub fn means(&self) -> Vec<f64> {
        self.emissions.iter().map(|e| e.mean).collect()
    }

    pub fn variances(&self) -> Vec<f64> {
        self.emissions.iter().map(|e| e.variance).collect()
    }
}
