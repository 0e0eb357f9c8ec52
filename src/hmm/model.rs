//! Gaussian HMM: fit, decode, score and sample

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::algorithms::{backward, baum_welch_step, forward, log_emissions, posteriors, viterbi};
use super::gaussian::Gaussian;
use super::HmmParams;
use crate::error::{RegimeError, RegimeResult};

/// Outcome of one EM run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub iterations: usize,
    /// False when the iteration cap was hit first
    pub converged: bool,
    /// Log-likelihood of the parameters entering the final M-step
    pub log_likelihood: f64,
    pub history: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct GaussianHmm {
    pub params: HmmParams,
    pub n_iter: usize,
    pub tol: f64,
    pub covars_prior: f64,
    pub seed: u64,
    /// Emit a debug line every this many EM iterations (0 = never)
    pub progress_every: usize,
}

impl GaussianHmm {
    /// Untrained model with standard-normal emissions spread around zero
    pub fn new(n_states: usize) -> Self {
        let emissions = (0..n_states)
            .map(|i| Gaussian::new(i as f64 - (n_states as f64 - 1.0) / 2.0, 1.0))
            .collect();
        Self::with_emissions(emissions)
    }

    /// Model seeded with the given emissions; start and transition
    /// probabilities are uniform and left for EM to learn.
    pub fn with_emissions(emissions: Vec<Gaussian>) -> Self {
        Self {
            params: HmmParams::uniform(emissions),
            n_iter: 3000,
            tol: 1e-2,
            covars_prior: 1e-2,
            seed: 42,
            progress_every: 0,
        }
    }

    pub fn from_params(params: HmmParams) -> Self {
        let mut model = Self::with_emissions(params.emissions.clone());
        model.params = params;
        model
    }

    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_covars_prior(mut self, covars_prior: f64) -> Self {
        self.covars_prior = covars_prior;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_progress_every(mut self, every: usize) -> Self {
        self.progress_every = every;
        self
    }

    pub fn n_states(&self) -> usize {
        self.params.n_states()
    }

    /// Baum-Welch until the log-likelihood gain drops below `tol` or
    /// `n_iter` iterations have run. Hitting the cap is reported, not raised.
    pub fn fit(&mut self, observations: &Array1<f64>) -> RegimeResult<FitReport> {
        check_observations(observations)?;

        let mut history: Vec<f64> = Vec::new();
        let mut converged = false;

        for iter in 0..self.n_iter {
            let (updated, log_ll) = baum_welch_step(observations, &self.params, self.covars_prior);

            if !log_ll.is_finite() {
                return Err(RegimeError::DegenerateInput(format!(
                    "log-likelihood became {} at EM iteration {}",
                    log_ll,
                    iter + 1
                )));
            }

            let gain = history.last().map(|prev| log_ll - prev);
            history.push(log_ll);

            // log_ll scores the parameters before this M-step
            self.params = updated;

            if matches!(gain, Some(delta) if delta < self.tol) {
                converged = true;
                info!("EM converged after {} iterations (log-likelihood {:.4})", iter + 1, log_ll);
                break;
            }

            if self.progress_every > 0 && (iter + 1) % self.progress_every == 0 {
                debug!("EM iteration {}: log-likelihood = {:.4}", iter + 1, log_ll);
            }
        }

        if !converged {
            warn!(
                "⚠️  EM stopped at the {}-iteration cap without converging; using last parameters",
                self.n_iter
            );
        }

        let log_likelihood = history.last().copied().unwrap_or(f64::NEG_INFINITY);
        Ok(FitReport {
            iterations: history.len(),
            converged,
            log_likelihood,
            history,
        })
    }

    /// Most likely state sequence (Viterbi) and its log probability
    pub fn decode(&self, observations: &Array1<f64>) -> RegimeResult<(Vec<usize>, f64)> {
        check_observations(observations)?;
        let log_emit = log_emissions(observations, &self.params.emissions);
        Ok(viterbi(
            &self.params.start.mapv(f64::ln),
            &self.params.transitions.mapv(f64::ln),
            &log_emit,
        ))
    }

    pub fn predict(&self, observations: &Array1<f64>) -> RegimeResult<Vec<usize>> {
        Ok(self.decode(observations)?.0)
    }

    /// Posterior state probabilities (T x N)
    pub fn predict_proba(&self, observations: &Array1<f64>) -> RegimeResult<Array2<f64>> {
        check_observations(observations)?;
        let log_trans = self.params.transitions.mapv(f64::ln);
        let log_emit = log_emissions(observations, &self.params.emissions);
        let (log_alpha, log_ll) = forward(&self.params.start.mapv(f64::ln), &log_trans, &log_emit);
        let log_beta = backward(&log_trans, &log_emit);
        Ok(posteriors(&log_alpha, &log_beta, log_ll))
    }

    /// Log-likelihood of the observations under the model
    pub fn score(&self, observations: &Array1<f64>) -> RegimeResult<f64> {
        check_observations(observations)?;
        let log_emit = log_emissions(observations, &self.params.emissions);
        let (_, log_ll) = forward(
            &self.params.start.mapv(f64::ln),
            &self.params.transitions.mapv(f64::ln),
            &log_emit,
        );
        Ok(log_ll)
    }

    /// Draw a sequence from the model with the configured seed
    pub fn sample(&self, length: usize) -> (Array1<f64>, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut states = Vec::with_capacity(length);
        let mut observations = Array1::zeros(length);

        let mut state = sample_discrete(self.params.start.iter().copied(), &mut rng);
        for t in 0..length {
            if t > 0 {
                state = sample_discrete(self.params.transitions.row(state).iter().copied(), &mut rng);
            }
            states.push(state);
            observations[t] = self.params.emissions[state].sample(&mut rng);
        }

        (observations, states)
    }
}

fn check_observations(observations: &Array1<f64>) -> RegimeResult<()> {
    if observations.is_empty() {
        return Err(RegimeError::InsufficientData("HMM needs at least one observation".to_string()));
    }
    if observations.iter().any(|x| !x.is_finite()) {
        return Err(RegimeError::DegenerateInput("observations contain non-finite values".to_string()));
    }
    Ok(())
}

fn sample_discrete<I, R>(probs: I, rng: &mut R) -> usize
where
    I: Iterator<Item = f64>,
    R: Rng,
{
    let u: f64 = rng.gen();
    let mut cumsum = 0.0;
    let mut last = 0;
    for (i, p) in probs.enumerate() {
        cumsum += p;
        last = i;
        if u < cumsum {
            return i;
        }
    }
    last
}
