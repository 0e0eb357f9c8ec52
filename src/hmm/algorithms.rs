//! HMM algorithms in log space: forward, backward, Viterbi, Baum-Welch step

use super::gaussian::Gaussian;
use super::HmmParams;
use ndarray::{Array1, Array2};

/// log(sum(exp(values))) without overflow; `-inf` for an empty or all `-inf` input.
pub fn logsumexp<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let values: Vec<f64> = values.into_iter().collect();
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Emission log densities (T x N)
pub fn log_emissions(observations: &Array1<f64>, emissions: &[Gaussian]) -> Array2<f64> {
    let t = observations.len();
    let n = emissions.len();
    let mut log_emit = Array2::zeros((t, n));
    for (t_idx, &x) in observations.iter().enumerate() {
        for (j, emission) in emissions.iter().enumerate() {
            log_emit[[t_idx, j]] = emission.log_pdf(x);
        }
    }
    log_emit
}

/// Forward pass; returns log alpha (T x N) and the sequence log-likelihood.
pub fn forward(
    log_start: &Array1<f64>,
    log_trans: &Array2<f64>,
    log_emit: &Array2<f64>,
) -> (Array2<f64>, f64) {
    let (t, n) = log_emit.dim();
    let mut log_alpha = Array2::from_elem((t, n), f64::NEG_INFINITY);
    if t == 0 {
        return (log_alpha, 0.0);
    }

    for j in 0..n {
        log_alpha[[0, j]] = log_start[j] + log_emit[[0, j]];
    }

    for t_idx in 1..t {
        for j in 0..n {
            let incoming = logsumexp((0..n).map(|i| log_alpha[[t_idx - 1, i]] + log_trans[[i, j]]));
            log_alpha[[t_idx, j]] = incoming + log_emit[[t_idx, j]];
        }
    }

    let log_likelihood = logsumexp((0..n).map(|j| log_alpha[[t - 1, j]]));
    (log_alpha, log_likelihood)
}

/// Backward pass; returns log beta (T x N).
pub fn backward(log_trans: &Array2<f64>, log_emit: &Array2<f64>) -> Array2<f64> {
    let (t, n) = log_emit.dim();
    let mut log_beta = Array2::zeros((t, n));
    if t == 0 {
        return log_beta;
    }

    for t_idx in (0..t - 1).rev() {
        for i in 0..n {
            log_beta[[t_idx, i]] = logsumexp(
                (0..n).map(|j| log_trans[[i, j]] + log_emit[[t_idx + 1, j]] + log_beta[[t_idx + 1, j]]),
            );
        }
    }

    log_beta
}

/// State posteriors (T x N) from forward and backward passes
pub fn posteriors(log_alpha: &Array2<f64>, log_beta: &Array2<f64>, log_likelihood: f64) -> Array2<f64> {
    let (t, n) = log_alpha.dim();
    let mut gamma = Array2::zeros((t, n));
    for t_idx in 0..t {
        let log_norm = logsumexp((0..n).map(|j| log_alpha[[t_idx, j]] + log_beta[[t_idx, j]]));
        let log_norm = if log_norm.is_finite() { log_norm } else { log_likelihood };
        for j in 0..n {
            gamma[[t_idx, j]] = (log_alpha[[t_idx, j]] + log_beta[[t_idx, j]] - log_norm).exp();
        }
    }
    gamma
}

/// Viterbi: most likely state path and its log probability
pub fn viterbi(
    log_start: &Array1<f64>,
    log_trans: &Array2<f64>,
    log_emit: &Array2<f64>,
) -> (Vec<usize>, f64) {
    let (t, n) = log_emit.dim();
    if t == 0 {
        return (vec![], 0.0);
    }

    // Delta: best path log probability ending in state j at time t
    let mut delta = Array2::from_elem((t, n), f64::NEG_INFINITY);
    // Psi: backpointers for path reconstruction
    let mut psi = Array2::<usize>::zeros((t, n));

    for j in 0..n {
        delta[[0, j]] = log_start[j] + log_emit[[0, j]];
    }

    for t_idx in 1..t {
        for j in 0..n {
            let mut best_val = f64::NEG_INFINITY;
            let mut best_state = 0;
            for i in 0..n {
                let val = delta[[t_idx - 1, i]] + log_trans[[i, j]];
                if val > best_val {
                    best_val = val;
                    best_state = i;
                }
            }
            delta[[t_idx, j]] = best_val + log_emit[[t_idx, j]];
            psi[[t_idx, j]] = best_state;
        }
    }

    let mut best_final_state = 0;
    let mut best_final_prob = f64::NEG_INFINITY;
    for j in 0..n {
        if delta[[t - 1, j]] > best_final_prob {
            best_final_prob = delta[[t - 1, j]];
            best_final_state = j;
        }
    }

    let mut path = vec![0; t];
    path[t - 1] = best_final_state;
    for t_idx in (0..t - 1).rev() {
        path[t_idx] = psi[[t_idx + 1, path[t_idx + 1]]];
    }

    (path, best_final_prob)
}

/// One EM iteration. Returns the re-estimated parameters and the
/// log-likelihood of `observations` under the *incoming* parameters.
pub fn baum_welch_step(observations: &Array1<f64>, params: &HmmParams, covars_prior: f64) -> (HmmParams, f64) {
    let n = params.n_states();
    let t = observations.len();

    let log_start = params.start.mapv(f64::ln);
    let log_trans = params.transitions.mapv(f64::ln);
    let log_emit = log_emissions(observations, &params.emissions);

    // E-step
    let (log_alpha, log_likelihood) = forward(&log_start, &log_trans, &log_emit);
    let log_beta = backward(&log_trans, &log_emit);
    let gamma = posteriors(&log_alpha, &log_beta, log_likelihood);

    let mut xi_sum = Array2::<f64>::zeros((n, n));
    for t_idx in 0..t.saturating_sub(1) {
        for i in 0..n {
            for j in 0..n {
                let log_xi = log_alpha[[t_idx, i]] + log_trans[[i, j]] + log_emit[[t_idx + 1, j]]
                    + log_beta[[t_idx + 1, j]]
                    - log_likelihood;
                xi_sum[[i, j]] += log_xi.exp();
            }
        }
    }

    // M-step
    let mut start = gamma.row(0).to_owned();
    let start_sum = start.sum();
    if start_sum > 0.0 {
        start /= start_sum;
    } else {
        start = params.start.clone();
    }

    let mut transitions = params.transitions.clone();
    for i in 0..n {
        let row_sum: f64 = xi_sum.row(i).sum();
        // rows of states never left keep their previous estimate
        if row_sum > 0.0 {
            for j in 0..n {
                transitions[[i, j]] = xi_sum[[i, j]] / row_sum;
            }
        }
    }

    let mut emissions = params.emissions.clone();
    for (j, emission) in emissions.iter_mut().enumerate() {
        let weights = gamma.column(j);
        let post: f64 = weights.sum();
        if post <= 0.0 {
            continue;
        }
        let mean = weights.iter().zip(observations.iter()).map(|(w, x)| w * x).sum::<f64>() / post;
        let spread = weights
            .iter()
            .zip(observations.iter())
            .map(|(w, x)| w * (x - mean).powi(2))
            .sum::<f64>();
        *emission = Gaussian::new(mean, (covars_prior + spread) / post);
    }

    (
        HmmParams {
            start,
            transitions,
            emissions,
        },
        log_likelihood,
    )
}
