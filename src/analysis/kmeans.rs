//! Seeded k-means over 1-D observations
//!
//! Used to seed the HMM emission means and variances. Every restart draws
//! from a single `StdRng` seeded by the caller, so the same input and seed
//! always give the same clustering.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::{RegimeError, RegimeResult};

#[derive(Debug, Clone)]
pub struct KMeans {
    pub n_clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    /// Relative to the data variance, as a bound on the summed squared center shift
    pub tol: f64,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub centers: Vec<f64>,
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub n_iter: usize,
}

impl KMeans {
    pub fn new(n_clusters: usize, seed: u64) -> Self {
        Self {
            n_clusters,
            n_init: 50,
            max_iter: 300,
            tol: 1e-4,
            seed,
        }
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn fit(&self, data: &[f64]) -> RegimeResult<KMeansFit> {
        let k = self.n_clusters;
        if k == 0 {
            return Err(RegimeError::InvalidParameter(
                "n_clusters".to_string(),
                "must be greater than 0".to_string(),
            ));
        }
        if data.len() < k {
            return Err(RegimeError::InsufficientData(format!(
                "k-means needs at least {} observations, got {}",
                k,
                data.len()
            )));
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let tol = self.tol * variance;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;

        for _ in 0..self.n_init {
            let initial = kmeans_plus_plus(data, k, &mut rng);
            let candidate = lloyd(data, initial, self.max_iter, tol);
            // strict comparison keeps the earliest restart on ties
            if best.as_ref().map_or(true, |b| candidate.inertia < b.inertia) {
                best = Some(candidate);
            }
        }

        let best = best.ok_or_else(|| RegimeError::Internal("k-means ran no restarts".to_string()))?;
        debug!(
            "k-means: {} restarts, best inertia {:.4} after {} iterations",
            self.n_init, best.inertia, best.n_iter
        );
        Ok(best)
    }
}

impl KMeansFit {
    /// Sample variance (ddof = 1) of each cluster's members plus `epsilon`.
    /// Clusters with fewer than two members count as zero variance.
    pub fn cluster_variances(&self, data: &[f64], epsilon: f64) -> Vec<f64> {
        (0..self.centers.len())
            .map(|cluster| {
                let members: Vec<f64> = data
                    .iter()
                    .zip(&self.labels)
                    .filter(|&(_, &label)| label == cluster)
                    .map(|(&x, _)| x)
                    .collect();

                let variance = if members.len() < 2 {
                    0.0
                } else {
                    let m = members.iter().sum::<f64>() / members.len() as f64;
                    members.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (members.len() - 1) as f64
                };
                variance + epsilon
            })
            .collect()
    }
}

fn kmeans_plus_plus(data: &[f64], k: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut centers = Vec::with_capacity(k);
    centers.push(data[rng.gen_range(0..data.len())]);

    while centers.len() < k {
        let distances: Vec<f64> = data
            .iter()
            .map(|&x| {
                centers
                    .iter()
                    .map(|&c| (x - c).powi(2))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = distances.iter().sum();

        let next = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut chosen = data.len() - 1;
            for (i, d) in distances.iter().enumerate() {
                cumulative += d;
                if cumulative > target {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // every point already sits on a center
            rng.gen_range(0..data.len())
        };
        centers.push(data[next]);
    }

    centers
}

fn nearest(x: f64, centers: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, &c) in centers.iter().enumerate() {
        let d = (x - c).powi(2);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn assign(data: &[f64], centers: &[f64]) -> (Vec<usize>, f64) {
    let mut labels = Vec::with_capacity(data.len());
    let mut inertia = 0.0;
    for &x in data {
        let (label, d) = nearest(x, centers);
        labels.push(label);
        inertia += d;
    }
    (labels, inertia)
}

fn lloyd(data: &[f64], mut centers: Vec<f64>, max_iter: usize, tol: f64) -> KMeansFit {
    let k = centers.len();
    let mut n_iter = 0;

    for _ in 0..max_iter {
        n_iter += 1;
        let (labels, _) = assign(data, &centers);

        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for (&x, &label) in data.iter().zip(&labels) {
            sums[label] += x;
            counts[label] += 1;
        }

        let mut shift = 0.0;
        for j in 0..k {
            // empty clusters keep their previous center
            if counts[j] > 0 {
                let updated = sums[j] / counts[j] as f64;
                shift += (updated - centers[j]).powi(2);
                centers[j] = updated;
            }
        }

        if shift <= tol {
            break;
        }
    }

    let (labels, inertia) = assign(data, &centers);
    KMeansFit {
        centers,
        labels,
        inertia,
        n_iter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_blobs() -> Vec<f64> {
        let mut data = Vec::new();
        for i in 0..30 {
            let jitter = (i as f64 * 0.37).sin() * 0.1;
            data.push(-5.0 + jitter);
            data.push(0.0 + jitter);
            data.push(5.0 + jitter);
        }
        data
    }

    #[test]
    fn test_finds_separated_clusters() {
        let data = three_blobs();
        let fit = KMeans::new(3, 42).with_n_init(10).fit(&data).unwrap();

        let mut centers = fit.centers.clone();
        centers.sort_by(|a, b| a.total_cmp(b));
        assert!((centers[0] + 5.0).abs() < 0.2);
        assert!(centers[1].abs() < 0.2);
        assert!((centers[2] - 5.0).abs() < 0.2);
        assert_eq!(fit.labels.len(), data.len());
    }

    #[test]
    fn test_same_seed_same_result() {
        let data: Vec<f64> = (0..200).map(|i| ((i * 7919) % 101) as f64 / 10.0).collect();
        let a = KMeans::new(3, 42).fit(&data).unwrap();
        let b = KMeans::new(3, 42).fit(&data).unwrap();
        assert_eq!(a.centers, b.centers);
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn test_too_few_points() {
        let err = KMeans::new(3, 42).fit(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, RegimeError::InsufficientData(_)));
    }

    #[test]
    fn test_duplicate_points_do_not_panic() {
        let data = vec![1.0, 1.0, 1.0, 1.0, 2.0];
        let fit = KMeans::new(3, 7).with_n_init(10).fit(&data).unwrap();
        assert_eq!(fit.centers.len(), 3);
        assert!(fit.inertia.abs() < 1e-12);
    }

    #[test]
    fn test_cluster_variances_regularized() {
        let data = vec![0.0, 0.0, 10.0, 11.0, 20.0];
        let fit = KMeansFit {
            centers: vec![0.0, 10.5, 20.0],
            labels: vec![0, 0, 1, 1, 2],
            inertia: 0.5,
            n_iter: 1,
        };

        let variances = fit.cluster_variances(&data, 1e-5);
        assert!((variances[0] - 1e-5).abs() < 1e-15); // zero spread
        assert!((variances[1] - (0.5 + 1e-5)).abs() < 1e-12);
        assert!((variances[2] - 1e-5).abs() < 1e-15); // single member
        assert!(variances.iter().all(|v| *v > 0.0));
    }
}
