//! Full-covariance Gaussian mixture fitted by expectation-maximization.
//!
//! Initialization follows the usual recipe: k-means++ seeding, a few Lloyd
//! iterations, then one M-step on the hard assignments. Each EM iteration
//! runs an E-step (responsibilities via log-sum-exp) and an M-step (weights,
//! means, covariances with `reg_covar` on the diagonal). Fitting stops when
//! the mean per-point log-likelihood changes by less than `tolerance`.
//! `n_init` independent runs are made with seeds `seed, seed + 1, ...` and
//! the run with the highest final log-likelihood is kept.

use dg_common::{Error, Result};
use dg_config::MixtureConfig;
use dg_math::{log_sum_exp, FullGaussian};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::inference::computation_error;

/// Lloyd iterations run on the k-means++ seeds before EM starts.
const KMEANS_ITERATIONS: usize = 20;

/// One weighted Gaussian of the mixture.
#[derive(Debug, Clone)]
pub struct MixtureComponent {
    pub weight: f64,
    pub gaussian: FullGaussian,
}

#[derive(Debug, Clone)]
pub struct GaussianMixture {
    components: Vec<MixtureComponent>,
    /// Mean per-point log-likelihood of the training rows.
    log_likelihood: f64,
    iterations: usize,
    converged: bool,
}

impl GaussianMixture {
    /// Fit `k` components to the rows of `data`.
    pub fn fit(data: &DMatrix<f64>, k: usize, config: &MixtureConfig) -> Result<Self> {
        let (n, dim) = data.shape();
        if k == 0 {
            return Err(Error::InvalidParameter {
                name: "components",
                message: "must be at least 1".to_string(),
            });
        }
        if n < k {
            return Err(Error::InvalidParameter {
                name: "components",
                message: format!("{k} components need at least {k} rows, got {n}"),
            });
        }
        if dim == 0 {
            return Err(Error::InvalidParameter {
                name: "data",
                message: "rows have no dimensions to fit".to_string(),
            });
        }

        let mut best: Option<GaussianMixture> = None;
        for run in 0..config.n_init.max(1) {
            let seed = config.seed.wrapping_add(run as u64);
            let candidate = Self::fit_once(data, k, config, seed)?;
            let better = best
                .as_ref()
                .is_none_or(|b| candidate.log_likelihood > b.log_likelihood);
            if better {
                best = Some(candidate);
            }
        }
        best.ok_or_else(|| Error::InternalComputation("mixture fit produced no run".to_string()))
    }

    fn fit_once(data: &DMatrix<f64>, k: usize, config: &MixtureConfig, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let assignments = kmeans(data, k, &mut rng);

        let mut resp = DMatrix::zeros(data.nrows(), k);
        for (i, &c) in assignments.iter().enumerate() {
            resp[(i, c)] = 1.0;
        }
        let mut components = m_step(data, &resp, config.reg_covar)?;

        let mut lower_bound = f64::NEG_INFINITY;
        let mut iterations = 0;
        let mut converged = false;
        for iter in 1..=config.max_iterations {
            iterations = iter;
            let prev = lower_bound;
            let (mean_ll, resp) = e_step(&components, data)?;
            components = m_step(data, &resp, config.reg_covar)?;
            lower_bound = mean_ll;
            if (lower_bound - prev).abs() < config.tolerance {
                converged = true;
                break;
            }
        }

        let mut fitted = Self {
            components,
            log_likelihood: f64::NEG_INFINITY,
            iterations,
            converged,
        };
        fitted.log_likelihood = fitted.score(data)?;
        Ok(fitted)
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    pub fn dim(&self) -> usize {
        self.components.first().map_or(0, |c| c.gaussian.dim())
    }

    pub fn components(&self) -> &[MixtureComponent] {
        &self.components
    }

    pub fn weights(&self) -> Vec<f64> {
        self.components.iter().map(|c| c.weight).collect()
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// `ln w_k + ln N(x; μ_k, Σ_k)` for every component.
    pub fn log_joint(&self, x: &DVector<f64>) -> Result<Vec<f64>> {
        log_joint(&self.components, x)
    }

    /// Component membership probabilities for `x`.
    pub fn predict_proba(&self, x: &DVector<f64>) -> Result<Vec<f64>> {
        let joint = self.log_joint(x)?;
        let probs = dg_math::normalize_exp(&joint);
        if probs.iter().any(|p| !p.is_finite()) {
            return Err(Error::InternalComputation(
                "component responsibilities are not finite".to_string(),
            ));
        }
        Ok(probs)
    }

    /// Most probable component; the lowest index wins ties.
    pub fn predict(&self, x: &DVector<f64>) -> Result<usize> {
        let joint = self.log_joint(x)?;
        let mut best = 0;
        for (k, &v) in joint.iter().enumerate().skip(1) {
            if v > joint[best] {
                best = k;
            }
        }
        Ok(best)
    }

    /// Most probable component for every row.
    pub fn predict_rows(&self, data: &DMatrix<f64>) -> Result<Vec<usize>> {
        (0..data.nrows())
            .map(|i| self.predict(&data.row(i).transpose()))
            .collect()
    }

    /// Mean per-row log-likelihood.
    pub fn score(&self, data: &DMatrix<f64>) -> Result<f64> {
        let mut total = 0.0;
        for i in 0..data.nrows() {
            total += log_sum_exp(&self.log_joint(&data.row(i).transpose())?);
        }
        Ok(total / data.nrows().max(1) as f64)
    }

    /// Pick a component by weight and draw from it.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let u: f64 = rng.random();
        let mut cumulative = 0.0;
        let mut chosen = self.components.len().saturating_sub(1);
        for (k, c) in self.components.iter().enumerate() {
            cumulative += c.weight;
            if u < cumulative {
                chosen = k;
                break;
            }
        }
        self.components[chosen].gaussian.sample(rng)
    }
}

fn log_joint(components: &[MixtureComponent], x: &DVector<f64>) -> Result<Vec<f64>> {
    components
        .iter()
        .map(|c| {
            let log_pdf = c
                .gaussian
                .log_pdf(x)
                .map_err(|e| computation_error("mixture density", e))?;
            Ok(c.weight.ln() + log_pdf)
        })
        .collect()
}

/// Responsibilities and mean per-row log-likelihood.
fn e_step(components: &[MixtureComponent], data: &DMatrix<f64>) -> Result<(f64, DMatrix<f64>)> {
    let n = data.nrows();
    let mut resp = DMatrix::zeros(n, components.len());
    let mut total = 0.0;
    for i in 0..n {
        let joint = log_joint(components, &data.row(i).transpose())?;
        let norm = log_sum_exp(&joint);
        if !norm.is_finite() {
            return Err(Error::InternalComputation(format!(
                "row {i} has no finite mixture likelihood"
            )));
        }
        total += norm;
        for (k, lj) in joint.iter().enumerate() {
            resp[(i, k)] = (lj - norm).exp();
        }
    }
    Ok((total / n as f64, resp))
}

/// Weights, means and regularized covariances from responsibilities.
fn m_step(data: &DMatrix<f64>, resp: &DMatrix<f64>, reg_covar: f64) -> Result<Vec<MixtureComponent>> {
    let (n, dim) = data.shape();
    let k = resp.ncols();

    // Keeps empty components from dividing by zero.
    let nk: Vec<f64> = (0..k)
        .map(|j| resp.column(j).sum() + 10.0 * f64::EPSILON)
        .collect();
    let total: f64 = nk.iter().sum();

    let mut components = Vec::with_capacity(k);
    for j in 0..k {
        let mut mean = DVector::zeros(dim);
        for i in 0..n {
            mean.axpy(resp[(i, j)], &data.row(i).transpose(), 1.0);
        }
        mean /= nk[j];

        let mut cov = DMatrix::zeros(dim, dim);
        for i in 0..n {
            let diff = data.row(i).transpose() - &mean;
            cov.ger(resp[(i, j)], &diff, &diff, 1.0);
        }
        cov /= nk[j];
        for d in 0..dim {
            cov[(d, d)] += reg_covar;
        }

        let gaussian =
            FullGaussian::new(mean, cov).map_err(|e| computation_error("mixture covariance", e))?;
        components.push(MixtureComponent {
            weight: nk[j] / total,
            gaussian,
        });
    }
    Ok(components)
}

/// k-means++ seeding followed by Lloyd iterations; returns hard assignments.
fn kmeans<R: Rng + ?Sized>(data: &DMatrix<f64>, k: usize, rng: &mut R) -> Vec<usize> {
    let n = data.nrows();
    let rows: Vec<DVector<f64>> = (0..n).map(|i| data.row(i).transpose()).collect();

    let mut centers = Vec::with_capacity(k);
    centers.push(rows[rng.random_range(0..n)].clone());
    while centers.len() < k {
        let distances: Vec<f64> = rows
            .iter()
            .map(|p| nearest(&centers, p).1)
            .collect();
        let total: f64 = distances.iter().sum();
        let next = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut cumulative = 0.0;
            let mut pick = n - 1;
            for (i, d) in distances.iter().enumerate() {
                cumulative += d;
                if cumulative > target {
                    pick = i;
                    break;
                }
            }
            pick
        } else {
            rng.random_range(0..n)
        };
        centers.push(rows[next].clone());
    }

    let mut assignments: Vec<usize> = rows.iter().map(|p| nearest(&centers, p).0).collect();
    for _ in 0..KMEANS_ITERATIONS {
        let dim = data.ncols();
        let mut sums = vec![DVector::zeros(dim); k];
        let mut counts = vec![0usize; k];
        for (p, &c) in rows.iter().zip(&assignments) {
            sums[c] += p;
            counts[c] += 1;
        }
        for c in 0..k {
            // Empty clusters keep their previous center.
            if counts[c] > 0 {
                centers[c] = &sums[c] / counts[c] as f64;
            }
        }

        let next: Vec<usize> = rows.iter().map(|p| nearest(&centers, p).0).collect();
        if next == assignments {
            break;
        }
        assignments = next;
    }
    assignments
}

/// Index of the closest center (lowest index on ties) and its squared distance.
fn nearest(centers: &[DVector<f64>], p: &DVector<f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, center) in centers.iter().enumerate() {
        let d = (p - center).norm_squared();
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_distr::{Distribution, StandardNormal};

    fn blobs(centers: &[(f64, f64)], per: usize, seed: u64) -> DMatrix<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut values = Vec::new();
        for &(cx, cy) in centers {
            for _ in 0..per {
                let dx: f64 = StandardNormal.sample(&mut rng);
                let dy: f64 = StandardNormal.sample(&mut rng);
                values.push(cx + 0.3 * dx);
                values.push(cy + 0.3 * dy);
            }
        }
        DMatrix::from_row_slice(centers.len() * per, 2, &values)
    }

    #[test]
    fn test_separated_blobs_get_distinct_components() {
        let data = blobs(&[(0.0, 0.0), (10.0, 10.0), (-10.0, 10.0)], 40, 1);
        let gmm = GaussianMixture::fit(&data, 3, &MixtureConfig::default()).unwrap();
        assert_eq!(gmm.n_components(), 3);
        assert_eq!(gmm.dim(), 2);

        let labels = gmm.predict_rows(&data).unwrap();
        for blob in 0..3 {
            let first = labels[blob * 40];
            assert!(labels[blob * 40..(blob + 1) * 40].iter().all(|&l| l == first));
        }
        let mut distinct = vec![labels[0], labels[40], labels[80]];
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 3);

        let weight_sum: f64 = gmm.weights().iter().sum();
        assert!((weight_sum - 1.0).abs() < 1e-9);
        for w in gmm.weights() {
            assert!((w - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_predict_proba_sums_to_one() {
        let data = blobs(&[(0.0, 0.0), (6.0, 0.0)], 30, 2);
        let gmm = GaussianMixture::fit(&data, 2, &MixtureConfig::default()).unwrap();
        let p = gmm
            .predict_proba(&DVector::from_column_slice(&[3.0, 0.0]))
            .unwrap();
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_is_seed_deterministic() {
        let data = blobs(&[(0.0, 0.0), (5.0, 5.0)], 25, 3);
        let config = MixtureConfig::default();
        let a = GaussianMixture::fit(&data, 2, &config).unwrap();
        let b = GaussianMixture::fit(&data, 2, &config).unwrap();
        assert_eq!(a.predict_rows(&data).unwrap(), b.predict_rows(&data).unwrap());
        assert_eq!(a.log_likelihood(), b.log_likelihood());
    }

    #[test]
    fn test_identical_points_stay_positive_definite() {
        let data = DMatrix::from_element(6, 2, 1.5);
        let gmm = GaussianMixture::fit(&data, 2, &MixtureConfig::default()).unwrap();
        assert!(gmm.log_likelihood().is_finite());
        let mut rng = StdRng::seed_from_u64(9);
        let draw = gmm.sample(&mut rng);
        assert_eq!(draw.len(), 2);
    }

    #[test]
    fn test_more_components_than_rows_rejected() {
        let data = blobs(&[(0.0, 0.0)], 3, 4);
        let err = GaussianMixture::fit(&data, 4, &MixtureConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "components", .. }));
    }
}
