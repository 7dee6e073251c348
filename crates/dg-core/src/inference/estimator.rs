//! Per-class parameter estimation.
//!
//! For every label present in the training table:
//! - prior = rows with the label / total rows
//! - mean = element-wise mean of the label's samples
//! - covariance = unbiased sample covariance (divisor `n - 1`)
//!
//! The covariance is kept in decomposed form: only the eigenpairs above the
//! support cutoff are stored, which is all the likelihood and the sampler
//! need. A class with fewer than two rows gets an empty support (a rank-0,
//! fully singular covariance) rather than an error.

use dg_common::{Error, Label, LabelTable, Result, Sample, TrainingTable, SAMPLE_LEN};
use dg_math::{DegenerateGaussian, Spectrum};
use nalgebra::{DMatrix, DVector};

use super::computation_error;

/// Fitted parameters of one class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassStatistics {
    pub label: Label,
    /// Number of training rows carrying this label.
    pub count: usize,
    pub prior: f64,
    pub log_prior: f64,
    density: DegenerateGaussian,
}

impl ClassStatistics {
    pub fn mean(&self) -> &DVector<f64> {
        self.density.mean()
    }

    /// Dense 784×784 covariance rebuilt from the stored support.
    pub fn covariance(&self) -> DMatrix<f64> {
        self.density.covariance()
    }

    pub fn density(&self) -> &DegenerateGaussian {
        &self.density
    }

    /// Dimension of the covariance support.
    pub fn rank(&self) -> usize {
        self.density.rank()
    }

    /// Fewer than two rows: the covariance carries no information.
    pub fn is_degenerate(&self) -> bool {
        self.count < 2
    }
}

/// Estimate prior, mean and covariance for every label observed in `table`.
///
/// `rcond` is the relative eigenvalue cutoff for the covariance support.
pub fn estimate(table: &TrainingTable, rcond: f64) -> Result<LabelTable<ClassStatistics>> {
    if table.is_empty() {
        return Err(Error::EmptyTrainingTable);
    }
    let total = table.len() as f64;

    let mut stats = LabelTable::new();
    for label in table.labels() {
        let rows: Vec<&Sample> = table.rows_with(label).collect();
        let class = estimate_class(label, &rows, total, rcond)?;
        stats.insert(label, class);
    }
    Ok(stats)
}

fn estimate_class(
    label: Label,
    rows: &[&Sample],
    total: f64,
    rcond: f64,
) -> Result<ClassStatistics> {
    let n = rows.len();
    let (mean, centered) = center(rows);

    let spectrum = if n < 2 {
        Spectrum::zeros(SAMPLE_LEN)
    } else {
        Spectrum::of_scatter(&centered, (n - 1) as f64, rcond)
            .map_err(|e| computation_error("class covariance", e))?
    };
    let density = DegenerateGaussian::from_spectrum(mean, &spectrum, rcond)
        .map_err(|e| computation_error("class density", e))?;

    let prior = n as f64 / total;
    Ok(ClassStatistics {
        label,
        count: n,
        prior,
        log_prior: prior.ln(),
        density,
    })
}

/// Column means and the mean-centered `n × 784` data matrix.
pub(crate) fn center(rows: &[&Sample]) -> (DVector<f64>, DMatrix<f64>) {
    let n = rows.len();
    let mut data = DMatrix::from_fn(n, SAMPLE_LEN, |i, j| f64::from(rows[i].pixels()[j]));
    let mut mean = DVector::zeros(SAMPLE_LEN);
    if n == 0 {
        return (mean, data);
    }
    for j in 0..SAMPLE_LEN {
        mean[j] = data.column(j).sum() / n as f64;
    }
    for i in 0..n {
        for j in 0..SAMPLE_LEN {
            data[(i, j)] -= mean[j];
        }
    }
    (mean, data)
}
