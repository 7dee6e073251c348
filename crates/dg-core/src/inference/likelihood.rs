//! Log-density of a sample under a class Gaussian.
//!
//! Densities are evaluated on the support subspace of the class covariance
//! (pseudo-inverse and pseudo-determinant), so singular covariances produce
//! a value instead of a division by zero. A sample off the support of a class
//! scores `-inf` for that class. Everything stays in log space; raw
//! 784-dimensional densities underflow.

use dg_common::{Error, Label, LabelTable, Result, Sample};
use dg_math::mvn_log_pdf;
use nalgebra::DMatrix;

use super::computation_error;
use super::estimator::ClassStatistics;

/// Natural-log density of `sample` under an explicit mean and covariance.
pub fn log_density(
    sample: &Sample,
    mean: &[f64],
    covariance: &DMatrix<f64>,
    rcond: f64,
) -> Result<f64> {
    let value = mvn_log_pdf(&sample.to_f64(), mean, covariance, rcond)
        .map_err(|e| computation_error("log density", e))?;
    finite(value, "log density")
}

/// Natural-log density of `sample` under a fitted class.
pub fn log_likelihood(stats: &ClassStatistics, sample: &Sample) -> Result<f64> {
    let value = stats
        .density()
        .log_pdf(&sample.to_f64())
        .map_err(|e| computation_error("log likelihood", e))?;
    finite(value, "log likelihood")
}

/// Log-likelihood of `sample` under every fitted class.
pub fn log_likelihoods(
    stats: &LabelTable<ClassStatistics>,
    sample: &Sample,
) -> Result<LabelTable<f64>> {
    let mut out = LabelTable::new();
    for (label, class) in stats.iter() {
        out.insert(label, log_likelihood(class, sample)?);
    }
    Ok(out)
}

fn finite(value: f64, what: &str) -> Result<f64> {
    if value.is_nan() {
        return Err(Error::InternalComputation(format!("{what} is NaN")));
    }
    Ok(value)
}

/// Labels whose class density is evaluated on an empty support.
pub fn rank_zero_labels(stats: &LabelTable<ClassStatistics>) -> Vec<Label> {
    stats
        .iter()
        .filter(|(_, class)| class.rank() == 0)
        .map(|(label, _)| label)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::estimate;
    use dg_common::{TrainingTable, SAMPLE_LEN};
    use dg_math::DEFAULT_RCOND;

    fn sample_with(index: usize, value: i64) -> Sample {
        let mut values = vec![0; SAMPLE_LEN];
        values[index] = value;
        Sample::from_values(&values).unwrap()
    }

    fn one_pixel_class() -> LabelTable<ClassStatistics> {
        // Pixel 0 in {0, 2, 4}: mean 2, variance 4.
        let mut table = TrainingTable::new();
        for v in [0, 2, 4] {
            table.push(sample_with(0, v), Label::new(5).unwrap());
        }
        estimate(&table, DEFAULT_RCOND).unwrap()
    }

    #[test]
    fn test_matches_univariate_normal_on_support() {
        let stats = one_pixel_class();
        let class = stats.get(Label::new(5).unwrap()).unwrap();
        let x = sample_with(0, 6);
        let got = log_likelihood(class, &x).unwrap();
        // N(6; 2, 4): -0.5 * (ln 2π + ln 4 + 16/4)
        let expected = -0.5 * ((2.0 * std::f64::consts::PI).ln() + 4f64.ln() + 4.0);
        assert!((got - expected).abs() < 1e-9, "got {got}, expected {expected}");
    }

    #[test]
    fn test_off_support_sample_scores_negative_infinity() {
        let stats = one_pixel_class();
        let class = stats.get(Label::new(5).unwrap()).unwrap();
        assert!(log_likelihood(class, &sample_with(0, 2)).unwrap().is_finite());
        let mut values = vec![0; SAMPLE_LEN];
        values[0] = 2;
        values[100] = 255;
        let off = log_likelihood(class, &Sample::from_values(&values).unwrap()).unwrap();
        assert_eq!(off, f64::NEG_INFINITY);
    }

    #[test]
    fn test_single_row_class_only_matches_its_row() {
        let mut table = TrainingTable::new();
        table.push(sample_with(3, 200), Label::new(1).unwrap());
        let stats = estimate(&table, DEFAULT_RCOND).unwrap();
        let class = stats.get(Label::new(1).unwrap()).unwrap();
        assert_eq!(rank_zero_labels(&stats), vec![Label::new(1).unwrap()]);
        assert_eq!(log_likelihood(class, &sample_with(3, 200)).unwrap(), 0.0);
        assert_eq!(
            log_likelihood(class, &sample_with(3, 199)).unwrap(),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn test_explicit_covariance_agrees_with_class_density() {
        let stats = one_pixel_class();
        let class = stats.get(Label::new(5).unwrap()).unwrap();
        let x = sample_with(0, 3);
        let mean: Vec<f64> = class.mean().iter().copied().collect();
        let a = log_density(&x, &mean, &class.covariance(), DEFAULT_RCOND).unwrap();
        let b = log_likelihood(class, &x).unwrap();
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_log_likelihoods_cover_fitted_labels() {
        let stats = one_pixel_class();
        let scores = log_likelihoods(&stats, &Sample::zeros()).unwrap();
        assert_eq!(scores.labels(), vec![Label::new(5).unwrap()]);
        assert!(rank_zero_labels(&stats).is_empty());
    }
}
