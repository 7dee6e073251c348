//! Normalization of log-weights into probability vectors.
//!
//! Both functions shift by the maximum before exponentiating, so inputs
//! thousands of nats below zero (typical for high-dimensional Gaussian
//! log-densities) normalize without underflowing to 0/0. Adding the same
//! constant to every input leaves the output unchanged.
//!
//! Degenerate inputs:
//! - all entries `-inf`: every entry ties, the result is uniform
//! - some entries `+inf`: the `+inf` entries share the mass uniformly
//! - any `NaN`: every output is `NaN` (callers treat this as a failure)

use super::stable::{log_sum_exp, max_value};

/// Normalize log-weights in log space: `out[i] = v[i] - logsumexp(v)`.
pub fn normalize_log_probs(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let lse = log_sum_exp(values);
    if lse.is_nan() {
        return vec![f64::NAN; values.len()];
    }
    if lse.is_infinite() {
        return normalize_exp(values).into_iter().map(f64::ln).collect();
    }
    values.iter().map(|v| v - lse).collect()
}

/// Convert log-weights into probabilities that sum to 1.
///
/// The largest entry exponentiates to exactly 1 after the shift, so the
/// normalizing sum is always at least 1.
pub fn normalize_exp(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    if values.iter().any(|v| v.is_nan()) {
        return vec![f64::NAN; values.len()];
    }
    let max = max_value(values);
    let weights: Vec<f64> = if max == f64::NEG_INFINITY {
        vec![1.0; values.len()]
    } else if max == f64::INFINITY {
        values
            .iter()
            .map(|&v| if v == f64::INFINITY { 1.0 } else { 0.0 })
            .collect()
    } else {
        values.iter().map(|v| (v - max).exp()).collect()
    };
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(values: &[f64]) -> f64 {
        values.iter().sum()
    }

    #[test]
    fn normalize_exp_matches_direct_softmax() {
        let out = normalize_exp(&[1.0, 2.0, 3.0]);
        let denom = 1f64.exp() + 2f64.exp() + 3f64.exp();
        assert!((out[0] - 1f64.exp() / denom).abs() < 1e-12);
        assert!((out[2] - 3f64.exp() / denom).abs() < 1e-12);
        assert!((sum(&out) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normalize_exp_survives_extreme_negative_values() {
        let out = normalize_exp(&[-50_000.0, -50_010.0, -49_990.0]);
        assert!((sum(&out) - 1.0).abs() < 1e-12);
        assert!(out[2] > out[0] && out[0] > out[1]);
    }

    #[test]
    fn normalize_exp_all_tied_is_uniform() {
        let out = normalize_exp(&[-7.5; 4]);
        for p in out {
            assert!((p - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn normalize_exp_all_neg_inf_is_uniform() {
        let out = normalize_exp(&[f64::NEG_INFINITY; 5]);
        for p in out {
            assert!((p - 0.2).abs() < 1e-12);
        }
    }

    #[test]
    fn normalize_exp_positive_infinity_takes_all_mass() {
        let out = normalize_exp(&[0.0, f64::INFINITY, 3.0, f64::INFINITY]);
        assert_eq!(out, vec![0.0, 0.5, 0.0, 0.5]);
    }

    #[test]
    fn normalize_exp_nan_poisons_output() {
        let out = normalize_exp(&[0.0, f64::NAN]);
        assert!(out.iter().all(|p| p.is_nan()));
    }

    #[test]
    fn normalize_log_probs_exponentiates_to_one() {
        let out = normalize_log_probs(&[-3.0, -1.0, -2.0]);
        let total: f64 = out.iter().map(|v| v.exp()).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(out.iter().all(|v| *v <= 0.0));
    }

    #[test]
    fn normalize_log_probs_all_neg_inf() {
        let out = normalize_log_probs(&[f64::NEG_INFINITY; 2]);
        for v in out {
            assert!((v - 0.5f64.ln()).abs() < 1e-12);
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(normalize_exp(&[]).is_empty());
        assert!(normalize_log_probs(&[]).is_empty());
    }
}
