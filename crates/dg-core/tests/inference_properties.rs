//! Property-based tests for posterior, decision and rescaling invariants.

use std::sync::OnceLock;

use dg_common::{Label, Sample, TrainingTable, SAMPLE_LEN};
use dg_config::EngineConfig;
use dg_core::decision::decide;
use dg_core::generate::rescale;
use dg_core::inference::{normalize_evidence, ClassEvidence};
use dg_core::Engine;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn evidence_strategy() -> impl Strategy<Value = Vec<ClassEvidence>> {
    prop::sample::subsequence((0i64..10).collect::<Vec<_>>(), 1..=10).prop_flat_map(|labels| {
        let n = labels.len();
        (
            Just(labels),
            prop::collection::vec(-10_000.0f64..0.0, n),
            prop::collection::vec(1e-3f64..=1.0, n),
        )
            .prop_map(|(labels, lls, priors)| {
                labels
                    .into_iter()
                    .zip(lls)
                    .zip(priors)
                    .map(|((label, log_likelihood), prior)| ClassEvidence {
                        label: Label::new(label).unwrap(),
                        log_likelihood,
                        log_prior: prior.ln(),
                    })
                    .collect()
            })
    })
}

fn trained_engine() -> &'static Engine {
    static ENGINE: OnceLock<Engine> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(5);
        let mut table = TrainingTable::new();
        for (label, base) in [(2i64, 60i64), (8, 180)] {
            for _ in 0..30 {
                let values: Vec<i64> = (0..SAMPLE_LEN)
                    .map(|_| base + rng.random_range(-20..=20))
                    .collect();
                table.push(
                    Sample::from_values(&values).unwrap(),
                    Label::new(label).unwrap(),
                );
            }
        }
        let engine = Engine::new(EngineConfig::default());
        engine.estimate(&table).expect("estimate synthetic table");
        engine
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn posterior_is_a_distribution(evidence in evidence_strategy()) {
        let result = normalize_evidence(&evidence).expect("normalize evidence");
        let total = result.posterior.total();
        prop_assert!(total.is_finite());
        prop_assert!((total - 1.0).abs() < 1e-9, "total={total}");
        prop_assert_eq!(result.posterior.len(), evidence.len());
        for entry in result.posterior.iter() {
            prop_assert!(entry.probability >= 0.0);
            prop_assert!(entry.probability <= 1.0 + 1e-12);
        }
        prop_assert!(result.log_evidence.is_finite());
    }

    #[test]
    fn posterior_ignores_common_shift(evidence in evidence_strategy(), shift in -1_000.0f64..1_000.0) {
        let shifted: Vec<ClassEvidence> = evidence
            .iter()
            .map(|e| ClassEvidence { log_likelihood: e.log_likelihood + shift, ..*e })
            .collect();
        let base = normalize_evidence(&evidence).expect("normalize evidence");
        let moved = normalize_evidence(&shifted).expect("normalize shifted evidence");
        for (a, b) in base.posterior.iter().zip(moved.posterior.iter()) {
            prop_assert_eq!(a.label, b.label);
            prop_assert!((a.probability - b.probability).abs() < 1e-9);
        }
    }

    #[test]
    fn decision_takes_first_maximum(evidence in evidence_strategy()) {
        let result = normalize_evidence(&evidence).expect("normalize evidence");
        let decision = decide(&result.posterior).expect("decide");
        let max = result
            .posterior
            .iter()
            .map(|e| e.probability)
            .fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(decision.probability, max);
        let first = result
            .posterior
            .iter()
            .find(|e| e.probability == max)
            .map(|e| e.label);
        prop_assert_eq!(Some(decision.label), first);
    }

    #[test]
    fn rescale_spans_pixel_range(values in prop::collection::vec(-1_000.0f64..1_000.0, SAMPLE_LEN)) {
        let sample = rescale(&values).expect("rescale");
        let pixels = sample.pixels();
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if hi > lo {
            prop_assert_eq!(pixels.iter().copied().min(), Some(0));
            prop_assert_eq!(pixels.iter().copied().max(), Some(255));
        }
        for i in 1..SAMPLE_LEN {
            if values[i] >= values[0] {
                prop_assert!(pixels[i] >= pixels[0]);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn classify_returns_a_fitted_label(pixels in prop::collection::vec(any::<u8>(), SAMPLE_LEN)) {
        let engine = trained_engine();
        let sample = Sample::from_pixels(pixels).unwrap();
        let result = engine.classify_detailed(&sample).expect("classify");
        prop_assert!(matches!(result.decision.label.value(), 2 | 8));
        prop_assert!((result.posterior.posterior.total() - 1.0).abs() < 1e-9);
    }
}
