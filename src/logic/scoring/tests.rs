use ndarray::{array, Array1, Array2, ArrayView1};
use proptest::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::*;
use crate::logic::model::{DenseAutoencoder, ModelError, ReconstructionModel};

// ============================================================================
// TEST MODELS
// ============================================================================

/// Reconstructs every sample as zeros, so the score is mean(x^2).
struct ZeroModel {
    width: usize,
}

impl ReconstructionModel for ZeroModel {
    fn input_width(&self) -> usize {
        self.width
    }

    fn reconstruct(&self, sample: ArrayView1<'_, f64>) -> Result<Array1<f64>, ModelError> {
        Ok(Array1::zeros(sample.len()))
    }

    fn name(&self) -> &str {
        "zero"
    }
}

/// Emits one value too many.
struct OverflowModel;

impl ReconstructionModel for OverflowModel {
    fn input_width(&self) -> usize {
        2
    }

    fn reconstruct(&self, sample: ArrayView1<'_, f64>) -> Result<Array1<f64>, ModelError> {
        Ok(Array1::zeros(sample.len() + 1))
    }

    fn name(&self) -> &str {
        "overflow"
    }
}

/// Fails on any sample whose first feature is negative.
struct RejectNegativeModel;

impl ReconstructionModel for RejectNegativeModel {
    fn input_width(&self) -> usize {
        1
    }

    fn reconstruct(&self, sample: ArrayView1<'_, f64>) -> Result<Array1<f64>, ModelError> {
        if sample[0] < 0.0 {
            return Err(ModelError::Runtime("negative input".to_string()));
        }
        Ok(sample.to_owned())
    }

    fn name(&self) -> &str {
        "reject-negative"
    }
}

/// Single-column samples whose ZeroModel scores equal `scores`.
fn samples_with_scores(scores: &[f64]) -> Array2<f64> {
    let column: Vec<f64> = scores.iter().map(|s| s.sqrt()).collect();
    Array2::from_shape_vec((scores.len(), 1), column).unwrap()
}

fn empty(width: usize) -> Array2<f64> {
    Array2::zeros((0, width))
}

// ============================================================================
// SCORE
// ============================================================================

#[test]
fn test_score_is_mean_squared_error() {
    let model = ZeroModel { width: 4 };
    let s = score(&model, array![1.0, -1.0, 2.0, 0.0].view()).unwrap();
    assert_eq!(s, 1.5);
}

#[test]
fn test_score_shape_mismatch() {
    let model = ZeroModel { width: 3 };
    let result = score(&model, array![1.0, 2.0].view());
    assert!(matches!(
        result,
        Err(ScoringError::ShapeMismatch { expected: 3, actual: 2 })
    ));
}

#[test]
fn test_score_rejects_wrong_reconstruction_width() {
    let result = score(&OverflowModel, array![1.0, 2.0].view());
    assert!(matches!(
        result,
        Err(ScoringError::ShapeMismatch { expected: 2, actual: 3 })
    ));
}

// ============================================================================
// CLASSIFY
// ============================================================================

#[test]
fn test_classify_boundary_is_exclusive() {
    assert!(!classify(1.0, 1.0));
    assert!(classify(1.0 + f64::EPSILON, 1.0));
    assert!(!classify(0.999, 1.0));
}

// ============================================================================
// EVALUATE
// ============================================================================

#[test]
fn test_literal_scenario_from_scores() {
    let report = evaluate_scores(1.0, &[0.1, 0.2, 0.9], &[1.5, 2.0]).unwrap();

    assert!((report.accuracy - 0.8).abs() < 1e-12);
    assert!((report.precision - 2.0 / 3.0).abs() < 1e-12);
    assert!((report.false_positive_rate - 1.0 / 3.0).abs() < 1e-12);
}

#[test]
fn test_literal_scenario_through_model() {
    let model = ZeroModel { width: 1 };
    let benign = samples_with_scores(&[0.1, 0.2, 0.9]);
    let attack = samples_with_scores(&[1.5, 2.0]);

    let counts = evaluate_counts(&model, 1.0, benign.view(), attack.view()).unwrap();
    assert_eq!(
        counts,
        ConfusionCounts {
            true_negative: 2,
            false_positive: 1,
            true_positive: 2,
            false_negative: 0,
        }
    );

    let report = evaluate(&model, 1.0, benign.view(), attack.view()).unwrap();
    assert!((report.accuracy - 0.8).abs() < 1e-12);
    assert!((report.precision - 2.0 / 3.0).abs() < 1e-12);
    assert!((report.false_positive_rate - 1.0 / 3.0).abs() < 1e-12);
}

#[test]
fn test_all_benign_flagged_without_attacks() {
    let model = ZeroModel { width: 2 };
    let benign = array![[0.5, 0.5], [1.0, 0.0]];

    let counts = evaluate_counts(&model, -1.0, benign.view(), empty(2).view()).unwrap();
    assert_eq!(counts.false_positive, 2);
    assert_eq!(counts.true_negative, 0);
    assert_eq!(counts.attack_total(), 0);

    let report = evaluate(&model, -1.0, benign.view(), empty(2).view()).unwrap();
    assert_eq!(report.accuracy, 0.0);
    assert_eq!(report.precision, 0.0);
    assert_eq!(report.false_positive_rate, 1.0);
}

#[test]
fn test_empty_streams_accuracy_undefined() {
    let model = ZeroModel { width: 2 };
    let result = evaluate(&model, 0.5, empty(2).view(), empty(2).view());

    assert!(matches!(
        result,
        Err(ScoringError::UndefinedMetric { metric: Metric::Accuracy, .. })
    ));
}

#[test]
fn test_no_flags_precision_undefined() {
    let counts = tally(10.0, &[0.1, 0.2], &[0.3]);
    assert!(counts.accuracy().is_ok());
    assert!(counts.false_positive_rate().is_ok());
    assert!(matches!(
        counts.precision(),
        Err(ScoringError::UndefinedMetric { metric: Metric::Precision, .. })
    ));
    assert!(matches!(
        counts.report(),
        Err(ScoringError::UndefinedMetric { metric: Metric::Precision, .. })
    ));
}

#[test]
fn test_no_benign_fpr_undefined() {
    let counts = tally(0.5, &[], &[1.0, 0.1]);
    assert_eq!(counts.precision().unwrap(), 1.0);
    assert!(matches!(
        counts.false_positive_rate(),
        Err(ScoringError::UndefinedMetric { metric: Metric::FalsePositiveRate, .. })
    ));

    let value = counts.metric_value(Metric::FalsePositiveRate);
    assert_eq!(value.value(), None);
    assert!(value.to_string().starts_with("undefined"));
}

#[test]
fn test_shape_mismatch_aborts_evaluation() {
    let model = ZeroModel { width: 2 };
    let benign = array![[0.1, 0.1]];
    let attack = array![[1.0, 1.0, 1.0]];

    let result = evaluate(&model, 0.5, benign.view(), attack.view());
    assert!(matches!(result, Err(ScoringError::ShapeMismatch { .. })));
}

#[test]
fn test_counts_sum_across_shards() {
    let a = tally(0.5, &[0.1, 0.9], &[1.0]);
    let b = tally(0.5, &[0.2], &[0.3, 0.7]);
    let whole = tally(0.5, &[0.1, 0.9, 0.2], &[1.0, 0.3, 0.7]);

    assert_eq!(a + b, whole);
    assert_eq!([a, b].into_iter().sum::<ConfusionCounts>(), whole);
}

#[test]
fn test_parallel_matches_serial() {
    let model = ZeroModel { width: 3 };
    let benign = Array2::from_shape_fn((37, 3), |(i, j)| ((i * 7 + j) % 11) as f64 * 0.1);
    let attack = Array2::from_shape_fn((23, 3), |(i, j)| ((i * 5 + j) % 13) as f64 * 0.2);

    let serial = evaluate(&model, 0.4, benign.view(), attack.view()).unwrap();
    for workers in [0, 1, 2, 4, 8, 64] {
        let parallel = evaluate_parallel(&model, 0.4, benign.view(), attack.view(), workers).unwrap();
        assert_eq!(parallel, serial);
    }

    let scores = score_batch(&model, benign.view()).unwrap();
    let sharded = score_batch_parallel(&model, benign.view(), 5).unwrap();
    assert_eq!(scores, sharded);
}

#[test]
fn test_parallel_scores_keep_row_order() {
    let model = ZeroModel { width: 1 };
    let expected: Vec<f64> = (0..37).map(|i| i as f64).collect();
    let samples = samples_with_scores(&expected);

    for workers in [2, 3, 8, 64] {
        let scores = score_batch_parallel(&model, samples.view(), workers).unwrap();
        assert_eq!(scores.len(), expected.len());
        for (got, want) in scores.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-9);
        }
    }
}

#[test]
fn test_parallel_surfaces_shard_error() {
    let benign = Array2::from_shape_vec((9, 1), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, -1.0]).unwrap();
    let attack = empty(1);

    let result = evaluate_parallel(&RejectNegativeModel, 0.5, benign.view(), attack.view(), 3);
    assert!(matches!(result, Err(ScoringError::Model(ModelError::Runtime(_)))));

    let scores = score_batch_parallel(&RejectNegativeModel, benign.view(), 4);
    assert!(matches!(scores, Err(ScoringError::Model(_))));
}

#[test]
fn test_shuffle_does_not_change_counts() {
    let benign_scores = vec![0.1, 0.4, 0.5, 0.8, 1.2, 0.05, 0.6];
    let attack_scores = vec![0.3, 0.9, 1.5, 2.0, 0.5];
    let expected = tally(0.5, &benign_scores, &attack_scores);

    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    for _ in 0..10 {
        let mut b = benign_scores.clone();
        let mut a = attack_scores.clone();
        b.shuffle(&mut rng);
        a.shuffle(&mut rng);
        assert_eq!(tally(0.5, &b, &a), expected);
    }
}

// ============================================================================
// PROPERTIES
// ============================================================================

fn sample_matrix(max_rows: usize, width: usize) -> impl Strategy<Value = Array2<f64>> {
    prop::collection::vec(prop::collection::vec(-10.0f64..10.0, width), 0..max_rows).prop_map(
        move |rows| {
            let n = rows.len();
            Array2::from_shape_vec((n, width), rows.into_iter().flatten().collect()).unwrap()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: identity reconstruction scores zero
    #[test]
    fn identity_scores_zero(samples in sample_matrix(16, 5)) {
        let model = DenseAutoencoder::identity(5);
        for s in score_batch(&model, samples.view()).unwrap() {
            prop_assert_eq!(s, 0.0);
        }
    }

    /// Property: a score equal to the threshold is never flagged
    #[test]
    fn equal_score_is_normal(value in -1e6f64..1e6) {
        prop_assert!(!classify(value, value));
    }

    /// Property: each stream is partitioned by its two counters
    #[test]
    fn counters_partition_streams(
        benign in sample_matrix(20, 3),
        attack in sample_matrix(20, 3),
        threshold in 0.0f64..50.0,
    ) {
        let model = ZeroModel { width: 3 };
        let counts = evaluate_counts(&model, threshold, benign.view(), attack.view()).unwrap();

        prop_assert_eq!(counts.benign_total(), benign.nrows() as u64);
        prop_assert_eq!(counts.attack_total(), attack.nrows() as u64);
        prop_assert_eq!(counts.total(), (benign.nrows() + attack.nrows()) as u64);
    }

    /// Property: defined metrics stay within [0, 1]
    #[test]
    fn metrics_are_ratios(
        benign in prop::collection::vec(0.0f64..5.0, 0..30),
        attack in prop::collection::vec(0.0f64..5.0, 0..30),
        threshold in 0.0f64..5.0,
    ) {
        let counts = tally(threshold, &benign, &attack);
        for metric in Metric::ALL {
            if let Ok(v) = counts.metric(metric) {
                prop_assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}
