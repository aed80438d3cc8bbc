//! Anomaly Scorer - reconstruction error against a threshold
//!
//! score (MSE) → classify (`score > threshold`) → tally → metrics.
//! Benign rows are the negative class, attack rows the positive class.
//! Classification is per-sample, so shards can be counted in parallel
//! and summed afterwards.

pub mod confusion;
pub mod error;

#[cfg(test)]
mod tests;

use ndarray::{ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::logic::model::ReconstructionModel;

pub use confusion::{ConfusionCounts, Metric, MetricValue, MetricsReport};
pub use error::ScoringError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Benign,
    Attack,
}

// ============================================================================
// PER-SAMPLE
// ============================================================================

/// Mean squared error between a sample and its reconstruction.
pub fn score<M>(model: &M, sample: ArrayView1<'_, f64>) -> Result<f64, ScoringError>
where
    M: ReconstructionModel + ?Sized,
{
    let expected = model.input_width();
    if sample.len() != expected {
        return Err(ScoringError::ShapeMismatch {
            expected,
            actual: sample.len(),
        });
    }

    let reconstructed = model.reconstruct(sample)?;
    if reconstructed.len() != sample.len() {
        return Err(ScoringError::ShapeMismatch {
            expected: sample.len(),
            actual: reconstructed.len(),
        });
    }

    if sample.is_empty() {
        return Ok(0.0);
    }

    let sum: f64 = sample
        .iter()
        .zip(reconstructed.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum();

    Ok(sum / sample.len() as f64)
}

/// Anomalous iff `score > threshold`. Equal scores are normal.
pub fn classify(score: f64, threshold: f64) -> bool {
    score > threshold
}

// ============================================================================
// BATCH SCORING
// ============================================================================

/// Score every row, in row order.
pub fn score_batch<M>(model: &M, samples: ArrayView2<'_, f64>) -> Result<Vec<f64>, ScoringError>
where
    M: ReconstructionModel + ?Sized,
{
    samples.rows().into_iter().map(|row| score(model, row)).collect()
}

/// `score_batch` split into `workers` shards on the rayon pool. Row order is preserved.
pub fn score_batch_parallel<M>(
    model: &M,
    samples: ArrayView2<'_, f64>,
    workers: usize,
) -> Result<Vec<f64>, ScoringError>
where
    M: ReconstructionModel + Sync + ?Sized,
{
    let rows = samples.nrows();
    if workers <= 1 || rows < 2 {
        return score_batch(model, samples);
    }

    let chunk = rows.div_ceil(workers);
    let shards = samples
        .axis_chunks_iter(Axis(0), chunk)
        .into_par_iter()
        .map(|shard| score_batch(model, shard))
        .collect::<Result<Vec<Vec<f64>>, ScoringError>>()?;

    Ok(shards.into_iter().flatten().collect())
}

// ============================================================================
// COUNTING
// ============================================================================

/// Classify precomputed scores and accumulate the confusion counts.
pub fn tally(threshold: f64, benign_scores: &[f64], attack_scores: &[f64]) -> ConfusionCounts {
    let mut counts = ConfusionCounts::new();
    for &s in benign_scores {
        counts.record_benign(classify(s, threshold));
    }
    for &s in attack_scores {
        counts.record_attack(classify(s, threshold));
    }
    counts
}

fn count_stream<M>(
    model: &M,
    threshold: f64,
    samples: ArrayView2<'_, f64>,
    stream: Stream,
) -> Result<ConfusionCounts, ScoringError>
where
    M: ReconstructionModel + ?Sized,
{
    let mut counts = ConfusionCounts::new();
    for row in samples.rows() {
        let flagged = classify(score(model, row)?, threshold);
        match stream {
            Stream::Benign => counts.record_benign(flagged),
            Stream::Attack => counts.record_attack(flagged),
        }
    }
    Ok(counts)
}

fn count_stream_parallel<M>(
    model: &M,
    threshold: f64,
    samples: ArrayView2<'_, f64>,
    stream: Stream,
    workers: usize,
) -> Result<ConfusionCounts, ScoringError>
where
    M: ReconstructionModel + Sync + ?Sized,
{
    let rows = samples.nrows();
    if workers <= 1 || rows < 2 {
        return count_stream(model, threshold, samples, stream);
    }

    let chunk = rows.div_ceil(workers);
    samples
        .axis_chunks_iter(Axis(0), chunk)
        .into_par_iter()
        .map(|shard| count_stream(model, threshold, shard, stream))
        .try_reduce(ConfusionCounts::new, |a, b| Ok(a + b))
}

/// Score and classify both streams.
pub fn evaluate_counts<M>(
    model: &M,
    threshold: f64,
    benign: ArrayView2<'_, f64>,
    attack: ArrayView2<'_, f64>,
) -> Result<ConfusionCounts, ScoringError>
where
    M: ReconstructionModel + ?Sized,
{
    let benign_counts = count_stream(model, threshold, benign, Stream::Benign)?;
    let attack_counts = count_stream(model, threshold, attack, Stream::Attack)?;
    Ok(benign_counts + attack_counts)
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Full evaluation: counts both streams, then derives the metrics report.
///
/// Fails with `ShapeMismatch` on the first malformed sample, or with
/// `UndefinedMetric` if any ratio has a zero denominator.
pub fn evaluate<M>(
    model: &M,
    threshold: f64,
    benign: ArrayView2<'_, f64>,
    attack: ArrayView2<'_, f64>,
) -> Result<MetricsReport, ScoringError>
where
    M: ReconstructionModel + ?Sized,
{
    evaluate_counts(model, threshold, benign, attack)?.report()
}

/// `evaluate` with rows split into `workers` shards on the rayon pool.
pub fn evaluate_parallel<M>(
    model: &M,
    threshold: f64,
    benign: ArrayView2<'_, f64>,
    attack: ArrayView2<'_, f64>,
    workers: usize,
) -> Result<MetricsReport, ScoringError>
where
    M: ReconstructionModel + Sync + ?Sized,
{
    let benign_counts = count_stream_parallel(model, threshold, benign, Stream::Benign, workers)?;
    let attack_counts = count_stream_parallel(model, threshold, attack, Stream::Attack, workers)?;
    (benign_counts + attack_counts).report()
}

/// Metrics from already computed scores.
pub fn evaluate_scores(
    threshold: f64,
    benign_scores: &[f64],
    attack_scores: &[f64],
) -> Result<MetricsReport, ScoringError> {
    tally(threshold, benign_scores, attack_scores).report()
}
