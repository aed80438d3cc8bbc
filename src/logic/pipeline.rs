//! Evaluation Pipeline
//!
//! Single entry point: model + devices in, one `RunSummary` per threshold out.
//! Scores are computed once per sample; each threshold only re-classifies them.

use anyhow::{Context, Result};
use ndarray::s;

use crate::logic::config::EvalConfig;
use crate::logic::dataset::{batch_holdout_start, holdout_start, load_devices, DeviceData};
use crate::logic::model::{model_checksum, LoadedModel, ReconstructionModel};
use crate::logic::report::{log_run, DeviceBreakdown, ModelInfo, ReportWriter, RunSummary};
use crate::logic::scoring::{score_batch_parallel, tally, ConfusionCounts, ScoringError};
use crate::logic::threshold::{
    batch_scores, policies, ScoreStats, ThresholdBasis, ThresholdError, ThresholdMap,
};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Reconstruction errors of one device's holdout and attack rows
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceScores {
    pub device: String,
    pub benign: Vec<f64>,
    pub attack: Vec<f64>,
    /// Benign holdout scores the threshold statistics are taken over
    pub threshold_scores: Vec<f64>,
}

#[derive(Debug, Clone)]
pub enum ThresholdSource {
    Global(f64),
    PerDevice(ThresholdMap),
}

#[derive(Debug, Clone)]
pub struct PlannedRun {
    pub label: String,
    pub source: ThresholdSource,
}

impl PlannedRun {
    pub fn threshold_for(&self, device: &str) -> Result<f64, ThresholdError> {
        match &self.source {
            ThresholdSource::Global(t) => Ok(*t),
            ThresholdSource::PerDevice(map) => map.get(device),
        }
    }

    pub fn global_threshold(&self) -> Option<f64> {
        match self.source {
            ThresholdSource::Global(t) => Some(t),
            ThresholdSource::PerDevice(_) => None,
        }
    }
}

// ============================================================================
// STAGES
// ============================================================================

/// Score each device's benign holdout and attack stream.
///
/// Benign rows are scored once from the earlier of the row and batch
/// holdout starts; both views are sliced from that single pass.
pub fn score_devices<M>(
    model: &M,
    datasets: &[DeviceData],
    config: &EvalConfig,
) -> Result<Vec<DeviceScores>, ScoringError>
where
    M: ReconstructionModel + Sync + ?Sized,
{
    datasets
        .iter()
        .map(|data| {
            let rows = data.benign.nrows();
            let row_start = holdout_start(rows, config.holdout_start);
            let threshold_start = match config.threshold_basis {
                ThresholdBasis::Batch => {
                    batch_holdout_start(rows, config.batch_size, config.holdout_start)
                }
                ThresholdBasis::Sample => row_start,
            };

            let first = row_start.min(threshold_start);
            let benign_rows = data.benign.slice(s![first.., ..]);
            let scored = score_batch_parallel(model, benign_rows, config.workers)?;
            let attack = score_batch_parallel(model, data.attack.view(), config.workers)?;

            let benign = scored[row_start - first..].to_vec();
            let threshold_scores = match config.threshold_basis {
                ThresholdBasis::Batch => {
                    batch_scores(&scored[threshold_start - first..], config.batch_size)
                }
                ThresholdBasis::Sample => benign.clone(),
            };

            log::debug!(
                "{}: scored {} holdout and {} attack samples, {} threshold scores",
                data.name,
                benign.len(),
                attack.len(),
                threshold_scores.len()
            );

            Ok(DeviceScores {
                device: data.name.clone(),
                benign,
                attack,
                threshold_scores,
            })
        })
        .collect()
}

/// Threshold runs for this configuration.
///
/// With a threshold map: a single run using each device's own threshold.
/// Otherwise: one run per `k`, derived from every device's threshold scores together.
pub fn threshold_plan(config: &EvalConfig, scores: &[DeviceScores]) -> Result<Vec<PlannedRun>> {
    if let Some(path) = &config.threshold_map {
        let map = ThresholdMap::load(path)
            .with_context(|| format!("loading threshold map {}", path.display()))?;

        for device in scores {
            map.get(&device.device)?;
        }

        return Ok(vec![PlannedRun {
            label: "threshold-map".to_string(),
            source: ThresholdSource::PerDevice(map),
        }]);
    }

    let holdout: Vec<f64> = scores
        .iter()
        .flat_map(|s| s.threshold_scores.iter().copied())
        .collect();
    let stats = ScoreStats::from_scores(&holdout).context("deriving threshold statistics")?;

    log::info!(
        "Benign holdout: {} {} scores, mean {:.6}, std {:.6}",
        stats.count,
        config.threshold_basis,
        stats.mean,
        stats.std
    );

    let runs = policies(&config.k_values, config.batch_size)?
        .into_iter()
        .map(|policy| PlannedRun {
            label: policy.label(),
            source: ThresholdSource::Global(policy.threshold(&stats)),
        })
        .collect();

    Ok(runs)
}

/// Classify precomputed scores for one run, per device and in total.
pub fn tally_run(
    run: &PlannedRun,
    scores: &[DeviceScores],
) -> Result<(ConfusionCounts, Vec<DeviceBreakdown>), ThresholdError> {
    let mut breakdown = Vec::with_capacity(scores.len());

    for device in scores {
        let threshold = run.threshold_for(&device.device)?;
        breakdown.push(DeviceBreakdown {
            device: device.device.clone(),
            threshold,
            counts: tally(threshold, &device.benign, &device.attack),
        });
    }

    let total = breakdown.iter().map(|d| d.counts).sum();
    Ok((total, breakdown))
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Evaluate the configured model on the configured devices.
pub fn run_evaluation(config: &EvalConfig) -> Result<Vec<RunSummary>> {
    config.validate()?;

    let model = LoadedModel::load(&config.model_path, config.input_width, config.device)
        .with_context(|| format!("loading model {}", config.model_path.display()))?;

    let model_info = ModelInfo {
        path: config.model_path.display().to_string(),
        backend: model.backend().to_string(),
        sha256: model_checksum(&config.model_path)?,
    };

    log::info!(
        "Model {} ({}, sha256 {})",
        model.name(),
        model_info.backend,
        model_info.sha256
    );

    let datasets = load_devices(&config.data_dir, &config.devices, &config.dataset_options())
        .with_context(|| format!("loading dataset from {}", config.data_dir.display()))?;

    let scores = score_devices(&model, &datasets, config)
        .context("scoring samples")?;

    let plan = threshold_plan(config, &scores)?;

    let writer = match &config.report_path {
        Some(path) => Some(
            ReportWriter::new(path.clone())
                .with_context(|| format!("creating report {}", path.display()))?,
        ),
        None => None,
    };

    let mut summaries = Vec::with_capacity(plan.len());
    for run in &plan {
        let (counts, breakdown) = tally_run(run, &scores)?;
        let devices = if config.per_device { breakdown } else { Vec::new() };

        let summary = RunSummary::new(
            model_info.clone(),
            run.label.clone(),
            run.global_threshold(),
            counts,
            devices,
        );
        log_run(&summary);

        if let Some(writer) = &writer {
            writer
                .append(&summary)
                .with_context(|| format!("writing report {}", writer.path().display()))?;
        }

        summaries.push(summary);
    }

    Ok(summaries)
}
