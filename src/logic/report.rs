//! Run Reporting
//!
//! One `RunSummary` per evaluated threshold: logged, optionally appended
//! to a JSONL file for later comparison across runs.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::scoring::{ConfusionCounts, Metric, MetricValue, MetricsReport, ScoringError};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Checkpoint identity recorded with each run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub path: String,
    pub backend: String,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceBreakdown {
    pub device: String,
    pub threshold: f64,
    pub counts: ConfusionCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub model: ModelInfo,
    /// e.g. `k=1` or `threshold-map`
    pub label: String,
    /// Global threshold; `None` when thresholds are per device
    pub threshold: Option<f64>,
    pub counts: ConfusionCounts,
    pub accuracy: MetricValue,
    pub precision: MetricValue,
    pub false_positive_rate: MetricValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceBreakdown>,
}

impl RunSummary {
    pub fn new(
        model: ModelInfo,
        label: impl Into<String>,
        threshold: Option<f64>,
        counts: ConfusionCounts,
        devices: Vec<DeviceBreakdown>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            model,
            label: label.into(),
            threshold,
            counts,
            accuracy: counts.metric_value(Metric::Accuracy),
            precision: counts.metric_value(Metric::Precision),
            false_positive_rate: counts.metric_value(Metric::FalsePositiveRate),
            devices,
        }
    }

    /// Numeric report, or the first undefined metric
    pub fn metrics(&self) -> Result<MetricsReport, ScoringError> {
        self.counts.report()
    }

    /// One JSON line, as written by `ReportWriter`
    pub fn to_jsonl(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// LOG OUTPUT
// ============================================================================

pub fn log_run(summary: &RunSummary) {
    match summary.threshold {
        Some(t) => log::info!("[{}] threshold = {}", summary.label, t),
        None => log::info!("[{}] per-device thresholds", summary.label),
    }

    let c = &summary.counts;
    log::info!("The True negative number is {}", c.true_negative);
    log::info!("The False positive number is {}", c.false_positive);
    log::info!("The True positive number is {}", c.true_positive);
    log::info!("The False negative number is {}", c.false_negative);

    log::info!("The accuracy is {}", summary.accuracy);
    log::info!("The precision is {}", summary.precision);
    log::info!("The false positive rate is {}", summary.false_positive_rate);

    for device in &summary.devices {
        log::debug!(
            "  {} (threshold {}): TN={} FP={} TP={} FN={}",
            device.device,
            device.threshold,
            device.counts.true_negative,
            device.counts.false_positive,
            device.counts.true_positive,
            device.counts.false_negative
        );
    }
}

// ============================================================================
// JSONL WRITER
// ============================================================================

pub struct ReportWriter {
    path: PathBuf,
}

impl ReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one summary as a JSON line
    pub fn append(&self, summary: &RunSummary) -> io::Result<()> {
        let line = summary.to_jsonl()?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

/// Read back every summary in a JSONL report; blank lines skipped
pub fn read_reports(path: &Path) -> io::Result<Vec<RunSummary>> {
    let file = fs::File::open(path)?;
    let mut summaries = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        summaries.push(serde_json::from_str(&line)?);
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::scoring::tally;

    fn model_info() -> ModelInfo {
        ModelInfo {
            path: "training/model.json".to_string(),
            backend: "dense".to_string(),
            sha256: "00".repeat(32),
        }
    }

    #[test]
    fn test_summary_metrics() {
        let counts = tally(1.0, &[0.1, 0.2, 0.9], &[1.5, 2.0]);
        let summary = RunSummary::new(model_info(), "k=0", Some(1.0), counts, Vec::new());

        assert_eq!(summary.accuracy.value(), Some(0.8));
        assert!(summary.metrics().is_ok());
    }

    #[test]
    fn test_undefined_metric_serialized() {
        let counts = tally(10.0, &[0.1], &[0.2]);
        let summary = RunSummary::new(model_info(), "k=2", Some(10.0), counts, Vec::new());

        let json: serde_json::Value = serde_json::from_str(&summary.to_jsonl().unwrap()).unwrap();
        assert_eq!(json["precision"]["status"], "undefined");
        assert_eq!(json["accuracy"]["status"], "defined");
        assert_eq!(json["accuracy"]["value"], 0.5);
        assert!(json.get("devices").is_none());
    }

    #[test]
    fn test_writer_line_is_to_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("runs.jsonl")).unwrap();

        let counts = tally(0.4, &[0.1], &[0.9]);
        let summary = RunSummary::new(model_info(), "k=1", Some(0.4), counts, Vec::new());
        writer.append(&summary).unwrap();

        let content = fs::read_to_string(writer.path()).unwrap();
        assert_eq!(content, format!("{}\n", summary.to_jsonl().unwrap()));
    }

    #[test]
    fn test_writer_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("runs.jsonl");
        let writer = ReportWriter::new(&path).unwrap();

        let breakdown = DeviceBreakdown {
            device: "Danmini_Doorbell".to_string(),
            threshold: 0.3,
            counts: tally(0.3, &[0.1], &[0.5]),
        };

        for k in 0..3 {
            let counts = tally(0.3, &[0.1, 0.4], &[0.5]);
            let summary = RunSummary::new(
                model_info(),
                format!("k={}", k),
                Some(0.3),
                counts,
                vec![breakdown.clone()],
            );
            writer.append(&summary).unwrap();
        }

        let read = read_reports(writer.path()).unwrap();
        assert_eq!(read.len(), 3);
        assert_eq!(read[2].label, "k=2");
        assert_eq!(read[0].devices[0].device, "Danmini_Doorbell");
        assert_ne!(read[0].run_id, read[1].run_id);
    }
}
