//! FedIoT Eval - Main Entry Point

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use fediot_eval::constants::{APP_NAME, APP_VERSION};
use fediot_eval::logic::dataset::NormalizationMode;
use fediot_eval::logic::threshold::ThresholdBasis;
use fediot_eval::{run_evaluation, Device, EvalConfig};

#[derive(Parser, Debug)]
#[command(name = "fediot-eval")]
#[command(about = "Evaluate an autoencoder anomaly detector on N-BaIoT traffic")]
#[command(version)]
struct Args {
    /// Dataset root (one directory per device)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Model checkpoint (.onnx or dense JSON)
    #[arg(long, value_name = "FILE")]
    model_path: Option<PathBuf>,

    /// Inference device: cpu or gpu
    #[arg(long)]
    device: Option<Device>,

    /// Comma separated device names
    #[arg(long, value_delimiter = ',')]
    devices: Vec<String>,

    /// Benign rows per batch, also scales the threshold's standard error
    #[arg(long)]
    batch_size: Option<usize>,

    /// Threshold statistics over batch or sample scores
    #[arg(long)]
    threshold_basis: Option<ThresholdBasis>,

    /// Threshold multiplier, repeatable (--k 0 --k 1)
    #[arg(long = "k", allow_negative_numbers = true)]
    k_values: Vec<f64>,

    /// Rows read from each attack file
    #[arg(long)]
    attack_rows: Option<usize>,

    /// Fraction of benign rows skipped before the holdout
    #[arg(long)]
    holdout_start: Option<f64>,

    /// Expected feature count per sample
    #[arg(long)]
    input_width: Option<usize>,

    /// Scoring threads
    #[arg(long)]
    workers: Option<usize>,

    /// JSON map of per-device thresholds
    #[arg(long, value_name = "FILE")]
    threshold_map: Option<PathBuf>,

    /// Append run summaries to this JSONL file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Normalization: benign-stats or per-stream
    #[arg(long)]
    normalize: Option<NormalizationMode>,

    /// Include per-device counts in each summary
    #[arg(long)]
    per_device: bool,
}

impl Args {
    fn apply(self, config: &mut EvalConfig) {
        if let Some(v) = self.data_dir {
            config.data_dir = v;
        }
        if let Some(v) = self.model_path {
            config.model_path = v;
        }
        if let Some(v) = self.device {
            config.device = v;
        }
        if !self.devices.is_empty() {
            config.devices = self.devices;
        }
        if let Some(v) = self.batch_size {
            config.batch_size = v;
        }
        if let Some(v) = self.threshold_basis {
            config.threshold_basis = v;
        }
        if !self.k_values.is_empty() {
            config.k_values = self.k_values;
        }
        if let Some(v) = self.attack_rows {
            config.attack_rows_per_file = v;
        }
        if let Some(v) = self.holdout_start {
            config.holdout_start = v;
        }
        if let Some(v) = self.input_width {
            config.input_width = v;
        }
        if let Some(v) = self.workers {
            config.workers = v;
        }
        if self.threshold_map.is_some() {
            config.threshold_map = self.threshold_map;
        }
        if self.report.is_some() {
            config.report_path = self.report;
        }
        if let Some(v) = self.normalize {
            config.normalization = v;
        }
        config.per_device |= self.per_device;
    }
}

fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Ok(path) = dotenv {
        log::debug!("Loaded environment from {}", path.display());
    }

    log::info!("Starting {} v{}", APP_NAME, APP_VERSION);

    let mut config = EvalConfig::from_env();
    Args::parse().apply(&mut config);
    log::info!("{:?}", config);

    let summaries = run_evaluation(&config)?;
    log::info!("Completed {} evaluation runs", summaries.len());

    Ok(())
}
