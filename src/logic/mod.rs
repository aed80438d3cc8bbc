//! Logic Module - Evaluation engines
//!
//! - `scoring/` - reconstruction error, classification, confusion metrics
//! - `model/` - reconstruction models (dense JSON, ONNX)
//! - `dataset/` - per-device CSV ingestion and normalization
//! - `threshold` - decision thresholds from benign scores
//! - `report` - run summaries and JSONL output
//! - `pipeline` - the evaluation entry point

pub mod config;
pub mod dataset;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod scoring;
pub mod threshold;
