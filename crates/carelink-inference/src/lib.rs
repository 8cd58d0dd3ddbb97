//! # Carelink Inference
//!
//! 外部推理服务的HTTP客户端与结果归一化。

pub mod client;
pub mod prediction;

pub use client::{normalize_scan_kind, HttpInferenceClient, InferenceService};
pub use prediction::{Prediction, RawPrediction};
