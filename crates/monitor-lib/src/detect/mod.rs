//! Anomaly detection for vital-sign samples
//!
//! Two independent detectors feed the pipeline:
//! - Threshold breaches against static per-metric ranges (default or
//!   patient-overridden)
//! - Statistical deviation from the patient's own trailing history
//!   (z-score test)
//!
//! Both are pure reads; shared severity/confidence scoring lives in
//! [`classify`].

pub mod classify;

mod statistical;
mod threshold;

pub use statistical::{StatisticalDetector, StatisticalFinding};
pub use threshold::{ThresholdBreach, ThresholdDetector};
