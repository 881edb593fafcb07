//! Monitoring library for patient vital-sign anomaly detection
//!
//! This crate provides the core functionality for:
//! - Threshold and statistical anomaly detection over vital samples
//! - Per-patient threshold overrides
//! - Alert creation with deduplication windows
//! - Notification dispatch
//! - Health checks and observability

pub mod aggregator;
pub mod alert;
pub mod detect;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod store;
pub mod thresholds;

pub use error::StoreError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
    SeamFailures,
};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
pub use pipeline::{ProcessOutcome, VitalsPipeline, VitalsPipelineBuilder};
pub use thresholds::{RangeOverride, ThresholdBook, ThresholdConfig, VitalRange};
