//! Storage seams consumed by the detection pipeline
//!
//! The core does not own persistence. It consumes three narrow
//! capabilities: a historical-sample query for statistical detection,
//! an anomaly sink, and a most-recent-alert query with a conditional
//! write for deduplication. Real backends live in the excluded API
//! layer; in-memory implementations back the agent binary and tests.

mod memory;

pub use memory::{InMemoryAlertStore, InMemoryAnomalyStore, InMemoryHistoryStore};

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::{AlertRecord, AnomalyRecord, VitalSample};

pub use async_trait::async_trait;

/// Historical vital-sign query for statistical detection
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Samples for a patient within [since, until], ordered by timestamp
    async fn samples(
        &self,
        patient_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<VitalSample>, StoreError>;
}

/// Anomaly persistence sink
#[async_trait]
pub trait AnomalyStore: Send + Sync {
    /// Persist one anomaly record
    async fn insert(&self, anomaly: &AnomalyRecord) -> Result<(), StoreError>;
}

/// Alert persistence with the dedup lookup
///
/// `last_alert` then conditional `insert` is the engine's
/// read-then-conditionally-write contract; the pipeline serializes it
/// per patient.
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Most recent alert for a (patient, alert_type) pair
    async fn last_alert(
        &self,
        patient_id: &str,
        alert_type: &str,
    ) -> Result<Option<AlertRecord>, StoreError>;

    /// Persist one alert record
    async fn insert(&self, alert: &AlertRecord) -> Result<(), StoreError>;

    /// Flag an alert as delivered
    async fn mark_sent(&self, alert_id: &str) -> Result<(), StoreError>;
}
