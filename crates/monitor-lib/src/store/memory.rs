//! In-memory store implementations
//!
//! Back the agent binary and the test suite. Each store keeps records
//! keyed by patient in a concurrent map; history samples stay sorted by
//! timestamp on insert so window queries return ordered slices.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::StoreError;
use crate::models::{AlertRecord, AnomalyRecord, VitalSample};
use crate::store::{AlertStore, AnomalyStore, HistoryStore};

/// In-memory history of vital samples per patient
#[derive(Default)]
pub struct InMemoryHistoryStore {
    samples: DashMap<String, Vec<VitalSample>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an ingested sample so later statistical detection sees it
    pub fn record(&self, sample: VitalSample) {
        let mut entry = self
            .samples
            .entry(sample.patient_id.clone())
            .or_default();
        let pos = entry
            .binary_search_by_key(&sample.timestamp, |s| s.timestamp)
            .unwrap_or_else(|p| p);
        entry.insert(pos, sample);
    }

    /// Total samples stored for a patient
    pub fn len(&self, patient_id: &str) -> usize {
        self.samples.get(patient_id).map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, patient_id: &str) -> bool {
        self.len(patient_id) == 0
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn samples(
        &self,
        patient_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<VitalSample>, StoreError> {
        let Some(entry) = self.samples.get(patient_id) else {
            return Ok(Vec::new());
        };
        Ok(entry
            .iter()
            .filter(|s| s.timestamp >= since && s.timestamp <= until)
            .cloned()
            .collect())
    }
}

/// In-memory anomaly sink, newest last per patient
#[derive(Default)]
pub struct InMemoryAnomalyStore {
    anomalies: DashMap<String, Vec<AnomalyRecord>>,
}

impl InMemoryAnomalyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored anomalies for a patient, in insertion order
    pub fn for_patient(&self, patient_id: &str) -> Vec<AnomalyRecord> {
        self.anomalies
            .get(patient_id)
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AnomalyStore for InMemoryAnomalyStore {
    async fn insert(&self, anomaly: &AnomalyRecord) -> Result<(), StoreError> {
        self.anomalies
            .entry(anomaly.patient_id.clone())
            .or_default()
            .push(anomaly.clone());
        Ok(())
    }
}

/// In-memory alert store keyed by (patient, alert_type)
#[derive(Default)]
pub struct InMemoryAlertStore {
    alerts: DashMap<String, Vec<AlertRecord>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored alerts for a patient, in insertion order
    pub fn for_patient(&self, patient_id: &str) -> Vec<AlertRecord> {
        self.alerts
            .get(patient_id)
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn last_alert(
        &self,
        patient_id: &str,
        alert_type: &str,
    ) -> Result<Option<AlertRecord>, StoreError> {
        let Some(entry) = self.alerts.get(patient_id) else {
            return Ok(None);
        };
        Ok(entry
            .iter()
            .filter(|a| a.alert_type == alert_type)
            .max_by_key(|a| a.timestamp)
            .cloned())
    }

    async fn insert(&self, alert: &AlertRecord) -> Result<(), StoreError> {
        self.alerts
            .entry(alert.patient_id.clone())
            .or_default()
            .push(alert.clone());
        Ok(())
    }

    async fn mark_sent(&self, alert_id: &str) -> Result<(), StoreError> {
        for mut entry in self.alerts.iter_mut() {
            if let Some(alert) = entry.value_mut().iter_mut().find(|a| a.id == alert_id) {
                alert.sent = true;
                return Ok(());
            }
        }
        Err(StoreError::NotFound(alert_id.to_string()))
    }
}
