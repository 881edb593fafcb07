//! Anomaly aggregation and persistence
//!
//! Runs both detectors for a sample, merges their candidates into one
//! ordered list of classified records, and persists every record.
//! Anomaly recording is not gated by alert policy, and a persistence
//! failure on one record never blocks its siblings.

use tracing::{debug, warn};

use crate::detect::{StatisticalDetector, ThresholdDetector};
use crate::models::{AnomalyKind, AnomalyRecord, Severity, VitalSample};
use crate::store::{AnomalyStore, HistoryStore};
use crate::thresholds::ThresholdConfig;

/// Merges detector output into persisted anomaly records
pub struct AnomalyAggregator {
    threshold: ThresholdDetector,
    statistical: StatisticalDetector,
}

/// Result of one aggregation pass
#[derive(Debug, Default)]
pub struct AggregationOutcome {
    /// Successfully persisted records, threshold findings first
    pub anomalies: Vec<AnomalyRecord>,
    /// Records that could not be persisted
    pub persistence_failures: usize,
    /// History queries that failed, forcing a threshold-only pass
    pub history_failures: usize,
}

impl AnomalyAggregator {
    pub fn new() -> Self {
        Self {
            threshold: ThresholdDetector::new(),
            statistical: StatisticalDetector::default(),
        }
    }

    /// Use a statistical detector with non-default settings
    pub fn with_statistical(mut self, detector: StatisticalDetector) -> Self {
        self.statistical = detector;
        self
    }

    /// Shrink or grow the statistical-baseline lookback
    pub fn with_history_window(mut self, window: chrono::Duration) -> Self {
        self.statistical = self.statistical.with_window(window);
        self
    }

    /// Detect, classify and persist all anomalies for one sample
    ///
    /// The detectors are independent pure reads and run concurrently.
    /// A statistical-detector failure (for example a history query
    /// error) degrades to "no statistical signal" and never suppresses
    /// threshold findings.
    pub async fn process(
        &self,
        sample: &VitalSample,
        thresholds: &ThresholdConfig,
        history: &dyn HistoryStore,
        sink: &dyn AnomalyStore,
    ) -> AggregationOutcome {
        let (breaches, statistical) = tokio::join!(
            async { self.threshold.detect(sample.present(), thresholds) },
            self.statistical.detect(history, sample),
        );

        let mut outcome = AggregationOutcome::default();
        let findings = match statistical {
            Ok(findings) => findings,
            Err(e) => {
                warn!(
                    patient_id = %sample.patient_id,
                    error = %e,
                    "Statistical detection failed, continuing with threshold findings only"
                );
                outcome.history_failures += 1;
                Vec::new()
            }
        };

        let mut records = Vec::with_capacity(breaches.len() + findings.len());
        for breach in &breaches {
            records.push(self.record(
                sample,
                AnomalyKind::Threshold(breach.metric),
                breach.confidence(),
                breach.severity(),
                breach.description(),
                breach.recommendation(),
            ));
        }
        for finding in &findings {
            records.push(self.record(
                sample,
                AnomalyKind::Statistical(finding.metric),
                finding.confidence(),
                finding.severity(),
                finding.description(),
                finding.recommendation(),
            ));
        }

        for record in records {
            match sink.insert(&record).await {
                Ok(()) => outcome.anomalies.push(record),
                Err(e) => {
                    outcome.persistence_failures += 1;
                    warn!(
                        patient_id = %record.patient_id,
                        anomaly_type = %record.anomaly_type,
                        error = %e,
                        "Failed to persist anomaly record"
                    );
                }
            }
        }

        if !outcome.anomalies.is_empty() {
            debug!(
                patient_id = %sample.patient_id,
                count = outcome.anomalies.len(),
                failed = outcome.persistence_failures,
                "Persisted anomaly records"
            );
        }

        outcome
    }

    fn record(
        &self,
        sample: &VitalSample,
        kind: AnomalyKind,
        confidence: f64,
        severity: Severity,
        description: String,
        recommendation: &str,
    ) -> AnomalyRecord {
        AnomalyRecord {
            patient_id: sample.patient_id.clone(),
            timestamp: sample.timestamp,
            anomaly_type: kind.label(),
            kind,
            confidence,
            severity,
            description,
            recommendation: recommendation.to_string(),
            acknowledged: false,
        }
    }
}

impl Default for AnomalyAggregator {
    fn default() -> Self {
        Self::new()
    }
}
