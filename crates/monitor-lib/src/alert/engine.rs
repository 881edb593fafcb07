//! Alert deduplication state machine
//!
//! Per (patient, alert_type) key the machine is either quiescent or
//! suppressed until one hour after the last raised alert. The state is
//! the most recent persisted AlertRecord itself, read through the
//! AlertStore seam and conditionally written back, so the caller can
//! make the read-then-write atomic with a single per-patient boundary.

use chrono::Duration;
use tracing::{debug, warn};

use crate::models::{AlertRecord, AnomalyRecord, Severity};
use crate::store::AlertStore;

/// Default deduplication window (1 hour)
const DEFAULT_DEDUP_WINDOW_SECS: i64 = 60 * 60;

/// Decides which anomalies escalate to new alerts
pub struct AlertDecisionEngine {
    /// Suppression window after a raised alert
    pub dedup_window: Duration,
}

/// Outcome of one evaluation pass
#[derive(Debug, Default)]
pub struct AlertDecision {
    /// Newly created and persisted alerts, in anomaly order, pending
    /// notification dispatch
    pub created: Vec<AlertRecord>,
    /// Anomalies absorbed by an open alert window
    pub suppressed: usize,
    /// Alerts lost to store write failures (no dispatch for those)
    pub persistence_failures: usize,
    /// Dedup lookups that failed, each skipping one anomaly
    pub lookup_failures: usize,
}

impl AlertDecisionEngine {
    pub fn new() -> Self {
        Self {
            dedup_window: Duration::seconds(DEFAULT_DEDUP_WINDOW_SECS),
        }
    }

    /// Set a custom deduplication window
    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    /// Evaluate a batch of persisted anomalies against the dedup state
    ///
    /// Info anomalies never create or extend an alert. For each
    /// anomaly at Warning or above, the most recent alert for the same
    /// (patient, alert_type) decides: absent or at least one window
    /// old, a fresh alert is created and persisted; otherwise the
    /// anomaly is absorbed silently.
    pub async fn evaluate(
        &self,
        anomalies: &[AnomalyRecord],
        store: &dyn AlertStore,
    ) -> AlertDecision {
        let mut decision = AlertDecision::default();

        for anomaly in anomalies {
            if anomaly.severity < Severity::Warning {
                continue;
            }

            let last = match store
                .last_alert(&anomaly.patient_id, &anomaly.anomaly_type)
                .await
            {
                Ok(last) => last,
                Err(e) => {
                    // Without the dedup lookup a write could storm;
                    // skip this anomaly and leave the record trail to
                    // the anomaly store.
                    warn!(
                        patient_id = %anomaly.patient_id,
                        alert_type = %anomaly.anomaly_type,
                        error = %e,
                        "Dedup lookup failed, not raising an alert"
                    );
                    decision.lookup_failures += 1;
                    continue;
                }
            };

            let window_open = last
                .as_ref()
                .map(|l| anomaly.timestamp - l.timestamp < self.dedup_window)
                .unwrap_or(false);

            if window_open {
                decision.suppressed += 1;
                debug!(
                    patient_id = %anomaly.patient_id,
                    alert_type = %anomaly.anomaly_type,
                    "Anomaly absorbed by open alert window"
                );
                continue;
            }

            let alert = self.build_alert(anomaly);
            match store.insert(&alert).await {
                Ok(()) => decision.created.push(alert),
                Err(e) => {
                    decision.persistence_failures += 1;
                    warn!(
                        patient_id = %alert.patient_id,
                        alert_type = %alert.alert_type,
                        error = %e,
                        "Failed to persist alert record"
                    );
                }
            }
        }

        decision
    }

    fn build_alert(&self, anomaly: &AnomalyRecord) -> AlertRecord {
        let mut message = format!(
            "{}: {}",
            anomaly.severity.message_prefix(),
            anomaly.description
        );
        if !anomaly.recommendation.is_empty() {
            message.push_str(&format!(" Recommendation: {}", anomaly.recommendation));
        }

        AlertRecord {
            id: alert_id(),
            patient_id: anomaly.patient_id.clone(),
            alert_type: anomaly.anomaly_type.clone(),
            severity: anomaly.severity,
            message,
            timestamp: anomaly.timestamp,
            sent: false,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }
}

impl Default for AlertDecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a simple unique id for alert records
fn alert_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}{:x}-{:x}", now.as_secs(), now.subsec_nanos(), seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::{AnomalyKind, Metric};
    use crate::store::{async_trait, InMemoryAlertStore};
    use chrono::{DateTime, Utc};

    /// Alert store that rejects writes for a configured alert type
    struct RejectingAlertStore {
        reject_type: String,
        inner: InMemoryAlertStore,
    }

    #[async_trait]
    impl AlertStore for RejectingAlertStore {
        async fn last_alert(
            &self,
            patient_id: &str,
            alert_type: &str,
        ) -> Result<Option<AlertRecord>, StoreError> {
            self.inner.last_alert(patient_id, alert_type).await
        }

        async fn insert(&self, alert: &AlertRecord) -> Result<(), StoreError> {
            if alert.alert_type == self.reject_type {
                return Err(StoreError::Backend("disk full".to_string()));
            }
            self.inner.insert(alert).await
        }

        async fn mark_sent(&self, alert_id: &str) -> Result<(), StoreError> {
            self.inner.mark_sent(alert_id).await
        }
    }

    /// Alert store whose dedup lookups always fail
    struct UnreadableAlertStore;

    #[async_trait]
    impl AlertStore for UnreadableAlertStore {
        async fn last_alert(
            &self,
            _patient_id: &str,
            _alert_type: &str,
        ) -> Result<Option<AlertRecord>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        async fn insert(&self, _alert: &AlertRecord) -> Result<(), StoreError> {
            Ok(())
        }

        async fn mark_sent(&self, _alert_id: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn anomaly(
        patient: &str,
        kind: AnomalyKind,
        severity: Severity,
        ts: DateTime<Utc>,
    ) -> AnomalyRecord {
        AnomalyRecord {
            patient_id: patient.to_string(),
            timestamp: ts,
            anomaly_type: kind.label(),
            kind,
            confidence: 0.9,
            severity,
            description: "heart_rate is 60.0 units above normal range (normal: 50-120)"
                .to_string(),
            recommendation: "Seek immediate medical attention".to_string(),
            acknowledged: false,
        }
    }

    #[tokio::test]
    async fn warning_anomaly_creates_alert_with_composed_message() {
        let store = InMemoryAlertStore::new();
        let engine = AlertDecisionEngine::new();
        let now = Utc::now();

        let a = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Critical,
            now,
        );
        let decision = engine.evaluate(&[a], &store).await;

        assert_eq!(decision.created.len(), 1);
        assert_eq!(decision.suppressed, 0);

        let alert = &decision.created[0];
        assert_eq!(alert.alert_type, "heart_rate");
        assert_eq!(alert.severity, Severity::Critical);
        assert!(!alert.sent);
        assert_eq!(
            alert.message,
            "Critical Alert: heart_rate is 60.0 units above normal range (normal: 50-120) \
             Recommendation: Seek immediate medical attention"
        );

        assert_eq!(store.for_patient("p-1").len(), 1);
    }

    #[tokio::test]
    async fn info_anomalies_never_create_alerts() {
        let store = InMemoryAlertStore::new();
        let engine = AlertDecisionEngine::new();

        let a = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Info,
            Utc::now(),
        );
        let decision = engine.evaluate(&[a], &store).await;

        assert!(decision.created.is_empty());
        assert_eq!(decision.suppressed, 0);
        assert!(store.for_patient("p-1").is_empty());
    }

    #[tokio::test]
    async fn second_anomaly_within_window_is_absorbed() {
        let store = InMemoryAlertStore::new();
        let engine = AlertDecisionEngine::new();
        let now = Utc::now();

        let first = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Warning,
            now,
        );
        let second = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Warning,
            now + Duration::minutes(10),
        );

        let d1 = engine.evaluate(&[first], &store).await;
        let d2 = engine.evaluate(&[second], &store).await;

        assert_eq!(d1.created.len(), 1);
        assert!(d2.created.is_empty());
        assert_eq!(d2.suppressed, 1);
        assert_eq!(store.for_patient("p-1").len(), 1);
    }

    #[tokio::test]
    async fn window_expiry_admits_a_new_alert() {
        let store = InMemoryAlertStore::new();
        let engine = AlertDecisionEngine::new();
        let now = Utc::now();

        let first = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Warning,
            now,
        );
        let later = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Warning,
            now + Duration::minutes(90),
        );

        engine.evaluate(&[first], &store).await;
        let d2 = engine.evaluate(&[later], &store).await;

        assert_eq!(d2.created.len(), 1);
        assert_eq!(store.for_patient("p-1").len(), 2);
    }

    #[tokio::test]
    async fn dedup_window_expires_after_one_hour() {
        let store = InMemoryAlertStore::new();
        let engine = AlertDecisionEngine::new();
        let now = Utc::now();

        let first = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Warning,
            now,
        );
        let at_boundary = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Warning,
            now + Duration::hours(1),
        );

        engine.evaluate(&[first], &store).await;
        // Exactly one hour old: the window is open-ended, a new alert
        // is admitted
        let d2 = engine.evaluate(&[at_boundary], &store).await;

        assert_eq!(d2.created.len(), 1);
    }

    #[tokio::test]
    async fn independent_dedup_keys_for_threshold_and_statistical() {
        let store = InMemoryAlertStore::new();
        let engine = AlertDecisionEngine::new();
        let now = Utc::now();

        let threshold = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Warning,
            now,
        );
        let statistical = anomaly(
            "p-1",
            AnomalyKind::Statistical(Metric::HeartRate),
            Severity::Warning,
            now + Duration::minutes(1),
        );

        let d1 = engine.evaluate(&[threshold], &store).await;
        let d2 = engine.evaluate(&[statistical], &store).await;

        // Same metric, different detectors: both alert
        assert_eq!(d1.created.len(), 1);
        assert_eq!(d2.created.len(), 1);
        assert_eq!(d2.suppressed, 0);
    }

    #[tokio::test]
    async fn different_patients_do_not_share_windows() {
        let store = InMemoryAlertStore::new();
        let engine = AlertDecisionEngine::new();
        let now = Utc::now();

        let a = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Warning,
            now,
        );
        let b = anomaly(
            "p-2",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Warning,
            now + Duration::minutes(5),
        );

        engine.evaluate(&[a], &store).await;
        let d2 = engine.evaluate(&[b], &store).await;

        assert_eq!(d2.created.len(), 1);
    }

    #[tokio::test]
    async fn dedup_applies_within_a_single_batch() {
        let store = InMemoryAlertStore::new();
        let engine = AlertDecisionEngine::new();
        let now = Utc::now();

        let first = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Warning,
            now,
        );
        let second = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Critical,
            now + Duration::minutes(2),
        );

        let decision = engine.evaluate(&[first, second], &store).await;

        assert_eq!(decision.created.len(), 1);
        assert_eq!(decision.suppressed, 1);
    }

    #[tokio::test]
    async fn anomaly_without_recommendation_omits_suffix() {
        let store = InMemoryAlertStore::new();
        let engine = AlertDecisionEngine::new();

        let mut a = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Warning,
            Utc::now(),
        );
        a.recommendation = String::new();

        let decision = engine.evaluate(&[a], &store).await;
        assert!(!decision.created[0].message.contains("Recommendation:"));
    }

    #[tokio::test]
    async fn persistence_failure_drops_one_alert_without_blocking_siblings() {
        let store = RejectingAlertStore {
            reject_type: "heart_rate".to_string(),
            inner: InMemoryAlertStore::new(),
        };
        let engine = AlertDecisionEngine::new();
        let now = Utc::now();

        let lost = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Critical,
            now,
        );
        let sibling = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::Spo2),
            Severity::Warning,
            now,
        );

        let decision = engine.evaluate(&[lost, sibling], &store).await;

        assert_eq!(decision.persistence_failures, 1);
        assert_eq!(decision.lookup_failures, 0);
        assert_eq!(decision.created.len(), 1);
        assert_eq!(decision.created[0].alert_type, "spo2");
        assert_eq!(store.inner.for_patient("p-1").len(), 1);
    }

    #[tokio::test]
    async fn lookup_failure_skips_anomaly_without_writing() {
        let engine = AlertDecisionEngine::new();

        let a = anomaly(
            "p-1",
            AnomalyKind::Threshold(Metric::HeartRate),
            Severity::Critical,
            Utc::now(),
        );
        let decision = engine.evaluate(&[a], &UnreadableAlertStore).await;

        assert!(decision.created.is_empty());
        assert_eq!(decision.lookup_failures, 1);
        assert_eq!(decision.persistence_failures, 0);
    }

    #[test]
    fn alert_ids_are_unique() {
        let ids: Vec<String> = (0..100).map(|_| alert_id()).collect();
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }
}
