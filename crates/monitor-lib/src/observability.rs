//! Observability infrastructure for the vitals monitor
//!
//! Provides:
//! - Prometheus metrics (detection latency, anomaly/alert counts,
//!   notification failures)
//! - Structured JSON logging with tracing

use prometheus::{register_histogram, register_int_gauge, Histogram, IntGauge};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::models::{DetectionSummary, Severity};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct MonitorMetricsInner {
    detection_latency_seconds: Histogram,
    samples_processed: IntGauge,
    anomalies_detected: IntGauge,
    alerts_created: IntGauge,
    alerts_suppressed: IntGauge,
    notification_failures: IntGauge,
    persistence_failures: IntGauge,
    history_query_failures: IntGauge,
    dedup_lookup_failures: IntGauge,
    patients_tracked: IntGauge,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            detection_latency_seconds: register_histogram!(
                "vitals_monitor_detection_latency_seconds",
                "Time spent in the detect/aggregate/decide sequence per sample",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register detection_latency_seconds"),

            samples_processed: register_int_gauge!(
                "vitals_monitor_samples_processed_total",
                "Total number of vital-sign samples processed"
            )
            .expect("Failed to register samples_processed"),

            anomalies_detected: register_int_gauge!(
                "vitals_monitor_anomalies_detected_total",
                "Total number of anomalies detected"
            )
            .expect("Failed to register anomalies_detected"),

            alerts_created: register_int_gauge!(
                "vitals_monitor_alerts_created_total",
                "Total number of alerts admitted by the dedup policy"
            )
            .expect("Failed to register alerts_created"),

            alerts_suppressed: register_int_gauge!(
                "vitals_monitor_alerts_suppressed_total",
                "Total number of anomalies absorbed by an open alert window"
            )
            .expect("Failed to register alerts_suppressed"),

            notification_failures: register_int_gauge!(
                "vitals_monitor_notification_failures_total",
                "Total number of failed or timed-out alert deliveries"
            )
            .expect("Failed to register notification_failures"),

            persistence_failures: register_int_gauge!(
                "vitals_monitor_persistence_failures_total",
                "Total number of anomaly or alert records lost to store failures"
            )
            .expect("Failed to register persistence_failures"),

            history_query_failures: register_int_gauge!(
                "vitals_monitor_history_query_failures_total",
                "Total number of history queries that failed, skipping statistical detection"
            )
            .expect("Failed to register history_query_failures"),

            dedup_lookup_failures: register_int_gauge!(
                "vitals_monitor_dedup_lookup_failures_total",
                "Total number of dedup lookups that failed, each skipping one anomaly"
            )
            .expect("Failed to register dedup_lookup_failures"),

            patients_tracked: register_int_gauge!(
                "vitals_monitor_patients_tracked",
                "Number of patients with pipeline state"
            )
            .expect("Failed to register patients_tracked"),
        }
    }
}

/// Monitor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record a detection latency observation
    pub fn observe_detection_latency(&self, duration_secs: f64) {
        self.inner().detection_latency_seconds.observe(duration_secs);
    }

    /// Increment the processed-samples counter
    pub fn inc_samples_processed(&self) {
        self.inner().samples_processed.inc();
    }

    /// Update the tracked-patients gauge
    pub fn set_patients_tracked(&self, count: i64) {
        self.inner().patients_tracked.set(count);
    }

    /// Fold one per-call summary into the totals
    pub fn record_summary(&self, summary: &DetectionSummary) {
        let inner = self.inner();
        inner.anomalies_detected.add(summary.anomalies_total as i64);
        inner.alerts_created.add(summary.alerts_created as i64);
        inner.alerts_suppressed.add(summary.alerts_suppressed as i64);
        inner
            .notification_failures
            .add(summary.notification_failures as i64);
        inner
            .persistence_failures
            .add(summary.persistence_failures as i64);
        inner
            .history_query_failures
            .add(summary.history_failures as i64);
        inner
            .dedup_lookup_failures
            .add(summary.lookup_failures as i64);
    }
}

/// Structured logger for pipeline events
///
/// Provides consistent JSON-formatted logging for anomalies, alerts,
/// and delivery outcomes.
#[derive(Clone)]
pub struct StructuredLogger {
    instance_name: String,
}

impl StructuredLogger {
    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
        }
    }

    /// Log a detected anomaly
    pub fn log_anomaly(
        &self,
        patient_id: &str,
        anomaly_type: &str,
        severity: Severity,
        confidence: f64,
        description: &str,
    ) {
        if severity >= Severity::Critical {
            warn!(
                event = "anomaly_detected",
                instance = %self.instance_name,
                patient_id = %patient_id,
                anomaly_type = %anomaly_type,
                severity = %severity,
                confidence = confidence,
                description = %description,
                "Critical anomaly detected"
            );
        } else {
            info!(
                event = "anomaly_detected",
                instance = %self.instance_name,
                patient_id = %patient_id,
                anomaly_type = %anomaly_type,
                severity = %severity,
                confidence = confidence,
                description = %description,
                "Anomaly detected"
            );
        }
    }

    /// Log an admitted alert
    pub fn log_alert_created(&self, patient_id: &str, alert_type: &str, severity: Severity) {
        info!(
            event = "alert_created",
            instance = %self.instance_name,
            patient_id = %patient_id,
            alert_type = %alert_type,
            severity = %severity,
            "Alert created"
        );
    }

    /// Log anomalies absorbed by an open alert window
    pub fn log_alert_suppressed(&self, patient_id: &str, suppressed: usize) {
        info!(
            event = "alert_suppressed",
            instance = %self.instance_name,
            patient_id = %patient_id,
            suppressed = suppressed,
            "Anomalies absorbed by open alert window"
        );
    }

    /// Log a failed or timed-out delivery
    pub fn log_notification_failure(&self, patient_id: &str, alert_type: &str, reason: &str) {
        warn!(
            event = "notification_failed",
            instance = %self.instance_name,
            patient_id = %patient_id,
            alert_type = %alert_type,
            reason = %reason,
            "Alert notification failed, record kept unsent"
        );
    }

    /// Log the per-sample processing summary
    pub fn log_summary(&self, patient_id: &str, summary: &DetectionSummary) {
        info!(
            event = "sample_processed",
            instance = %self.instance_name,
            patient_id = %patient_id,
            anomalies = summary.anomalies_total,
            info = summary.info,
            warning = summary.warning,
            critical = summary.critical,
            alerts_created = summary.alerts_created,
            alerts_suppressed = summary.alerts_suppressed,
            notification_failures = summary.notification_failures,
            persistence_failures = summary.persistence_failures,
            history_failures = summary.history_failures,
            lookup_failures = summary.lookup_failures,
            "Sample processed"
        );
    }

    /// Log monitor startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "monitor_started",
            instance = %self.instance_name,
            version = %version,
            "Vitals monitor started"
        );
    }

    /// Log monitor shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            instance = %self.instance_name,
            reason = %reason,
            "Vitals monitor shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_metrics_creation() {
        // Metrics live in the process-global Prometheus registry, so we
        // only verify the handle can record observations.
        let metrics = MonitorMetrics::new();

        metrics.observe_detection_latency(0.001);
        metrics.inc_samples_processed();
        metrics.set_patients_tracked(3);

        let mut summary = DetectionSummary::default();
        summary.count(Severity::Warning);
        summary.alerts_created = 1;
        metrics.record_summary(&summary);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance_name, "test-instance");
    }
}
