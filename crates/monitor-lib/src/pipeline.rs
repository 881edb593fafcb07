//! The per-sample processing pipeline
//!
//! Serializes the full detect -> aggregate -> decide sequence per
//! patient, so concurrent ingestion for one patient cannot race past
//! the dedup check or read a half-written history window. Different
//! patients proceed in parallel without coordination. Notification
//! dispatch runs after the patient lock is released; a slow or failing
//! notifier can never stall that patient's ingestion.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dashmap::{DashMap, DashSet};
use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};

use crate::aggregator::AnomalyAggregator;
use crate::alert::{AlertDecisionEngine, NotificationDispatcher};
use crate::health::{HealthRegistry, SeamFailures};
use crate::models::{AlertRecord, AnomalyRecord, DetectionSummary, VitalSample};
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::store::{AlertStore, AnomalyStore, HistoryStore};
use crate::thresholds::ThresholdBook;

/// Default bound on a single notification dispatch call
const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything one sample produced
#[derive(Debug)]
pub struct ProcessOutcome {
    /// Persisted anomaly records, threshold findings first
    pub anomalies: Vec<AnomalyRecord>,
    /// Admitted alerts, with `sent` reflecting delivery confirmation
    pub alerts: Vec<AlertRecord>,
    /// Per-call counts for upstream logging and metrics
    pub summary: DetectionSummary,
}

/// Detection and alerting pipeline over pluggable stores
pub struct VitalsPipeline {
    thresholds: Arc<ThresholdBook>,
    aggregator: AnomalyAggregator,
    engine: AlertDecisionEngine,
    history: Arc<dyn HistoryStore>,
    anomalies: Arc<dyn AnomalyStore>,
    alerts: Arc<dyn AlertStore>,
    notifier: Arc<dyn NotificationDispatcher>,
    /// One serialization point per patient, evicted when idle
    patient_locks: DashMap<String, Arc<Mutex<()>>>,
    /// Every patient seen, for the tracked-patients gauge
    patients: DashSet<String>,
    dispatch_timeout: Duration,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
}

impl VitalsPipeline {
    /// The threshold book, for installing per-patient overrides
    pub fn thresholds(&self) -> &ThresholdBook {
        &self.thresholds
    }

    /// Process one vital-sign sample end to end
    ///
    /// Detection reads and the dedup read-then-write run under the
    /// patient's lock; dispatch happens after it drops, bounded by the
    /// configured timeout per alert.
    pub async fn process(&self, sample: &VitalSample) -> ProcessOutcome {
        let start = Instant::now();
        self.patients.insert(sample.patient_id.clone());

        let lock = self
            .patient_locks
            .entry(sample.patient_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let (aggregation, decision) = {
            let _serialized = lock.lock().await;

            let thresholds = self.thresholds.effective(&sample.patient_id);
            let aggregation = self
                .aggregator
                .process(sample, &thresholds, self.history.as_ref(), self.anomalies.as_ref())
                .await;
            let decision = self
                .engine
                .evaluate(&aggregation.anomalies, self.alerts.as_ref())
                .await;
            (aggregation, decision)
        };
        let mut summary = DetectionSummary {
            persistence_failures: aggregation.persistence_failures
                + decision.persistence_failures,
            history_failures: aggregation.history_failures,
            lookup_failures: decision.lookup_failures,
            ..Default::default()
        };
        let anomalies = aggregation.anomalies;

        for anomaly in &anomalies {
            summary.count(anomaly.severity);
            self.logger.log_anomaly(
                &anomaly.patient_id,
                &anomaly.anomaly_type,
                anomaly.severity,
                anomaly.confidence,
                &anomaly.description,
            );
        }
        summary.alerts_created = decision.created.len();
        summary.alerts_suppressed = decision.suppressed;
        if decision.suppressed > 0 {
            self.logger
                .log_alert_suppressed(&sample.patient_id, decision.suppressed);
        }

        // Fire-and-continue delivery, outside the patient lock
        let mut alerts = decision.created;
        for alert in &mut alerts {
            self.logger
                .log_alert_created(&alert.patient_id, &alert.alert_type, alert.severity);
            if self.dispatch(alert).await {
                alert.sent = true;
            } else {
                summary.notification_failures += 1;
            }
        }

        if let Some(health) = &self.health {
            health
                .observe_pass(&SeamFailures {
                    history_reads: aggregation.history_failures,
                    anomaly_writes: aggregation.persistence_failures,
                    alert_reads: decision.lookup_failures,
                    alert_writes: decision.persistence_failures,
                    notifications: summary.notification_failures,
                })
                .await;
        }

        // Drop the lock entry unless another ingestion still holds it
        drop(lock);
        self.patient_locks
            .remove_if(&sample.patient_id, |_, l| Arc::strong_count(l) == 1);

        self.metrics.inc_samples_processed();
        self.metrics.set_patients_tracked(self.patients.len() as i64);
        self.metrics.record_summary(&summary);
        self.metrics
            .observe_detection_latency(start.elapsed().as_secs_f64());
        self.logger.log_summary(&sample.patient_id, &summary);

        ProcessOutcome {
            anomalies,
            alerts,
            summary,
        }
    }

    /// Deliver one alert and flag the stored record on success
    async fn dispatch(&self, alert: &AlertRecord) -> bool {
        match timeout(self.dispatch_timeout, self.notifier.deliver(alert)).await {
            Ok(Ok(())) => {
                if let Err(e) = self.alerts.mark_sent(&alert.id).await {
                    // Delivery is confirmed; only the stored flag lags
                    tracing::warn!(
                        alert_id = %alert.id,
                        error = %e,
                        "Delivered alert could not be flagged as sent"
                    );
                }
                true
            }
            Ok(Err(e)) => {
                self.logger.log_notification_failure(
                    &alert.patient_id,
                    &alert.alert_type,
                    &e.to_string(),
                );
                false
            }
            Err(_) => {
                self.logger.log_notification_failure(
                    &alert.patient_id,
                    &alert.alert_type,
                    "dispatch timed out",
                );
                false
            }
        }
    }
}

/// Builder for wiring the pipeline's collaborators
pub struct VitalsPipelineBuilder {
    thresholds: Option<Arc<ThresholdBook>>,
    aggregator: AnomalyAggregator,
    engine: AlertDecisionEngine,
    history: Option<Arc<dyn HistoryStore>>,
    anomalies: Option<Arc<dyn AnomalyStore>>,
    alerts: Option<Arc<dyn AlertStore>>,
    notifier: Option<Arc<dyn NotificationDispatcher>>,
    dispatch_timeout: Duration,
    instance_name: String,
    health: Option<HealthRegistry>,
}

impl VitalsPipelineBuilder {
    /// Create a builder with default detectors and dedup policy
    pub fn new() -> Self {
        Self {
            thresholds: None,
            aggregator: AnomalyAggregator::new(),
            engine: AlertDecisionEngine::new(),
            history: None,
            anomalies: None,
            alerts: None,
            notifier: None,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            instance_name: "vitals-monitor".to_string(),
            health: None,
        }
    }

    /// Set the threshold book (defaults to the standard ranges)
    pub fn thresholds(mut self, book: Arc<ThresholdBook>) -> Self {
        self.thresholds = Some(book);
        self
    }

    /// Set the historical-sample source
    pub fn history(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    /// Set the anomaly sink
    pub fn anomaly_store(mut self, store: Arc<dyn AnomalyStore>) -> Self {
        self.anomalies = Some(store);
        self
    }

    /// Set the alert store
    pub fn alert_store(mut self, store: Arc<dyn AlertStore>) -> Self {
        self.alerts = Some(store);
        self
    }

    /// Set the notification dispatcher
    pub fn notifier(mut self, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the per-delivery timeout
    pub fn dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Set the alert deduplication window
    pub fn dedup_window(mut self, window: chrono::Duration) -> Self {
        self.engine = self.engine.with_dedup_window(window);
        self
    }

    /// Set the statistical-baseline lookback window
    pub fn history_window(mut self, window: chrono::Duration) -> Self {
        self.aggregator = self.aggregator.with_history_window(window);
        self
    }

    /// Set the instance name used in structured log events
    pub fn instance_name(mut self, name: impl Into<String>) -> Self {
        self.instance_name = name.into();
        self
    }

    /// Report per-pass collaborator failures into a health registry
    pub fn health(mut self, registry: HealthRegistry) -> Self {
        self.health = Some(registry);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<VitalsPipeline> {
        let history = self
            .history
            .ok_or_else(|| anyhow::anyhow!("History store is required"))?;
        let anomalies = self
            .anomalies
            .ok_or_else(|| anyhow::anyhow!("Anomaly store is required"))?;
        let alerts = self
            .alerts
            .ok_or_else(|| anyhow::anyhow!("Alert store is required"))?;
        let notifier = self
            .notifier
            .ok_or_else(|| anyhow::anyhow!("Notification dispatcher is required"))?;

        Ok(VitalsPipeline {
            thresholds: self.thresholds.unwrap_or_default(),
            aggregator: self.aggregator,
            engine: self.engine,
            history,
            anomalies,
            alerts,
            notifier,
            patient_locks: DashMap::new(),
            patients: DashSet::new(),
            dispatch_timeout: self.dispatch_timeout,
            metrics: MonitorMetrics::new(),
            logger: StructuredLogger::new(self.instance_name),
            health: self.health,
        })
    }
}

impl Default for VitalsPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
