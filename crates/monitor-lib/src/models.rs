//! Core data models for the vitals monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tracked vital-sign metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    HeartRate,
    Spo2,
    Glucose,
    BloodPressureSystolic,
    BloodPressureDiastolic,
    Temperature,
}

impl Metric {
    /// All tracked metrics, in sample-field order
    pub const ALL: [Metric; 6] = [
        Metric::HeartRate,
        Metric::Spo2,
        Metric::Glucose,
        Metric::BloodPressureSystolic,
        Metric::BloodPressureDiastolic,
        Metric::Temperature,
    ];

    /// Wire name of the metric, as used in anomaly and alert labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::HeartRate => "heart_rate",
            Metric::Spo2 => "spo2",
            Metric::Glucose => "glucose",
            Metric::BloodPressureSystolic => "blood_pressure_systolic",
            Metric::BloodPressureDiastolic => "blood_pressure_diastolic",
            Metric::Temperature => "temperature",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

/// Returned when a metric label does not name a tracked metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMetric(pub String);

impl std::fmt::Display for UnknownMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown metric: {}", self.0)
    }
}

impl std::error::Error for UnknownMetric {}

/// A single vital-sign ingestion event for one patient
///
/// Missing metrics are absent, not zero. Owned by the caller and
/// read-only to the detection pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalSample {
    pub patient_id: String,
    pub timestamp: DateTime<Utc>,
    pub heart_rate: Option<f64>,
    pub spo2: Option<f64>,
    pub glucose: Option<f64>,
    pub blood_pressure_systolic: Option<f64>,
    pub blood_pressure_diastolic: Option<f64>,
    pub temperature: Option<f64>,
}

impl VitalSample {
    /// Create an empty sample for a patient at a given instant
    pub fn new(patient_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            patient_id: patient_id.into(),
            timestamp,
            heart_rate: None,
            spo2: None,
            glucose: None,
            blood_pressure_systolic: None,
            blood_pressure_diastolic: None,
            temperature: None,
        }
    }

    /// Value of a single metric, if present in this sample
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::HeartRate => self.heart_rate,
            Metric::Spo2 => self.spo2,
            Metric::Glucose => self.glucose,
            Metric::BloodPressureSystolic => self.blood_pressure_systolic,
            Metric::BloodPressureDiastolic => self.blood_pressure_diastolic,
            Metric::Temperature => self.temperature,
        }
    }

    /// Iterate over the metrics present in this sample
    pub fn present(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        Metric::ALL
            .iter()
            .filter_map(|m| self.value(*m).map(|v| (*m, v)))
    }
}

/// Anomaly and alert severity, ordered Info < Warning < Critical
///
/// Alert gating is an ordered comparison (`severity >= Warning`), never
/// a string match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Human-readable prefix used in alert messages
    pub fn message_prefix(&self) -> &'static str {
        match self {
            Severity::Info => "Information",
            Severity::Warning => "Warning",
            Severity::Critical => "Critical Alert",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Which detector produced an anomaly
///
/// The label doubles as the alert_type and therefore as the dedup key
/// component: threshold and statistical findings for the same metric
/// deduplicate independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Threshold(Metric),
    Statistical(Metric),
}

impl AnomalyKind {
    /// The underlying metric
    pub fn metric(&self) -> Metric {
        match self {
            AnomalyKind::Threshold(m) | AnomalyKind::Statistical(m) => *m,
        }
    }

    /// Anomaly-type label: plain metric name for threshold findings,
    /// `{metric}_statistical` for statistical ones
    pub fn label(&self) -> String {
        match self {
            AnomalyKind::Threshold(m) => m.as_str().to_string(),
            AnomalyKind::Statistical(m) => format!("{}_statistical", m.as_str()),
        }
    }
}

/// A classified anomaly, always persisted whether or not it alerts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub patient_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: AnomalyKind,
    /// Anomaly-type label, denormalized from `kind` for persistence
    pub anomaly_type: String,
    /// Confidence score in [0, 1]
    pub confidence: f64,
    pub severity: Severity,
    pub description: String,
    pub recommendation: String,
    /// Set by external actors only, never by the core
    pub acknowledged: bool,
}

/// A deduplicated, notifiable escalation of anomalies for one
/// (patient, alert_type) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    pub patient_id: String,
    /// The anomaly-type label that triggered this alert
    pub alert_type: String,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Set once the notification dispatcher confirms delivery
    pub sent: bool,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

/// Per-call processing summary for upstream logging and metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub anomalies_total: usize,
    pub info: usize,
    pub warning: usize,
    pub critical: usize,
    pub persistence_failures: usize,
    pub history_failures: usize,
    pub lookup_failures: usize,
    pub alerts_created: usize,
    pub alerts_suppressed: usize,
    pub notification_failures: usize,
}

impl DetectionSummary {
    /// Count one classified anomaly
    pub fn count(&mut self, severity: Severity) {
        self.anomalies_total += 1;
        match severity {
            Severity::Info => self.info += 1,
            Severity::Warning => self.warning += 1,
            Severity::Critical => self.critical += 1,
        }
    }
}
