//! Statistical deviation detection
//!
//! Compares each present metric against the patient's own trailing
//! history using a z-score test. Too little history is not an error,
//! just "no signal": the detector stays quiet until a patient has
//! enough readings to make the statistics meaningful.

use chrono::Duration;

use crate::detect::classify;
use crate::error::StoreError;
use crate::models::{Metric, Severity, VitalSample};
use crate::store::HistoryStore;

/// Default trailing history window (7 days)
const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Minimum historical readings for a patient before any detection
const MIN_PATIENT_SAMPLES: usize = 10;

/// Minimum non-missing historical values per metric
const MIN_METRIC_SAMPLES: usize = 5;

/// Z-score above which a deviation is anomalous
const DEFAULT_Z_THRESHOLD: f64 = 2.5;

/// Detects per-patient statistical deviations via z-score
pub struct StatisticalDetector {
    /// Absolute z-score required to emit a finding
    pub z_threshold: f64,
    /// Trailing history window
    pub window: Duration,
}

impl StatisticalDetector {
    pub fn new(z_threshold: f64) -> Self {
        Self {
            z_threshold,
            window: Duration::days(DEFAULT_WINDOW_DAYS),
        }
    }

    /// Set a custom history window
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Evaluate a sample against the patient's trailing history
    ///
    /// Returns an empty list when the patient has fewer than 10
    /// historical readings in the window. Metrics with fewer than 5
    /// non-missing historical values, or with zero variation, are
    /// skipped individually.
    pub async fn detect(
        &self,
        history: &dyn HistoryStore,
        sample: &VitalSample,
    ) -> Result<Vec<StatisticalFinding>, StoreError> {
        let since = sample.timestamp - self.window;
        let rows = history
            .samples(&sample.patient_id, since, sample.timestamp)
            .await?;

        if rows.len() < MIN_PATIENT_SAMPLES {
            return Ok(Vec::new());
        }

        let mut findings = Vec::new();
        for (metric, value) in sample.present() {
            let values: Vec<f64> = rows.iter().filter_map(|s| s.value(metric)).collect();
            if values.len() < MIN_METRIC_SAMPLES {
                continue;
            }

            let (mean, std_dev) = mean_and_std(&values);
            if std_dev < f64::EPSILON {
                // No variation, no meaningful z-score
                continue;
            }

            let z_score = ((value - mean) / std_dev).abs();
            if z_score > self.z_threshold {
                findings.push(StatisticalFinding {
                    metric,
                    value,
                    mean,
                    std_dev,
                    z_score,
                });
            }
        }

        Ok(findings)
    }
}

impl Default for StatisticalDetector {
    fn default() -> Self {
        Self::new(DEFAULT_Z_THRESHOLD)
    }
}

/// Sample mean and sample standard deviation (Bessel's correction)
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    if values.len() < 2 {
        return (mean, 0.0);
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}

/// A metric deviating from the patient's own recent baseline
#[derive(Debug, Clone, Copy)]
pub struct StatisticalFinding {
    pub metric: Metric,
    pub value: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Absolute z-score of the current value
    pub z_score: f64,
}

impl StatisticalFinding {
    pub fn severity(&self) -> Severity {
        classify::statistical_severity(self.z_score)
    }

    pub fn confidence(&self) -> f64 {
        classify::statistical_confidence(self.z_score)
    }

    pub fn description(&self) -> String {
        classify::statistical_description(self.metric, self.value, self.z_score, self.mean)
    }

    pub fn recommendation(&self) -> &'static str {
        classify::recommendation(self.metric, self.severity())
    }
}
