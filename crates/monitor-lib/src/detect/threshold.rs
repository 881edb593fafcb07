//! Static threshold breach detection
//!
//! Checks each metric present in a sample against the effective
//! per-patient range snapshot and reports how far outside the range the
//! value lies, as a fraction of the range width.

use crate::detect::classify;
use crate::models::{Metric, Severity};
use crate::thresholds::{ThresholdConfig, VitalRange};

/// Detects values outside the configured [min, max] range
///
/// Stateless and pure: the effective threshold snapshot is passed in
/// per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThresholdDetector;

impl ThresholdDetector {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate all present metrics against the threshold snapshot
    ///
    /// Metrics absent from the sample or from the config are skipped.
    /// Output order follows [`Metric::ALL`].
    pub fn detect(
        &self,
        values: impl Iterator<Item = (Metric, f64)>,
        thresholds: &ThresholdConfig,
    ) -> Vec<ThresholdBreach> {
        values
            .filter_map(|(metric, value)| {
                let range = thresholds.range(metric)?;
                self.check(metric, value, range)
            })
            .collect()
    }

    fn check(&self, metric: Metric, value: f64, range: VitalRange) -> Option<ThresholdBreach> {
        if range.contains(value) {
            return None;
        }

        let deviation = if value < range.min {
            (range.min - value) / range.width()
        } else {
            (value - range.max) / range.width()
        };

        Some(ThresholdBreach {
            metric,
            value,
            range,
            deviation,
        })
    }
}

/// A value outside its configured range
#[derive(Debug, Clone, Copy)]
pub struct ThresholdBreach {
    pub metric: Metric,
    pub value: f64,
    pub range: VitalRange,
    /// Normalized distance outside the range, >= 0
    pub deviation: f64,
}

impl ThresholdBreach {
    pub fn severity(&self) -> Severity {
        classify::threshold_severity(self.deviation)
    }

    pub fn confidence(&self) -> f64 {
        classify::threshold_confidence(self.deviation)
    }

    pub fn description(&self) -> String {
        classify::threshold_description(self.metric, self.value, self.range)
    }

    pub fn recommendation(&self) -> &'static str {
        classify::recommendation(self.metric, self.severity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VitalSample;
    use crate::thresholds::ThresholdBook;
    use chrono::Utc;

    fn detect_sample(sample: &VitalSample) -> Vec<ThresholdBreach> {
        let book = ThresholdBook::new();
        let config = book.effective(&sample.patient_id);
        ThresholdDetector::new().detect(sample.present(), &config)
    }

    #[test]
    fn heart_rate_180_is_critical_with_expected_deviation() {
        let mut sample = VitalSample::new("p-1", Utc::now());
        sample.heart_rate = Some(180.0);

        let breaches = detect_sample(&sample);
        assert_eq!(breaches.len(), 1);

        let breach = &breaches[0];
        assert_eq!(breach.metric, Metric::HeartRate);
        assert!((breach.deviation - 60.0 / 70.0).abs() < 1e-9);
        assert_eq!(breach.severity(), Severity::Critical);
        assert!((breach.confidence() - 0.9286).abs() < 0.001);
    }

    #[test]
    fn heart_rate_130_is_info() {
        let mut sample = VitalSample::new("p-1", Utc::now());
        sample.heart_rate = Some(130.0);

        let breaches = detect_sample(&sample);
        assert_eq!(breaches.len(), 1);
        assert!((breaches[0].deviation - 10.0 / 70.0).abs() < 1e-9);
        assert_eq!(breaches[0].severity(), Severity::Info);
    }

    #[test]
    fn value_below_range_uses_low_side_deviation() {
        let mut sample = VitalSample::new("p-1", Utc::now());
        sample.spo2 = Some(85.0);

        let breaches = detect_sample(&sample);
        assert_eq!(breaches.len(), 1);
        // (90 - 85) / 10
        assert!((breaches[0].deviation - 0.5).abs() < 1e-9);
        assert_eq!(breaches[0].severity(), Severity::Warning);
    }

    #[test]
    fn values_inside_range_produce_nothing() {
        let mut sample = VitalSample::new("p-1", Utc::now());
        sample.heart_rate = Some(72.0);
        sample.spo2 = Some(97.0);
        sample.temperature = Some(98.6);

        assert!(detect_sample(&sample).is_empty());
    }

    #[test]
    fn boundary_values_are_in_range() {
        let mut sample = VitalSample::new("p-1", Utc::now());
        sample.heart_rate = Some(120.0);
        sample.spo2 = Some(90.0);

        assert!(detect_sample(&sample).is_empty());
    }

    #[test]
    fn missing_metrics_are_skipped_not_zero() {
        let sample = VitalSample::new("p-1", Utc::now());
        assert!(detect_sample(&sample).is_empty());
    }

    #[test]
    fn metric_without_config_entry_is_skipped() {
        let book = ThresholdBook::with_defaults(
            [(Metric::HeartRate, VitalRange::new(50.0, 120.0))].into(),
        );
        let config = book.effective("p-1");

        let mut sample = VitalSample::new("p-1", Utc::now());
        sample.heart_rate = Some(72.0);
        sample.glucose = Some(500.0); // no configured range

        let breaches = ThresholdDetector::new().detect(sample.present(), &config);
        assert!(breaches.is_empty());
    }

    #[test]
    fn narrowed_override_flags_value_the_default_would_pass() {
        let book = ThresholdBook::new();
        book.set_override(
            "p-1",
            Metric::Spo2,
            crate::thresholds::RangeOverride {
                min: Some(94.0),
                max: Some(100.0),
            },
        );

        let mut sample = VitalSample::new("p-1", Utc::now());
        sample.spo2 = Some(93.0);

        let detector = ThresholdDetector::new();

        let overridden = detector.detect(sample.present(), &book.effective("p-1"));
        assert_eq!(overridden.len(), 1);
        assert_eq!(overridden[0].metric, Metric::Spo2);

        // A concurrent patient without the override is untouched
        let default = detector.detect(sample.present(), &book.effective("p-2"));
        assert!(default.is_empty());
    }

    #[test]
    fn detection_is_idempotent() {
        let mut sample = VitalSample::new("p-1", Utc::now());
        sample.heart_rate = Some(180.0);

        let first = detect_sample(&sample);
        let second = detect_sample(&sample);

        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].deviation, second[0].deviation);
        assert_eq!(first[0].severity(), second[0].severity());
        assert_eq!(first[0].confidence(), second[0].confidence());
    }
}
