//! Shared severity and confidence scoring
//!
//! Pure functions of (metric, deviation) used by both detectors, so a
//! threshold breach and a statistical deviation of equal weight land in
//! the same severity band. Description and recommendation text is
//! deterministic for given inputs; tests assert exact strings.

use crate::models::{Metric, Severity};
use crate::thresholds::VitalRange;

/// Recommendation for anomaly labels that name no tracked metric
pub const GENERIC_RECOMMENDATION: &str = "Monitor closely and consult healthcare provider";

/// Severity band for a threshold breach, by deviation fraction
///
/// The deviation fraction is the normalized distance outside the
/// range, always >= 0 by construction.
pub fn threshold_severity(deviation: f64) -> Severity {
    if deviation > 0.5 {
        Severity::Critical
    } else if deviation > 0.2 {
        Severity::Warning
    } else {
        Severity::Info
    }
}

/// Confidence for a threshold breach: grows with deviation, capped at 0.99
pub fn threshold_confidence(deviation: f64) -> f64 {
    (0.5 + deviation * 0.5).min(0.99)
}

/// Severity band for a statistical deviation, by absolute z-score
///
/// The detector only emits above 2.5, so a z of exactly 2.5 is Warning
/// by convention.
pub fn statistical_severity(z_score: f64) -> Severity {
    if z_score > 3.0 {
        Severity::Critical
    } else {
        Severity::Warning
    }
}

/// Confidence for a statistical deviation, capped at 0.99
pub fn statistical_confidence(z_score: f64) -> f64 {
    (z_score / 3.0).min(0.99)
}

/// Human-readable description of a threshold breach
pub fn threshold_description(metric: Metric, value: f64, range: VitalRange) -> String {
    if value < range.min {
        format!(
            "{} is {:.1} units below normal range (normal: {}-{})",
            metric,
            range.min - value,
            range.min,
            range.max
        )
    } else {
        format!(
            "{} is {:.1} units above normal range (normal: {}-{})",
            metric,
            value - range.max,
            range.min,
            range.max
        )
    }
}

/// Human-readable description of a statistical deviation
pub fn statistical_description(metric: Metric, value: f64, z_score: f64, mean: f64) -> String {
    format!(
        "Statistical anomaly detected in {}. Z-score: {:.2}, Current: {:.1}, Mean: {:.1}",
        metric, z_score, value, mean
    )
}

/// Recommendation text for a tracked metric at a given severity
pub fn recommendation(metric: Metric, severity: Severity) -> &'static str {
    use Metric::*;
    use Severity::*;

    match (metric, severity) {
        (HeartRate, Info) => "Monitor heart rate closely",
        (HeartRate, Warning) => "Consider immediate medical attention",
        (HeartRate, Critical) => "Seek immediate medical attention",
        (Spo2, Info) => "Monitor oxygen saturation",
        (Spo2, Warning) => "Check oxygen levels and breathing",
        (Spo2, Critical) => "Immediate medical attention required - low oxygen",
        (Glucose, Info) => "Monitor blood glucose levels",
        (Glucose, Warning) => "Check blood sugar and consider medication adjustment",
        (Glucose, Critical) => "Immediate medical attention required - blood sugar emergency",
        (BloodPressureSystolic | BloodPressureDiastolic, Info) => "Monitor blood pressure",
        (BloodPressureSystolic | BloodPressureDiastolic, Warning) => {
            "Consider blood pressure medication review"
        }
        (BloodPressureSystolic | BloodPressureDiastolic, Critical) => {
            "Immediate medical attention required - blood pressure emergency"
        }
        (Temperature, Info) => "Monitor body temperature",
        (Temperature, Warning) => "Check for fever or hypothermia",
        (Temperature, Critical) => "Immediate medical attention required - temperature emergency",
    }
}

/// Recommendation lookup by label; unknown labels get the generic text
pub fn recommendation_for_label(label: &str, severity: Severity) -> &'static str {
    match label.parse::<Metric>() {
        Ok(metric) => recommendation(metric, severity),
        Err(_) => GENERIC_RECOMMENDATION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_severity_bands() {
        assert_eq!(threshold_severity(0.857), Severity::Critical);
        assert_eq!(threshold_severity(0.5), Severity::Warning);
        assert_eq!(threshold_severity(0.21), Severity::Warning);
        assert_eq!(threshold_severity(0.2), Severity::Info);
        assert_eq!(threshold_severity(0.143), Severity::Info);
    }

    #[test]
    fn threshold_confidence_grows_and_caps() {
        // hr=180 against 50-120: d = 60/70
        let d = 60.0 / 70.0;
        assert!((threshold_confidence(d) - 0.9286).abs() < 0.001);
        assert_eq!(threshold_confidence(2.0), 0.99);
    }

    #[test]
    fn statistical_severity_bands() {
        assert_eq!(statistical_severity(3.5), Severity::Critical);
        assert_eq!(statistical_severity(3.0), Severity::Warning);
        assert_eq!(statistical_severity(2.5), Severity::Warning);
    }

    #[test]
    fn statistical_confidence_caps_at_099() {
        assert!((statistical_confidence(2.7) - 0.9).abs() < 1e-9);
        assert_eq!(statistical_confidence(3.5), 0.99);
    }

    #[test]
    fn descriptions_are_exact() {
        let range = VitalRange::new(50.0, 120.0);
        assert_eq!(
            threshold_description(Metric::HeartRate, 180.0, range),
            "heart_rate is 60.0 units above normal range (normal: 50-120)"
        );
        assert_eq!(
            threshold_description(Metric::HeartRate, 45.0, range),
            "heart_rate is 5.0 units below normal range (normal: 50-120)"
        );
        assert_eq!(
            statistical_description(Metric::HeartRate, 110.0, 3.5, 75.0),
            "Statistical anomaly detected in heart_rate. Z-score: 3.50, Current: 110.0, Mean: 75.0"
        );
    }

    #[test]
    fn fractional_bounds_format_without_trailing_zeros() {
        let range = VitalRange::new(97.0, 99.5);
        assert_eq!(
            threshold_description(Metric::Temperature, 101.2, range),
            "temperature is 1.7 units above normal range (normal: 97-99.5)"
        );
    }

    #[test]
    fn recommendation_is_metric_and_severity_specific() {
        assert_eq!(
            recommendation(Metric::HeartRate, Severity::Critical),
            "Seek immediate medical attention"
        );
        assert_eq!(
            recommendation(Metric::Spo2, Severity::Warning),
            "Check oxygen levels and breathing"
        );
        assert_eq!(
            recommendation(Metric::BloodPressureDiastolic, Severity::Info),
            "Monitor blood pressure"
        );
    }

    #[test]
    fn unknown_label_falls_back_to_generic() {
        assert_eq!(
            recommendation_for_label("respiration_rate", Severity::Warning),
            GENERIC_RECOMMENDATION
        );
        assert_eq!(
            recommendation_for_label("heart_rate", Severity::Info),
            "Monitor heart rate closely"
        );
    }
}
