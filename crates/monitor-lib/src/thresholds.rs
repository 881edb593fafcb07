//! Threshold configuration with per-patient overrides
//!
//! The default ranges are process-wide and immutable. Per-patient
//! overrides are held in a concurrent map keyed by (patient, metric);
//! every detection call computes a fresh request-scoped snapshot, so
//! concurrent patients can never observe each other's overrides.

use std::collections::HashMap;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::models::Metric;

/// Inclusive normal range for a single metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalRange {
    pub min: f64,
    pub max: f64,
}

impl VitalRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Width of the normal range
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Partial per-patient override for one metric
///
/// A `None` side leaves the default's bound in place for that side only.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RangeOverride {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeOverride {
    /// Apply this override on top of a default range
    fn apply(&self, base: VitalRange) -> VitalRange {
        VitalRange {
            min: self.min.unwrap_or(base.min),
            max: self.max.unwrap_or(base.max),
        }
    }
}

/// Immutable, request-scoped effective threshold map
///
/// Built fresh per detection call by [`ThresholdBook::effective`].
#[derive(Debug, Clone)]
pub struct ThresholdConfig {
    ranges: HashMap<Metric, VitalRange>,
}

impl ThresholdConfig {
    /// Effective range for a metric, if configured
    pub fn range(&self, metric: Metric) -> Option<VitalRange> {
        self.ranges.get(&metric).copied()
    }
}

/// Default ranges plus per-(patient, metric) overrides
pub struct ThresholdBook {
    defaults: HashMap<Metric, VitalRange>,
    overrides: DashMap<(String, Metric), RangeOverride>,
}

impl ThresholdBook {
    /// Create a book with the standard default ranges
    pub fn new() -> Self {
        Self {
            defaults: default_ranges(),
            overrides: DashMap::new(),
        }
    }

    /// Create a book with custom default ranges
    pub fn with_defaults(defaults: HashMap<Metric, VitalRange>) -> Self {
        Self {
            defaults,
            overrides: DashMap::new(),
        }
    }

    /// Install or replace the override for one (patient, metric)
    pub fn set_override(&self, patient_id: &str, metric: Metric, ovr: RangeOverride) {
        self.overrides
            .insert((patient_id.to_string(), metric), ovr);
    }

    /// Remove the override for one (patient, metric)
    pub fn clear_override(&self, patient_id: &str, metric: Metric) {
        self.overrides.remove(&(patient_id.to_string(), metric));
    }

    /// Compute the effective threshold snapshot for a patient
    ///
    /// The defaults are copied, never mutated, so concurrent calls for
    /// different patients are isolated.
    pub fn effective(&self, patient_id: &str) -> ThresholdConfig {
        let mut ranges = self.defaults.clone();
        for metric in Metric::ALL {
            if let Some(ovr) = self.overrides.get(&(patient_id.to_string(), metric)) {
                if let Some(base) = ranges.get(&metric).copied() {
                    ranges.insert(metric, ovr.apply(base));
                }
            }
        }
        ThresholdConfig { ranges }
    }
}

impl Default for ThresholdBook {
    fn default() -> Self {
        Self::new()
    }
}

/// Standard default ranges for all tracked metrics
pub fn default_ranges() -> HashMap<Metric, VitalRange> {
    HashMap::from([
        (Metric::HeartRate, VitalRange::new(50.0, 120.0)),
        (Metric::Spo2, VitalRange::new(90.0, 100.0)),
        (Metric::Glucose, VitalRange::new(70.0, 200.0)),
        (Metric::BloodPressureSystolic, VitalRange::new(90.0, 140.0)),
        (Metric::BloodPressureDiastolic, VitalRange::new(60.0, 90.0)),
        (Metric::Temperature, VitalRange::new(97.0, 99.5)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_without_overrides_matches_defaults() {
        let book = ThresholdBook::new();
        let config = book.effective("p-1");

        let range = config.range(Metric::HeartRate).unwrap();
        assert_eq!(range.min, 50.0);
        assert_eq!(range.max, 120.0);
    }

    #[test]
    fn override_replaces_bounds_for_that_patient_only() {
        let book = ThresholdBook::new();
        book.set_override(
            "p-1",
            Metric::Spo2,
            RangeOverride {
                min: Some(94.0),
                max: Some(100.0),
            },
        );

        let narrowed = book.effective("p-1").range(Metric::Spo2).unwrap();
        assert_eq!(narrowed.min, 94.0);
        assert!(!narrowed.contains(93.0));

        // Another patient still sees the default range
        let default = book.effective("p-2").range(Metric::Spo2).unwrap();
        assert_eq!(default.min, 90.0);
        assert!(default.contains(93.0));
    }

    #[test]
    fn partial_override_keeps_default_on_missing_side() {
        let book = ThresholdBook::new();
        book.set_override(
            "p-1",
            Metric::Glucose,
            RangeOverride {
                min: None,
                max: Some(160.0),
            },
        );

        let range = book.effective("p-1").range(Metric::Glucose).unwrap();
        assert_eq!(range.min, 70.0);
        assert_eq!(range.max, 160.0);
    }

    #[test]
    fn snapshots_are_isolated_from_later_override_changes() {
        let book = ThresholdBook::new();
        let before = book.effective("p-1");

        book.set_override(
            "p-1",
            Metric::HeartRate,
            RangeOverride {
                min: Some(60.0),
                max: None,
            },
        );

        // The earlier snapshot is unaffected
        assert_eq!(before.range(Metric::HeartRate).unwrap().min, 50.0);
        assert_eq!(book.effective("p-1").range(Metric::HeartRate).unwrap().min, 60.0);
    }

    #[test]
    fn clear_override_restores_defaults() {
        let book = ThresholdBook::new();
        book.set_override(
            "p-1",
            Metric::Temperature,
            RangeOverride {
                min: Some(96.0),
                max: None,
            },
        );
        book.clear_override("p-1", Metric::Temperature);

        let range = book.effective("p-1").range(Metric::Temperature).unwrap();
        assert_eq!(range.min, 97.0);
    }
}
