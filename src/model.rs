//! Data models for Vitalgate.
//!
//! # Failure Model
//!
//! All types in this module are plain value types with **total** mappings:
//!
//! - Every [`MetricType`] maps to exactly one [`Unit`]; there is no open
//!   string-keyed lookup anywhere in the crate.
//! - Every [`Period`] resolves to a concrete instant (see [`crate::period`]).
//!
//! Nothing here performs I/O or can fail. Query failures are handled further
//! up the stack by collapsing to zero values ("metrics are best-effort").

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A symbolic reporting period requested by the caller.
///
/// Periods are resolved to concrete instants by [`crate::period::resolve`],
/// always relative to a `now` supplied by the caller. The `Past*` variants are
/// fixed-duration offsets (exact multiples of 86 400 seconds), while the
/// `Current*` variants snap to calendar boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// From the start of the current calendar day.
    Today,
    /// The last 24 hours, exactly.
    PastDay,
    /// The last 7 * 24 hours, exactly.
    PastWeek,
    /// From the first day of the week containing now.
    CurrentWeek,
    /// The last 30 * 24 hours, exactly.
    PastMonth,
    /// From the first day of the current month.
    CurrentMonth,
    /// The last 365 * 24 hours, exactly.
    PastYear,
    /// From "day zero" of the current month, i.e. the last day of the
    /// previous month. A preserved quirk of the system this replaces.
    CurrentYear,
    /// From the first day of the current month. Not a true epoch; a known
    /// limitation carried forward deliberately.
    AllTime,
    /// From the start of **today**, not yesterday. A second preserved quirk.
    Yesterday,
}

/// A concrete half-open query window `[start, end)`.
///
/// Windows are produced fresh for every query and never persisted. `start` is
/// normally at or before `end`, but the period quirks above are not corrected
/// to force that; consumers take the absolute elapsed time where it matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive start of the window.
    pub start: DateTime<Utc>,

    /// Exclusive end of the window.
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window covering `[start, end)`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whether a sample spanning `[sample_start, sample_end]` lies strictly
    /// inside this window (both endpoints contained).
    pub fn encloses(&self, sample_start: DateTime<Utc>, sample_end: DateTime<Utc>) -> bool {
        sample_start >= self.start && sample_end <= self.end
    }

    /// Elapsed seconds between start and end, as an absolute value so a
    /// window whose start resolved past its end does not invert sign.
    pub fn elapsed_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds().abs()
    }
}

/// The closed set of metrics this crate reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// Steps taken.
    StepCount,
    /// Walking/running distance.
    Distance,
    /// Energy burned through activity.
    ActiveEnergy,
    /// Resting energy burned.
    BasalEnergy,
    /// Energy consumed as food.
    DietaryEnergy,
    /// Body height.
    Height,
    /// Body mass.
    BodyMass,
}

impl MetricType {
    /// The canonical measurement unit for this metric.
    ///
    /// This mapping is fixed and total. The match is exhaustive on purpose:
    /// adding a metric without deciding its unit must not compile. The three
    /// energy metrics share kilocalories.
    pub fn unit(self) -> Unit {
        match self {
            MetricType::StepCount => Unit::Count,
            MetricType::Distance => Unit::Meters,
            MetricType::ActiveEnergy | MetricType::BasalEnergy | MetricType::DietaryEnergy => {
                Unit::Kilocalories
            }
            MetricType::Height => Unit::Centimeters,
            MetricType::BodyMass => Unit::Kilograms,
        }
    }
}

/// Measurement units for the closed metric set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Dimensionless count (steps).
    Count,
    /// Meters.
    Meters,
    /// Kilocalories.
    Kilocalories,
    /// Centimeters.
    Centimeters,
    /// Kilograms.
    Kilograms,
}

impl Unit {
    /// Short display symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Count => "count",
            Unit::Meters => "m",
            Unit::Kilocalories => "kcal",
            Unit::Centimeters => "cm",
            Unit::Kilograms => "kg",
        }
    }
}

/// Biological sex as recorded in the underlying store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiologicalSex {
    /// Not recorded or not disclosed.
    #[default]
    Unknown,
    Male,
    Female,
}

/// Authorization scopes understood by the underlying store.
///
/// Quantity capabilities correspond one-to-one with [`MetricType`];
/// `DateOfBirth` and `BiologicalSex` are read-only characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    StepCount,
    Distance,
    ActiveEnergy,
    BasalEnergy,
    DietaryEnergy,
    Height,
    BodyMass,
    DateOfBirth,
    BiologicalSex,
}

/// A transient snapshot of the user's body metrics.
///
/// Assembled from four independent lookups (see [`crate::energy`]) and
/// discarded after use; never persisted by this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UserProfile {
    /// Height in centimeters; 0.0 when unknown.
    pub height_cm: f64,

    /// Weight in kilograms; 0.0 when unknown.
    pub weight_kg: f64,

    /// Age in whole years; 0 when unknown.
    pub age_years: u32,

    /// Biological sex.
    pub sex: BiologicalSex,
}

impl UserProfile {
    /// Whether every field carries a usable value.
    ///
    /// Partial profiles are never used for estimation; one missing field
    /// sends the caller to the flat fallback rate instead.
    pub fn is_complete(&self) -> bool {
        self.weight_kg != 0.0
            && self.height_cm != 0.0
            && self.age_years != 0
            && self.sex != BiologicalSex::Unknown
    }
}

/// Identifier of the application or device that originated a sample,
/// e.g. `com.apple.health.F74B1A2C`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The set of trusted source identifiers for one query, or `None` when
/// every source is accepted (the fail-soft result of a failed enumeration).
pub type SourceSet = Option<HashSet<SourceId>>;

/// Hour-of-day aggregation result. Always holds exactly the keys 0..=23;
/// hours without data are zero-filled, never omitted.
pub type HourlyBuckets = BTreeMap<u32, f64>;

/// Day-bucketed integer sums keyed by day start. Days without data are
/// omitted.
pub type DailyStatistics = BTreeMap<DateTime<Utc>, i64>;

/// One quantity sample as stored by the external health store.
///
/// `value` is always in the metric's canonical unit ([`MetricType::unit`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Which metric this sample measures.
    pub metric: MetricType,

    /// Measured value in the metric's canonical unit.
    pub value: f64,

    /// When the measurement began.
    pub start: DateTime<Utc>,

    /// When the measurement ended.
    pub end: DateTime<Utc>,

    /// The originating application or device.
    pub source: SourceId,
}

/// A point-in-time reading from the motion co-processor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PedometerSnapshot {
    /// Steps counted in the queried interval.
    pub steps: f64,

    /// Distance covered in the queried interval, in meters.
    pub distance_meters: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_unit_mapping_is_total() {
        assert_eq!(MetricType::StepCount.unit(), Unit::Count);
        assert_eq!(MetricType::Distance.unit(), Unit::Meters);
        assert_eq!(MetricType::ActiveEnergy.unit(), Unit::Kilocalories);
        assert_eq!(MetricType::BasalEnergy.unit(), Unit::Kilocalories);
        assert_eq!(MetricType::DietaryEnergy.unit(), Unit::Kilocalories);
        assert_eq!(MetricType::Height.unit(), Unit::Centimeters);
        assert_eq!(MetricType::BodyMass.unit(), Unit::Kilograms);
    }

    #[test]
    fn test_window_encloses_strictly() {
        let start = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 6, 16, 0, 0, 0).unwrap();
        let window = TimeWindow::new(start, end);

        let inside = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        assert!(window.encloses(inside, inside));
        assert!(window.encloses(start, end));

        // A sample straddling the start boundary is rejected
        let before = start - chrono::Duration::seconds(1);
        assert!(!window.encloses(before, inside));

        // A sample straddling the end boundary is rejected
        let after = end + chrono::Duration::seconds(1);
        assert!(!window.encloses(inside, after));
    }

    #[test]
    fn test_window_elapsed_seconds_is_absolute() {
        let a = Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 6, 15, 1, 0, 0).unwrap();

        assert_eq!(TimeWindow::new(a, b).elapsed_seconds(), 3600);
        // Inverted window (start past end) must not go negative
        assert_eq!(TimeWindow::new(b, a).elapsed_seconds(), 3600);
    }

    #[test]
    fn test_profile_completeness() {
        let complete = UserProfile {
            height_cm: 175.0,
            weight_kg: 70.0,
            age_years: 30,
            sex: BiologicalSex::Male,
        };
        assert!(complete.is_complete());

        assert!(!UserProfile { weight_kg: 0.0, ..complete }.is_complete());
        assert!(!UserProfile { height_cm: 0.0, ..complete }.is_complete());
        assert!(!UserProfile { age_years: 0, ..complete }.is_complete());
        assert!(!UserProfile { sex: BiologicalSex::Unknown, ..complete }.is_complete());
    }

    #[test]
    fn test_serialized_tags_are_stable() {
        // Embedder bridges rely on these exact tags
        assert_eq!(
            serde_json::to_string(&Period::CurrentWeek).unwrap(),
            "\"current_week\""
        );
        assert_eq!(
            serde_json::to_string(&MetricType::StepCount).unwrap(),
            "\"step_count\""
        );
        assert_eq!(
            serde_json::to_string(&BiologicalSex::Female).unwrap(),
            "\"female\""
        );
    }
}
