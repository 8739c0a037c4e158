//! Collaborator traits for the external health store and motion sensor.
//!
//! Both collaborators are opaque asynchronous query/write services. They are
//! injected into the facade once at startup and shared read-only for the
//! process lifetime; this crate never constructs platform handles itself.
//!
//! # Implementations
//!
//! - Platform crates bind these traits to the native health store and motion
//!   co-processor.
//! - [`memory`] provides a synthetic in-memory pair used by this crate's
//!   tests and usable by embedders on platforms without a native store.
//!
//! # Contract notes
//!
//! - Implementations may complete futures on any thread; the facade is
//!   responsible for marshalling completions onto the designated dispatcher.
//! - No timeouts are imposed here; the underlying platform's own timeout
//!   behavior governs.
//! - There is no cancellation: once issued, a query runs to completion.

pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SensorError, StoreError};
use crate::model::{
    BiologicalSex, Capability, MetricType, PedometerSnapshot, Sample, SourceId, TimeWindow,
};

/// Restricts which samples a query sees.
///
/// The window and source set are ANDed. `sources: None` means "accept all
/// sources"; callers must never treat it as an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleFilter {
    /// Only samples strictly enclosed by this window (see
    /// [`TimeWindow::encloses`]). `None` = all of time.
    pub window: Option<TimeWindow>,

    /// Only samples from these origins. `None` = all sources.
    pub sources: Option<HashSet<SourceId>>,
}

impl SampleFilter {
    /// Whether a sample passes both predicates.
    pub fn matches(&self, sample: &Sample) -> bool {
        let in_window = self
            .window
            .is_none_or(|w| w.encloses(sample.start, sample.end));
        let from_source = self
            .sources
            .as_ref()
            .is_none_or(|s| s.contains(&sample.source));
        in_window && from_source
    }
}

/// Bucket width for a cumulative-sum query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketInterval {
    Hour,
    Day,
}

/// A cumulative-sum aggregation request.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsQuery {
    /// Which metric to aggregate.
    pub metric: MetricType,

    /// Sample restriction (time window ANDed with source set).
    pub filter: SampleFilter,

    /// Instant the bucket grid is anchored to.
    pub anchor: DateTime<Utc>,

    /// Bucket width.
    pub interval: BucketInterval,
}

/// One bucket of a cumulative-sum result. Buckets with no matching samples
/// are omitted from results, never returned as zeros.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatisticsBucket {
    /// Inclusive bucket start.
    pub start: DateTime<Utc>,

    /// Exclusive bucket end.
    pub end: DateTime<Utc>,

    /// Sum of matching sample values, in the metric's canonical unit.
    pub sum: f64,
}

/// The permissioned external health-record store.
#[async_trait]
pub trait HealthStore: Send + Sync {
    /// Whether this device has a health store at all. Checked once at
    /// facade initialization.
    fn is_available(&self) -> bool;

    /// Request read/write authorization for the given capability sets.
    ///
    /// Returns `Ok(())` even when the user denies individual items; the
    /// platform does not reveal per-item denial. Errors only when the
    /// request itself cannot be made.
    async fn request_authorization(
        &self,
        read: &[Capability],
        write: &[Capability],
    ) -> Result<(), StoreError>;

    /// Persist one quantity sample.
    async fn save_sample(&self, sample: Sample) -> Result<(), StoreError>;

    /// Execute a cumulative-sum query, returning non-empty buckets in
    /// ascending start order.
    async fn cumulative_sum(
        &self,
        query: StatisticsQuery,
    ) -> Result<Vec<StatisticsBucket>, StoreError>;

    /// The single most recent matching sample (descending start order,
    /// limit one), or `None` when nothing matches.
    async fn latest_sample(
        &self,
        metric: MetricType,
        filter: SampleFilter,
    ) -> Result<Option<Sample>, StoreError>;

    /// Enumerate every origin that has written samples of this metric.
    async fn sources(&self, metric: MetricType) -> Result<Vec<SourceId>, StoreError>;

    /// The user's recorded date of birth, if any.
    async fn date_of_birth(&self) -> Result<Option<NaiveDate>, StoreError>;

    /// The user's recorded biological sex.
    async fn biological_sex(&self) -> Result<BiologicalSex, StoreError>;
}

/// The on-device motion co-processor (pedometer).
///
/// Queried directly for today's step/distance totals because the external
/// store may lag real time for the current day.
#[async_trait]
pub trait MotionSensor: Send + Sync {
    /// Steps and distance recorded between `from` and `to`.
    ///
    /// One in-flight query per call; no queuing contract is specified.
    async fn query(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<PedometerSnapshot, SensorError>;
}
