//! The public health-metric facade.
//!
//! [`HealthHub`] orchestrates period resolution, source filtering,
//! aggregation and the calorie fallback over the injected collaborators, and
//! normalizes every result onto a single completion channel: each public
//! operation takes a callback, runs its work on the runtime, and delivers
//! the callback through the hub's [`Dispatcher`], never on an arbitrary
//! worker.
//!
//! # Failure Model
//!
//! No operation surfaces an error. Initialization reports plain `false`;
//! every metric read degrades to zero / empty; writes are fire-and-forget
//! with failures logged and dropped. See the crate docs.
//!
//! # Today's totals
//!
//! Step and distance totals for [`Period::Today`] bypass the external store
//! and query the motion co-processor directly: the store may lag real time
//! for the current day, the on-device pedometer does not.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{instrument, warn};

use crate::aggregation;
use crate::backends::{HealthStore, MotionSensor};
use crate::dispatch::Dispatcher;
use crate::energy;
use crate::model::{
    BiologicalSex, Capability, DailyStatistics, HourlyBuckets, MetricType, Period, Sample, SourceId,
};
use crate::period;
use crate::sources;

/// Capabilities requested for reading. A strict superset of
/// [`WRITE_CAPABILITIES`]: dietary and basal energy and the birth/sex
/// characteristics are read-only.
pub const READ_CAPABILITIES: [Capability; 9] = [
    Capability::StepCount,
    Capability::Distance,
    Capability::ActiveEnergy,
    Capability::BasalEnergy,
    Capability::DietaryEnergy,
    Capability::Height,
    Capability::BodyMass,
    Capability::DateOfBirth,
    Capability::BiologicalSex,
];

/// Capabilities requested for writing.
pub const WRITE_CAPABILITIES: [Capability; 5] = [
    Capability::StepCount,
    Capability::Distance,
    Capability::ActiveEnergy,
    Capability::Height,
    Capability::BodyMass,
];

/// Source identifier recorded on samples this crate writes.
const DEFAULT_WRITE_SOURCE: &str = "com.vitalgate.app";

/// Unified accessor over the external health store and motion co-processor.
///
/// Construct once at startup with the process-wide collaborator handles and
/// reuse for the process lifetime; the hub itself is cheap to clone.
#[derive(Clone)]
pub struct HealthHub {
    store: Arc<dyn HealthStore>,
    sensor: Arc<dyn MotionSensor>,
    dispatcher: Arc<dyn Dispatcher>,
    trusted_prefix: String,
    write_source: SourceId,
}

impl HealthHub {
    /// Create a hub over injected collaborators.
    ///
    /// Must be called (and its operations invoked) within a tokio runtime;
    /// each operation spawns one task.
    pub fn new(
        store: Arc<dyn HealthStore>,
        sensor: Arc<dyn MotionSensor>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            store,
            sensor,
            dispatcher,
            trusted_prefix: sources::TRUSTED_SOURCE_PREFIX.to_string(),
            write_source: SourceId::new(DEFAULT_WRITE_SOURCE),
        }
    }

    /// Override the trusted source prefix (defaults to the platform health
    /// agent's bundle prefix).
    pub fn with_trusted_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.trusted_prefix = prefix.into();
        self
    }

    /// Override the source identifier recorded on written samples.
    pub fn with_write_source(mut self, source: impl Into<String>) -> Self {
        self.write_source = SourceId::new(source);
        self
    }

    /// Request read/write authorization for the fixed capability sets.
    ///
    /// Reports `false` when the store is unavailable on this device or the
    /// authorization request itself errors; `true` otherwise, including
    /// when the user denies individual permissions, which the platform does
    /// not reveal.
    #[instrument(skip(self, cb))]
    pub fn initialize(&self, cb: impl FnOnce(bool) + Send + 'static) {
        if !self.store.is_available() {
            warn!("health store unavailable on this device");
            self.dispatcher.dispatch(Box::new(move || cb(false)));
            return;
        }

        let store = Arc::clone(&self.store);
        self.complete(
            async move {
                match store
                    .request_authorization(&READ_CAPABILITIES, &WRITE_CAPABILITIES)
                    .await
                {
                    Ok(()) => true,
                    Err(error) => {
                        warn!(%error, "authorization request failed");
                        false
                    }
                }
            },
            cb,
        );
    }

    /// Today's pedometer steps and distance (meters).
    #[instrument(skip(self, cb))]
    pub fn current_steps_and_distance(&self, cb: impl FnOnce(u64, f64) + Send + 'static) {
        let sensor = Arc::clone(&self.sensor);
        self.complete(
            async move {
                let snapshot = pedometer_today(sensor.as_ref(), Utc::now()).await;
                (snapshot.steps as u64, snapshot.distance_meters)
            },
            move |(steps, distance)| cb(steps, distance),
        );
    }

    /// Pedometer steps for one clock hour of today.
    #[instrument(skip(self, cb))]
    pub fn steps_at_hour(&self, hour: u32, cb: impl FnOnce(u64) + Send + 'static) {
        let sensor = Arc::clone(&self.sensor);
        self.complete(
            async move {
                let window = period::hour_of_today(Utc::now(), hour);
                match sensor.query(window.start, window.end).await {
                    Ok(snapshot) => snapshot.steps as u64,
                    Err(error) => {
                        warn!(hour, %error, "pedometer hour query failed; reporting zero");
                        0
                    }
                }
            },
            cb,
        );
    }

    /// Per-hour step sums over the period; always exactly 24 buckets.
    #[instrument(skip(self, cb))]
    pub fn hourly_steps(&self, period: Period, cb: impl FnOnce(HourlyBuckets) + Send + 'static) {
        let store = Arc::clone(&self.store);
        let prefix = self.trusted_prefix.clone();
        self.complete(
            async move {
                let window = period::window(period, Utc::now());
                let trusted =
                    sources::trusted_sources(store.as_ref(), MetricType::StepCount, &prefix).await;
                aggregation::hourly_buckets(store.as_ref(), MetricType::StepCount, window, trusted)
                    .await
            },
            cb,
        );
    }

    /// Day-by-day step sums from `since` up to the start of today,
    /// ascending.
    #[instrument(skip(self, cb))]
    pub fn daily_step_series(
        &self,
        since: DateTime<Utc>,
        cb: impl FnOnce(Vec<(DateTime<Utc>, f64)>) + Send + 'static,
    ) {
        let store = Arc::clone(&self.store);
        let prefix = self.trusted_prefix.clone();
        self.complete(
            async move {
                let trusted =
                    sources::trusted_sources(store.as_ref(), MetricType::StepCount, &prefix).await;
                aggregation::daily_series(
                    store.as_ref(),
                    MetricType::StepCount,
                    since,
                    Utc::now(),
                    trusted,
                )
                .await
            },
            cb,
        );
    }

    /// Day-by-day integer step sums over the period, through the end of
    /// today, keyed by day start.
    #[instrument(skip(self, cb))]
    pub fn daily_step_statistics(
        &self,
        period: Period,
        cb: impl FnOnce(DailyStatistics) + Send + 'static,
    ) {
        let store = Arc::clone(&self.store);
        let prefix = self.trusted_prefix.clone();
        self.complete(
            async move {
                let now = Utc::now();
                let from = period::resolve(period, &now);
                let trusted =
                    sources::trusted_sources(store.as_ref(), MetricType::StepCount, &prefix).await;
                aggregation::daily_statistics(
                    store.as_ref(),
                    MetricType::StepCount,
                    from,
                    now,
                    trusted,
                )
                .await
            },
            cb,
        );
    }

    /// Total steps over the period. `Today` reads the pedometer; everything
    /// else reads the store.
    #[instrument(skip(self, cb))]
    pub fn total_steps(&self, period: Period, cb: impl FnOnce(f64) + Send + 'static) {
        if period == Period::Today {
            let sensor = Arc::clone(&self.sensor);
            self.complete(
                async move { pedometer_today(sensor.as_ref(), Utc::now()).await.steps },
                cb,
            );
            return;
        }
        self.total_from_store(MetricType::StepCount, period, cb);
    }

    /// Total distance in meters over the period. `Today` reads the
    /// pedometer; everything else reads the store.
    #[instrument(skip(self, cb))]
    pub fn total_distance(&self, period: Period, cb: impl FnOnce(f64) + Send + 'static) {
        if period == Period::Today {
            let sensor = Arc::clone(&self.sensor);
            self.complete(
                async move {
                    pedometer_today(sensor.as_ref(), Utc::now())
                        .await
                        .distance_meters
                },
                cb,
            );
            return;
        }
        self.total_from_store(MetricType::Distance, period, cb);
    }

    /// Total active energy in kilocalories over the period.
    ///
    /// When the direct sum is exactly 0.0 (no recorded samples, or a failed
    /// query) the result is estimated from the user profile instead (see
    /// [`crate::energy`]). No other total has a fallback path.
    #[instrument(skip(self, cb))]
    pub fn total_energy(&self, period: Period, cb: impl FnOnce(f64) + Send + 'static) {
        let store = Arc::clone(&self.store);
        let prefix = self.trusted_prefix.clone();
        self.complete(
            async move {
                let now = Utc::now();
                let window = period::window(period, now);
                let trusted =
                    sources::trusted_sources(store.as_ref(), MetricType::ActiveEnergy, &prefix)
                        .await;
                let direct =
                    aggregation::sum(store.as_ref(), MetricType::ActiveEnergy, window, trusted)
                        .await;
                if direct == 0.0 {
                    energy::estimate(store.as_ref(), window, now, &prefix).await
                } else {
                    direct
                }
            },
            cb,
        );
    }

    /// Most recent recorded height, in centimeters; 0.0 when absent.
    #[instrument(skip(self, cb))]
    pub fn height(&self, cb: impl FnOnce(f64) + Send + 'static) {
        self.latest_value(MetricType::Height, cb);
    }

    /// Most recent recorded weight, in kilograms; 0.0 when absent.
    #[instrument(skip(self, cb))]
    pub fn weight(&self, cb: impl FnOnce(f64) + Send + 'static) {
        self.latest_value(MetricType::BodyMass, cb);
    }

    /// Age in whole years from the recorded date of birth; 0 when absent.
    #[instrument(skip(self, cb))]
    pub fn age(&self, cb: impl FnOnce(u32) + Send + 'static) {
        let store = Arc::clone(&self.store);
        self.complete(
            async move { energy::age_years(store.as_ref(), Utc::now()).await },
            cb,
        );
    }

    /// The recorded biological sex; unknown when absent.
    #[instrument(skip(self, cb))]
    pub fn biological_sex(&self, cb: impl FnOnce(BiologicalSex) + Send + 'static) {
        let store = Arc::clone(&self.store);
        self.complete(
            async move { energy::biological_sex(store.as_ref()).await },
            cb,
        );
    }

    /// Record a height sample, in centimeters. Fire-and-forget.
    pub fn record_height(&self, centimeters: f64) {
        self.record(MetricType::Height, centimeters);
    }

    /// Record a weight sample, in kilograms. Fire-and-forget.
    pub fn record_weight(&self, kilograms: f64) {
        self.record(MetricType::BodyMass, kilograms);
    }

    /// Record a step-count sample. Fire-and-forget.
    pub fn record_steps(&self, steps: f64) {
        self.record(MetricType::StepCount, steps);
    }

    /// Record a distance sample, in meters. Fire-and-forget.
    pub fn record_distance(&self, meters: f64) {
        self.record(MetricType::Distance, meters);
    }

    /// Record an active-energy sample, in kilocalories. Fire-and-forget.
    pub fn record_energy(&self, kilocalories: f64) {
        self.record(MetricType::ActiveEnergy, kilocalories);
    }

    /// Store-backed total for every non-`Today` period.
    fn total_from_store(
        &self,
        metric: MetricType,
        period: Period,
        cb: impl FnOnce(f64) + Send + 'static,
    ) {
        let store = Arc::clone(&self.store);
        let prefix = self.trusted_prefix.clone();
        self.complete(
            async move {
                let window = period::window(period, Utc::now());
                let trusted = sources::trusted_sources(store.as_ref(), metric, &prefix).await;
                aggregation::sum(store.as_ref(), metric, window, trusted).await
            },
            cb,
        );
    }

    /// Most recent source-filtered sample value for a body metric.
    fn latest_value(&self, metric: MetricType, cb: impl FnOnce(f64) + Send + 'static) {
        let store = Arc::clone(&self.store);
        let prefix = self.trusted_prefix.clone();
        self.complete(
            async move {
                let trusted = sources::trusted_sources(store.as_ref(), metric, &prefix).await;
                aggregation::most_recent_sample(store.as_ref(), metric, trusted).await
            },
            cb,
        );
    }

    /// Fire-and-forget write of one sample measured at "now".
    ///
    /// Failures are logged and dropped, never surfaced or retried; a
    /// subsequent read is only eventually consistent with this write.
    #[instrument(skip(self))]
    fn record(&self, metric: MetricType, value: f64) {
        let store = Arc::clone(&self.store);
        let source = self.write_source.clone();
        tokio::spawn(async move {
            let now = Utc::now();
            let sample = Sample {
                metric,
                value,
                start: now,
                end: now,
                source,
            };
            if let Err(error) = store.save_sample(sample).await {
                warn!(?metric, %error, "sample write failed; dropping");
            }
        });
    }

    /// Run `work` on the runtime, then deliver its result to `cb` through
    /// the designated dispatcher. The single exit path for every public
    /// completion.
    fn complete<T, F, C>(&self, work: F, cb: C)
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            let value = work.await;
            dispatcher.dispatch(Box::new(move || cb(value)));
        });
    }
}

/// Pedometer reading for today so far; zeroes on sensor error.
async fn pedometer_today(
    sensor: &dyn MotionSensor,
    now: DateTime<Utc>,
) -> crate::model::PedometerSnapshot {
    let start = period::resolve(Period::Today, &now);
    match sensor.query(start, now).await {
        Ok(snapshot) => snapshot,
        Err(error) => {
            warn!(%error, "pedometer query failed; reporting zeroes");
            crate::model::PedometerSnapshot::default()
        }
    }
}
