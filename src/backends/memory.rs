//! Synthetic in-memory store and pedometer.
//!
//! A reference implementation of the collaborator traits backed by plain
//! vectors. This crate's own tests run against it, and embedders on
//! platforms without a native health store can use it as a stand-in.
//!
//! Simplifications relative to a platform store:
//!
//! - Cumulative-sum buckets align to UTC calendar boundaries; the query
//!   anchor's sub-interval offset is ignored.
//! - Samples are assigned to buckets by their start instant.
//!
//! The failure toggles (`fail_queries`, `fail_source_enumeration`, ...) exist
//! so tests can exercise every fail-soft degradation path.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};

use crate::backends::{
    BucketInterval, HealthStore, MotionSensor, SampleFilter, StatisticsBucket, StatisticsQuery,
};
use crate::error::{SensorError, StoreError};
use crate::model::{BiologicalSex, Capability, MetricType, PedometerSnapshot, Sample, SourceId};

/// The read/write capability sets granted by the last authorization request.
#[derive(Debug, Clone, PartialEq)]
pub struct Grant {
    pub read: Vec<Capability>,
    pub write: Vec<Capability>,
}

#[derive(Default)]
struct StoreState {
    samples: Vec<Sample>,
    date_of_birth: Option<NaiveDate>,
    biological_sex: BiologicalSex,
    granted: Option<Grant>,
    unavailable: bool,
    fail_authorization: bool,
    fail_queries: bool,
    fail_source_enumeration: bool,
    fail_writes: bool,
}

/// In-memory [`HealthStore`].
#[derive(Default)]
pub struct MemoryHealthStore {
    state: Mutex<StoreState>,
}

impl MemoryHealthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one sample directly, bypassing the async write path.
    pub fn insert(&self, sample: Sample) {
        self.state.lock().expect("store lock").samples.push(sample);
    }

    /// Convenience: seed a sample measured over `[start, end]`.
    pub fn record(
        &self,
        metric: MetricType,
        value: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source: &str,
    ) {
        self.insert(Sample {
            metric,
            value,
            start,
            end,
            source: SourceId::new(source),
        });
    }

    pub fn set_date_of_birth(&self, dob: Option<NaiveDate>) {
        self.state.lock().expect("store lock").date_of_birth = dob;
    }

    pub fn set_biological_sex(&self, sex: BiologicalSex) {
        self.state.lock().expect("store lock").biological_sex = sex;
    }

    /// Simulate a device without a health store.
    pub fn set_unavailable(&self) {
        self.state.lock().expect("store lock").unavailable = true;
    }

    pub fn fail_authorization(&self, fail: bool) {
        self.state.lock().expect("store lock").fail_authorization = fail;
    }

    /// Make every statistics/sample/characteristic query error.
    pub fn fail_queries(&self, fail: bool) {
        self.state.lock().expect("store lock").fail_queries = fail;
    }

    /// Make only source enumeration error, leaving data queries intact.
    pub fn fail_source_enumeration(&self, fail: bool) {
        self.state.lock().expect("store lock").fail_source_enumeration = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().expect("store lock").fail_writes = fail;
    }

    /// The capability sets from the last successful authorization request.
    pub fn granted(&self) -> Option<Grant> {
        self.state.lock().expect("store lock").granted.clone()
    }

    /// Number of stored samples (written plus seeded).
    pub fn sample_count(&self) -> usize {
        self.state.lock().expect("store lock").samples.len()
    }
}

#[async_trait]
impl HealthStore for MemoryHealthStore {
    fn is_available(&self) -> bool {
        !self.state.lock().expect("store lock").unavailable
    }

    async fn request_authorization(
        &self,
        read: &[Capability],
        write: &[Capability],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("store lock");
        if state.unavailable {
            return Err(StoreError::Unavailable);
        }
        if state.fail_authorization {
            return Err(StoreError::Authorization("simulated failure".into()));
        }
        state.granted = Some(Grant {
            read: read.to_vec(),
            write: write.to_vec(),
        });
        Ok(())
    }

    async fn save_sample(&self, sample: Sample) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("store lock");
        if state.fail_writes {
            return Err(StoreError::Write("simulated failure".into()));
        }
        state.samples.push(sample);
        Ok(())
    }

    async fn cumulative_sum(
        &self,
        query: StatisticsQuery,
    ) -> Result<Vec<StatisticsBucket>, StoreError> {
        let state = self.state.lock().expect("store lock");
        if state.fail_queries {
            return Err(StoreError::Query("simulated failure".into()));
        }

        let mut buckets: BTreeMap<DateTime<Utc>, f64> = BTreeMap::new();
        for sample in &state.samples {
            if sample.metric != query.metric || !query.filter.matches(sample) {
                continue;
            }
            let start = bucket_start(sample.start, query.interval);
            *buckets.entry(start).or_insert(0.0) += sample.value;
        }

        Ok(buckets
            .into_iter()
            .map(|(start, sum)| StatisticsBucket {
                start,
                end: start + bucket_width(query.interval),
                sum,
            })
            .collect())
    }

    async fn latest_sample(
        &self,
        metric: MetricType,
        filter: SampleFilter,
    ) -> Result<Option<Sample>, StoreError> {
        let state = self.state.lock().expect("store lock");
        if state.fail_queries {
            return Err(StoreError::Query("simulated failure".into()));
        }

        Ok(state
            .samples
            .iter()
            .filter(|s| s.metric == metric && filter.matches(s))
            .max_by_key(|s| s.start)
            .cloned())
    }

    async fn sources(&self, metric: MetricType) -> Result<Vec<SourceId>, StoreError> {
        let state = self.state.lock().expect("store lock");
        if state.fail_source_enumeration {
            return Err(StoreError::Query("simulated failure".into()));
        }

        let mut sources: Vec<SourceId> = Vec::new();
        for sample in &state.samples {
            if sample.metric == metric && !sources.contains(&sample.source) {
                sources.push(sample.source.clone());
            }
        }
        Ok(sources)
    }

    async fn date_of_birth(&self) -> Result<Option<NaiveDate>, StoreError> {
        let state = self.state.lock().expect("store lock");
        if state.fail_queries {
            return Err(StoreError::Query("simulated failure".into()));
        }
        Ok(state.date_of_birth)
    }

    async fn biological_sex(&self) -> Result<BiologicalSex, StoreError> {
        let state = self.state.lock().expect("store lock");
        if state.fail_queries {
            return Err(StoreError::Query("simulated failure".into()));
        }
        Ok(state.biological_sex)
    }
}

fn bucket_start(instant: DateTime<Utc>, interval: BucketInterval) -> DateTime<Utc> {
    let date = instant.date_naive();
    let time = match interval {
        BucketInterval::Day => NaiveTime::MIN,
        BucketInterval::Hour => {
            NaiveTime::from_hms_opt(instant.hour(), 0, 0).unwrap_or(NaiveTime::MIN)
        }
    };
    date.and_time(time).and_utc()
}

fn bucket_width(interval: BucketInterval) -> Duration {
    match interval {
        BucketInterval::Day => Duration::days(1),
        BucketInterval::Hour => Duration::hours(1),
    }
}

#[derive(Default)]
struct PedometerState {
    snapshot: PedometerSnapshot,
    fail: bool,
    last_query: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// In-memory [`MotionSensor`] returning a fixed snapshot and remembering the
/// last queried window so tests can assert it.
#[derive(Default)]
pub struct MemoryPedometer {
    state: Mutex<PedometerState>,
}

impl MemoryPedometer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_snapshot(&self, steps: f64, distance_meters: f64) {
        self.state.lock().expect("pedometer lock").snapshot = PedometerSnapshot {
            steps,
            distance_meters,
        };
    }

    pub fn fail(&self, fail: bool) {
        self.state.lock().expect("pedometer lock").fail = fail;
    }

    /// The `[from, to]` bounds of the most recent query.
    pub fn last_query(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.state.lock().expect("pedometer lock").last_query
    }
}

#[async_trait]
impl MotionSensor for MemoryPedometer {
    async fn query(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<PedometerSnapshot, SensorError> {
        let mut state = self.state.lock().expect("pedometer lock");
        state.last_query = Some((from, to));
        if state.fail {
            return Err(SensorError::Query("simulated failure".into()));
        }
        Ok(state.snapshot)
    }
}
