//! Windowed aggregation over the external health store.
//!
//! # Failure Model
//!
//! Every query shape here is **fail-soft**: a store error or an empty result
//! collapses to a zero value, a zero-filled hour map, or an empty collection.
//! Nothing in this module returns a `Result`; callers cannot distinguish
//! "no data occurred" from "query failed", which is the documented contract
//! of this system. Degradations are logged at `warn`.
//!
//! All shapes apply the caller's source set ANDed with the time-window
//! predicate (see [`crate::sources`]).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::warn;

use crate::backends::{BucketInterval, HealthStore, SampleFilter, StatisticsQuery};
use crate::model::{DailyStatistics, HourlyBuckets, MetricType, Period, SourceSet, TimeWindow};
use crate::period;

/// Cumulative sum of `metric` over `window`.
///
/// Day-bucketed and re-summed, matching the wire shape of the underlying
/// statistics query. Returns 0.0 on error or when nothing matched.
pub async fn sum(
    store: &dyn HealthStore,
    metric: MetricType,
    window: TimeWindow,
    sources: SourceSet,
) -> f64 {
    let query = StatisticsQuery {
        metric,
        filter: SampleFilter {
            window: Some(window),
            sources,
        },
        anchor: window.end,
        interval: BucketInterval::Day,
    };

    match store.cumulative_sum(query).await {
        Ok(buckets) => buckets.iter().map(|b| b.sum).sum(),
        Err(error) => {
            warn!(?metric, %error, "sum query failed; reporting zero");
            0.0
        }
    }
}

/// Per-hour sums of `metric` over `window`, keyed by hour of day.
///
/// The map always holds exactly the keys 0..=23: every hour is pre-populated
/// with 0.0 before results are merged, so hours without data (and the entire
/// map on a store error) read as zero. Each bucket is keyed by the hour of
/// its last covered instant (end minus one second).
pub async fn hourly_buckets(
    store: &dyn HealthStore,
    metric: MetricType,
    window: TimeWindow,
    sources: SourceSet,
) -> HourlyBuckets {
    let mut hours: HourlyBuckets = (0..24).map(|h| (h, 0.0)).collect();

    let query = StatisticsQuery {
        metric,
        filter: SampleFilter {
            window: Some(window),
            sources,
        },
        anchor: window.end,
        interval: BucketInterval::Hour,
    };

    match store.cumulative_sum(query).await {
        Ok(buckets) => {
            for bucket in buckets {
                let hour = (bucket.end - Duration::seconds(1)).hour();
                hours.insert(hour, bucket.sum);
            }
        }
        Err(error) => {
            warn!(?metric, %error, "hourly query failed; reporting zero-filled hours");
        }
    }

    hours
}

/// Day-by-day sums of `metric` from `from` up to the start of today,
/// ascending in time.
///
/// Each point is keyed by the bucket's last covered instant (end minus one
/// second), not its boundary. Days without data are omitted. Empty on error.
pub async fn daily_series(
    store: &dyn HealthStore,
    metric: MetricType,
    from: DateTime<Utc>,
    now: DateTime<Utc>,
    sources: SourceSet,
) -> Vec<(DateTime<Utc>, f64)> {
    let upper = period::resolve(Period::Yesterday, &now);
    let query = StatisticsQuery {
        metric,
        filter: SampleFilter {
            window: Some(TimeWindow::new(from, upper)),
            sources,
        },
        anchor: upper,
        interval: BucketInterval::Day,
    };

    match store.cumulative_sum(query).await {
        Ok(buckets) => {
            let mut series: Vec<(DateTime<Utc>, f64)> = buckets
                .into_iter()
                .map(|b| (b.end - Duration::seconds(1), b.sum))
                .collect();
            series.sort_by_key(|(instant, _)| *instant);
            series
        }
        Err(error) => {
            warn!(?metric, %error, "daily series query failed; reporting empty series");
            Vec::new()
        }
    }
}

/// Day-by-day integer sums of `metric` from `from` through the end of today,
/// keyed by bucket start.
///
/// Unlike [`daily_series`], the upper bound is the **next** midnight, so
/// today's partial bucket is included. Days without data are omitted.
/// Empty on error.
pub async fn daily_statistics(
    store: &dyn HealthStore,
    metric: MetricType,
    from: DateTime<Utc>,
    now: DateTime<Utc>,
    sources: SourceSet,
) -> DailyStatistics {
    let upper = period::end_of_today(&now);
    let query = StatisticsQuery {
        metric,
        filter: SampleFilter {
            window: Some(TimeWindow::new(from, upper)),
            sources,
        },
        anchor: upper,
        interval: BucketInterval::Day,
    };

    match store.cumulative_sum(query).await {
        Ok(buckets) => buckets
            .into_iter()
            .map(|b| (b.start, b.sum as i64))
            .collect(),
        Err(error) => {
            warn!(?metric, %error, "daily statistics query failed; reporting empty map");
            BTreeMap::new()
        }
    }
}

/// Value of the single most recent sample of `metric`, over all of time
/// (descending start order, limit one). Returns 0.0 if none exists or the
/// query errors.
pub async fn most_recent_sample(
    store: &dyn HealthStore,
    metric: MetricType,
    sources: SourceSet,
) -> f64 {
    let filter = SampleFilter {
        window: None,
        sources,
    };

    match store.latest_sample(metric, filter).await {
        Ok(Some(sample)) => sample.value,
        Ok(None) => 0.0,
        Err(error) => {
            warn!(?metric, %error, "latest-sample query failed; reporting zero");
            0.0
        }
    }
}
