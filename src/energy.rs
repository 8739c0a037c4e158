//! Fallback energy-expenditure estimation.
//!
//! Invoked by the facade only when the direct active-energy sum comes back
//! as exactly zero. The estimate is a Mifflin-St Jeor style basal rate
//! computed from the user's body metrics, or a flat constant rate when the
//! profile is incomplete.
//!
//! The fallback constant 0.01983 is carried over verbatim from the system
//! this crate replaces. Its value suggests a kcal-per-meter walking constant
//! repurposed as a kcal-per-second rate; it is applied exactly as observed
//! (flat per-second), and that ambiguity is pinned by tests rather than
//! resolved.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::warn;

use crate::aggregation;
use crate::backends::HealthStore;
use crate::model::{BiologicalSex, MetricType, TimeWindow, UserProfile};
use crate::sources;

/// Flat estimation rate used when any profile field is missing, in
/// kilocalories per second.
pub const FALLBACK_KCAL_PER_SECOND: f64 = 0.01983;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Estimate kilocalories burned over `window`, as of `now`.
///
/// The rate (basal or fallback) is multiplied by the absolute elapsed
/// seconds between the window start and `now`, so a start instant that
/// resolved slightly past `now` cannot invert the sign.
pub async fn estimate(
    store: &dyn HealthStore,
    window: TimeWindow,
    now: DateTime<Utc>,
    trusted_prefix: &str,
) -> f64 {
    let elapsed = (now - window.start).num_seconds().abs() as f64;
    let profile = gather_profile(store, now, trusted_prefix).await;

    let rate = if profile.is_complete() {
        basal_rate(&profile)
    } else {
        FALLBACK_KCAL_PER_SECOND
    };

    rate * elapsed
}

/// Assemble the user profile from four independent lookups.
///
/// The lookups run concurrently and race freely; the only ordering
/// guarantee is the all-complete join barrier here. Partial profiles are
/// never produced: a failed lookup contributes its zero value, and
/// completeness is judged afterwards.
pub async fn gather_profile(
    store: &dyn HealthStore,
    now: DateTime<Utc>,
    trusted_prefix: &str,
) -> UserProfile {
    let (height_cm, weight_kg, age_years, sex) = tokio::join!(
        latest_body_metric(store, MetricType::Height, trusted_prefix),
        latest_body_metric(store, MetricType::BodyMass, trusted_prefix),
        age_years(store, now),
        biological_sex(store),
    );

    UserProfile {
        height_cm,
        weight_kg,
        age_years,
        sex,
    }
}

/// Basal metabolic rate in kilocalories per second.
///
/// Daily rate = weight x 10 + 6.25 x height - 5 x age, +5 for male or
/// -161 for female.
fn basal_rate(profile: &UserProfile) -> f64 {
    let adjustment = match profile.sex {
        BiologicalSex::Male => 5.0,
        BiologicalSex::Female => -161.0,
        BiologicalSex::Unknown => return FALLBACK_KCAL_PER_SECOND,
    };

    let daily = profile.weight_kg * 10.0 + 6.25 * profile.height_cm
        - 5.0 * f64::from(profile.age_years)
        + adjustment;
    daily / SECONDS_PER_DAY
}

/// Most recent height or body-mass sample, source-filtered like every other
/// aggregate read. Zero when absent.
async fn latest_body_metric(
    store: &dyn HealthStore,
    metric: MetricType,
    trusted_prefix: &str,
) -> f64 {
    let trusted = sources::trusted_sources(store, metric, trusted_prefix).await;
    aggregation::most_recent_sample(store, metric, trusted).await
}

/// Whole years since the recorded date of birth; zero when unrecorded or
/// on error.
pub async fn age_years(store: &dyn HealthStore, now: DateTime<Utc>) -> u32 {
    match store.date_of_birth().await {
        Ok(Some(dob)) => years_between(dob, now.date_naive()),
        Ok(None) => 0,
        Err(error) => {
            warn!(%error, "date-of-birth lookup failed; treating age as unknown");
            0
        }
    }
}

/// The recorded biological sex; unknown on error.
pub async fn biological_sex(store: &dyn HealthStore) -> BiologicalSex {
    match store.biological_sex().await {
        Ok(sex) => sex,
        Err(error) => {
            warn!(%error, "biological-sex lookup failed; treating as unknown");
            BiologicalSex::Unknown
        }
    }
}

fn years_between(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::MemoryHealthStore;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    const PREFIX: &str = "com.apple.health";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 11, 0, 0).unwrap()
    }

    /// Store holding a complete profile: 175 cm, 70 kg, age 30, male.
    fn complete_store() -> MemoryHealthStore {
        let store = MemoryHealthStore::new();
        let measured = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        store.record(MetricType::Height, 175.0, measured, measured, "com.apple.health.A");
        store.record(MetricType::BodyMass, 70.0, measured, measured, "com.apple.health.A");
        store.set_date_of_birth(NaiveDate::from_ymd_opt(1994, 3, 2));
        store.set_biological_sex(BiologicalSex::Male);
        store
    }

    fn hour_window() -> TimeWindow {
        TimeWindow::new(now() - chrono::Duration::seconds(3600), now())
    }

    #[tokio::test]
    async fn test_estimate_with_complete_profile_uses_basal_formula() {
        let store = complete_store();

        let estimate = estimate(&store, hour_window(), now(), PREFIX).await;

        // (70*10 + 6.25*175 - 5*30 + 5) / 86400 kcal/s over 3600 s
        let expected = (70.0 * 10.0 + 6.25 * 175.0 - 5.0 * 30.0 + 5.0) / 86_400.0 * 3600.0;
        assert!((estimate - expected).abs() < 1e-9);
        assert!((expected - 68.697_916_666).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_estimate_for_female_subtracts_161() {
        let store = complete_store();
        store.set_biological_sex(BiologicalSex::Female);

        let estimate = estimate(&store, hour_window(), now(), PREFIX).await;

        let expected = (70.0 * 10.0 + 6.25 * 175.0 - 5.0 * 30.0 - 161.0) / 86_400.0 * 3600.0;
        assert!((estimate - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_estimate_with_missing_field_uses_flat_fallback() {
        let store = complete_store();
        store.set_biological_sex(BiologicalSex::Unknown);

        let estimate = estimate(&store, hour_window(), now(), PREFIX).await;
        assert_eq!(estimate, FALLBACK_KCAL_PER_SECOND * 3600.0);
        assert!((estimate - 71.388).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_estimate_on_empty_store_uses_flat_fallback() {
        let store = MemoryHealthStore::new();

        let estimate = estimate(&store, hour_window(), now(), PREFIX).await;
        assert_eq!(estimate, FALLBACK_KCAL_PER_SECOND * 3600.0);
    }

    #[tokio::test]
    async fn test_estimate_elapsed_is_absolute() {
        let store = complete_store();
        // Window whose start resolved one hour past now
        let inverted = TimeWindow::new(now() + chrono::Duration::seconds(3600), now());

        let estimate = estimate(&store, inverted, now(), PREFIX).await;
        assert!(estimate > 0.0);
    }

    #[tokio::test]
    async fn test_gather_profile_joins_all_four_lookups() {
        let store = complete_store();

        let profile = gather_profile(&store, now(), PREFIX).await;

        assert_eq!(
            profile,
            UserProfile {
                height_cm: 175.0,
                weight_kg: 70.0,
                age_years: 30,
                sex: BiologicalSex::Male,
            }
        );
    }

    #[tokio::test]
    async fn test_gather_profile_degrades_to_zeroes_on_query_failure() {
        let store = complete_store();
        store.fail_queries(true);

        let profile = gather_profile(&store, now(), PREFIX).await;
        assert!(!profile.is_complete());
        assert_eq!(profile.age_years, 0);
        assert_eq!(profile.sex, BiologicalSex::Unknown);
    }

    #[test]
    fn test_years_between_respects_birthday() {
        let dob = NaiveDate::from_ymd_opt(1994, 3, 2).unwrap();
        assert_eq!(years_between(dob, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()), 29);
        assert_eq!(years_between(dob, NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()), 30);
        assert_eq!(years_between(dob, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()), 30);
        // A date of birth in the future never goes negative
        assert_eq!(years_between(dob, NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()), 0);
    }
}
