//! Resolution of symbolic periods into concrete instants.
//!
//! # Compatibility Quirks
//!
//! The mapping below reproduces the behavior of the system this crate
//! replaces, including three known oddities that are **deliberately not
//! fixed** (fixing them silently would shift every historical reading):
//!
//! - `CurrentYear` resolves to midnight of the **last day of the previous
//!   month**, not January 1st.
//! - `AllTime` resolves to the 1st of the **current month**, not a true epoch.
//! - `Yesterday` resolves to the start of **today**.
//!
//! Each quirk is pinned by a test named for it. The `Past*` periods use fixed
//! 86 400-second days rather than calendar-aware subtraction, also for
//! compatibility.
//!
//! Everything here is a pure function of `(period, now, calendar rules)`:
//! no I/O, no reading of the system clock. If the calendar cannot produce a
//! requested instant (a nonexistent local midnight during a DST gap), the
//! resolver falls back to `now` itself rather than failing.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::model::{Period, TimeWindow};

/// One nominal day, in seconds. Fixed-duration on purpose.
const ONE_DAY_SECONDS: i64 = 86_400;

/// First day of the week for the `CurrentWeek` period.
const FIRST_WEEKDAY: chrono::Weekday = chrono::Weekday::Sun;

/// Resolve a period to its concrete start instant, relative to `now`.
///
/// Generic over the timezone so embedders that want device-local day
/// boundaries can resolve in `chrono::Local`; the facade resolves in UTC.
pub fn resolve<Tz: TimeZone>(period: Period, now: &DateTime<Tz>) -> DateTime<Tz> {
    let today = now.date_naive();

    match period {
        Period::Today | Period::Yesterday => midnight(now, today),
        Period::PastDay => now.clone() - Duration::seconds(ONE_DAY_SECONDS),
        Period::PastWeek => now.clone() - Duration::seconds(7 * ONE_DAY_SECONDS),
        Period::PastMonth => now.clone() - Duration::seconds(30 * ONE_DAY_SECONDS),
        Period::PastYear => now.clone() - Duration::seconds(365 * ONE_DAY_SECONDS),
        Period::CurrentWeek => {
            let back = i64::from(today.weekday().days_since(FIRST_WEEKDAY));
            midnight(now, today - Duration::days(back))
        }
        Period::CurrentMonth | Period::AllTime => match today.with_day(1) {
            Some(first) => midnight(now, first),
            None => now.clone(),
        },
        Period::CurrentYear => match today.with_day(1) {
            // "Day zero" of the month, normalized: the previous month's last day
            Some(first) => midnight(now, first - Duration::days(1)),
            None => now.clone(),
        },
    }
}

/// Build the standard query window for a period: `[resolve(period), now)`.
pub fn window(period: Period, now: DateTime<Utc>) -> TimeWindow {
    TimeWindow::new(resolve(period, &now), now)
}

/// The exclusive upper bound "end of today": midnight of the next day.
///
/// Used by the daily-statistics query so today's partial bucket is included.
pub fn end_of_today<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    midnight(now, now.date_naive() + Duration::days(1))
}

/// The window covering one clock hour of today: `[hour:00:00, hour:59:59]`.
///
/// An out-of-range hour degrades to an empty window at `now`.
pub fn hour_of_today(now: DateTime<Utc>, hour: u32) -> TimeWindow {
    let today = now.date_naive();
    let bounds = NaiveTime::from_hms_opt(hour, 0, 0)
        .zip(NaiveTime::from_hms_opt(hour, 59, 59))
        .map(|(from, to)| (today.and_time(from).and_utc(), today.and_time(to).and_utc()));

    match bounds {
        Some((from, to)) => TimeWindow::new(from, to),
        None => TimeWindow::new(now, now),
    }
}

/// Midnight of `date` in `now`'s timezone, falling back to `now` when that
/// instant does not exist on the local calendar.
fn midnight<Tz: TimeZone>(now: &DateTime<Tz>, date: NaiveDate) -> DateTime<Tz> {
    now.timezone()
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .unwrap_or_else(|| now.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    /// Saturday, June 15th 2024, 10:30:45 UTC.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 45).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_today_resolves_to_start_of_day() {
        assert_eq!(resolve(Period::Today, &now()), at(2024, 6, 15));
    }

    #[test]
    fn test_past_periods_use_fixed_length_days() {
        let now = now();
        assert_eq!(
            resolve(Period::PastDay, &now),
            now - Duration::seconds(86_400)
        );
        assert_eq!(
            resolve(Period::PastWeek, &now),
            now - Duration::seconds(7 * 86_400)
        );
        assert_eq!(
            resolve(Period::PastMonth, &now),
            now - Duration::seconds(30 * 86_400)
        );
        assert_eq!(
            resolve(Period::PastYear, &now),
            now - Duration::seconds(365 * 86_400)
        );
    }

    #[test]
    fn test_current_week_starts_on_sunday() {
        // June 15th 2024 is a Saturday; the week began Sunday the 9th
        assert_eq!(resolve(Period::CurrentWeek, &now()), at(2024, 6, 9));

        // On a Sunday the week starts that same day
        let sunday = Utc.with_ymd_and_hms(2024, 6, 9, 18, 0, 0).unwrap();
        assert_eq!(resolve(Period::CurrentWeek, &sunday), at(2024, 6, 9));
    }

    #[test]
    fn test_current_month_starts_on_the_first() {
        assert_eq!(resolve(Period::CurrentMonth, &now()), at(2024, 6, 1));
    }

    #[test]
    fn test_current_year_quirk_resolves_to_end_of_previous_month() {
        // Preserved quirk: "day zero" normalizes to the previous month's
        // last day, NOT to January 1st
        assert_eq!(resolve(Period::CurrentYear, &now()), at(2024, 5, 31));

        let january = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
        assert_eq!(resolve(Period::CurrentYear, &january), at(2023, 12, 31));
    }

    #[test]
    fn test_all_time_quirk_resolves_to_first_of_current_month() {
        // Preserved limitation: not a true epoch
        assert_eq!(resolve(Period::AllTime, &now()), at(2024, 6, 1));
        assert_eq!(
            resolve(Period::AllTime, &now()),
            resolve(Period::CurrentMonth, &now())
        );
    }

    #[test]
    fn test_yesterday_quirk_resolves_to_start_of_today() {
        // Preserved quirk: NOT actually yesterday
        assert_eq!(resolve(Period::Yesterday, &now()), at(2024, 6, 15));
        assert_eq!(
            resolve(Period::Yesterday, &now()),
            resolve(Period::Today, &now())
        );
    }

    #[test]
    fn test_window_ends_at_now() {
        let now = now();
        let window = window(Period::CurrentMonth, now);
        assert_eq!(window.start, at(2024, 6, 1));
        assert_eq!(window.end, now);
    }

    #[test]
    fn test_end_of_today_is_next_midnight() {
        assert_eq!(end_of_today(&now()), at(2024, 6, 16));
    }

    #[test]
    fn test_hour_of_today_window() {
        let window = hour_of_today(now(), 9);
        assert_eq!(
            window.start,
            Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap()
        );
        assert_eq!(
            window.end,
            Utc.with_ymd_and_hms(2024, 6, 15, 9, 59, 59).unwrap()
        );
    }

    #[test]
    fn test_hour_of_today_out_of_range_degrades_to_now() {
        let now = now();
        let window = hour_of_today(now, 24);
        assert_eq!(window.start, now);
        assert_eq!(window.end, now);
    }
}
