//! Deadline classification.
//!
//! All functions take `now` explicitly so results only depend on their inputs.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};

pub const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// A deadline strictly before `now` is overdue
pub fn is_overdue(timestamp: i64, now: i64) -> bool {
    timestamp < now
}

/// Whole days between `now` and `timestamp`, truncated toward zero.
///
/// This is an approximation for display. A deadline tomorrow morning can still
/// report 0 late in the evening, so use [`is_due_today`] for classification.
pub fn days_until(timestamp: i64, now: i64) -> i64 {
    (timestamp - now) / MILLIS_PER_DAY
}

/// True if `timestamp` falls on the local calendar day containing `now`
pub fn is_due_today(timestamp: i64, now: i64) -> bool {
    is_due_today_in(timestamp, now, &Local)
}

/// Same as [`is_due_today`], with the calendar taken from `tz`
pub fn is_due_today_in<Tz: TimeZone>(timestamp: i64, now: i64, tz: &Tz) -> bool {
    match day_bounds_in(now, tz) {
        Some((start, end)) => start <= timestamp && timestamp <= end,
        None => false,
    }
}

/// First and last millisecond of the calendar day containing `now`, both inclusive
pub fn day_bounds_in<Tz: TimeZone>(now: i64, tz: &Tz) -> Option<(i64, i64)> {
    let today = tz.timestamp_millis_opt(now).single()?.date_naive();
    let start = start_of_day(today, tz)?;
    let end = start_of_day(today.succ_opt()?, tz)? - 1;
    Some((start, end))
}

/// Calendar days from the local day containing `now` to the day containing `timestamp`.
/// 0 is today, 1 is tomorrow and negative values are past days.
pub fn calendar_days_until(timestamp: i64, now: i64) -> Option<i64> {
    calendar_days_until_in(timestamp, now, &Local)
}

pub fn calendar_days_until_in<Tz: TimeZone>(timestamp: i64, now: i64, tz: &Tz) -> Option<i64> {
    let day = tz.timestamp_millis_opt(timestamp).single()?.date_naive();
    let today = tz.timestamp_millis_opt(now).single()?.date_naive();
    Some((day - today).num_days())
}

fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<i64> {
    let midnight: NaiveDateTime = date.and_time(NaiveTime::MIN);
    // Some zones skip midnight on DST transitions; the day then starts an hour later
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + TimeDelta::hours(1))).earliest())
        .map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn utc_millis(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, min, s)
            .single()
            .expect("valid date")
            .timestamp_millis()
    }

    #[test]
    fn overdue_is_strict() {
        let now = 1_700_000_000_000;
        assert!(is_overdue(now - 1000, now));
        assert!(!is_overdue(now, now));
        assert!(!is_overdue(now + 1, now));
    }

    #[test]
    fn days_until_truncates_toward_zero() {
        let now = 1_700_000_000_000;
        assert_eq!(days_until(now, now), 0);
        assert_eq!(days_until(now + MILLIS_PER_DAY - 1, now), 0);
        assert_eq!(days_until(now + MILLIS_PER_DAY, now), 1);
        assert_eq!(days_until(now - MILLIS_PER_DAY + 1, now), 0);
        assert_eq!(days_until(now - MILLIS_PER_DAY, now), -1);
    }

    #[test]
    fn due_today_covers_whole_calendar_day() {
        let now = utc_millis(2024, 3, 10, 15, 30, 0);
        let start = utc_millis(2024, 3, 10, 0, 0, 0);
        let next = utc_millis(2024, 3, 11, 0, 0, 0);

        assert!(is_due_today_in(start, now, &Utc));
        assert!(is_due_today_in(next - 1, now, &Utc));
        assert!(!is_due_today_in(start - 1, now, &Utc));
        assert!(!is_due_today_in(next, now, &Utc));
    }

    #[test]
    fn due_today_differs_from_days_until_near_midnight() {
        let now = utc_millis(2024, 3, 10, 23, 0, 0);
        let tomorrow_morning = utc_millis(2024, 3, 11, 0, 30, 0);

        assert_eq!(days_until(tomorrow_morning, now), 0);
        assert!(!is_due_today_in(tomorrow_morning, now, &Utc));
    }

    #[test]
    fn day_bounds_follow_the_offset() {
        let plus_two = FixedOffset::east_opt(2 * 3600).expect("offset");
        // 23:30 UTC is already the next day at +02:00
        let now = utc_millis(2024, 3, 10, 23, 30, 0);
        let (start, end) = day_bounds_in(now, &plus_two).expect("bounds");

        assert_eq!(start, utc_millis(2024, 3, 10, 22, 0, 0));
        assert_eq!(end, utc_millis(2024, 3, 11, 22, 0, 0) - 1);
    }

    #[test]
    fn calendar_days_count_dates_not_hours() {
        let now = utc_millis(2024, 6, 12, 0, 30, 0);
        // Less than 48 hours away, but two calendar days later
        let day_after_tomorrow = utc_millis(2024, 6, 14, 0, 10, 0);

        assert_eq!(days_until(day_after_tomorrow, now), 1);
        assert_eq!(calendar_days_until_in(day_after_tomorrow, now, &Utc), Some(2));
        assert_eq!(calendar_days_until_in(utc_millis(2024, 6, 12, 23, 59, 0), now, &Utc), Some(0));
        assert_eq!(calendar_days_until_in(utc_millis(2024, 6, 13, 23, 59, 0), now, &Utc), Some(1));
        assert_eq!(calendar_days_until_in(utc_millis(2024, 6, 11, 23, 0, 0), now, &Utc), Some(-1));
    }
}
