//! Epoch-millisecond helpers for calendar arithmetic.
//!
//! All calendar boundaries (today, this month, streak days) are computed in
//! UTC so results do not depend on the host timezone.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};

pub const MS_PER_MINUTE: i64 = 60 * 1000;
pub const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Current wall clock in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// UTC calendar date containing `epoch_ms`.
pub fn date_of(epoch_ms: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .unwrap_or_default()
        .date_naive()
}

/// Epoch ms of `date` at 00:00:00 UTC.
pub fn start_of_day(date: NaiveDate) -> i64 {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
        .timestamp_millis()
}

/// Epoch ms of the last millisecond of `date`.
pub fn end_of_day(date: NaiveDate) -> i64 {
    start_of_day(date) + MS_PER_DAY - 1
}

/// Epoch ms of the first day of the month containing `epoch_ms`.
pub fn start_of_month(epoch_ms: i64) -> i64 {
    let date = date_of(epoch_ms);
    start_of_day(date.with_day(1).unwrap_or(date))
}

/// Whole days between `from` and `to`, rounded toward negative infinity,
/// so a due date one hour in the past yields `-1`.
pub fn whole_days_between(from: i64, to: i64) -> i64 {
    (to - from).div_euclid(MS_PER_DAY)
}

/// Combines a date-bearing timestamp with a minutes-of-day offset.
pub fn at_minute_of_day(epoch_ms: i64, minute_of_day: u32) -> i64 {
    start_of_day(date_of(epoch_ms)) + i64::from(minute_of_day) * MS_PER_MINUTE
}

/// Minutes since UTC midnight for `epoch_ms`.
pub fn minute_of_day(epoch_ms: i64) -> u32 {
    (epoch_ms.rem_euclid(MS_PER_DAY) / MS_PER_MINUTE) as u32
}

pub fn previous_day(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_boundaries_are_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let start = start_of_day(date);
        assert_eq!(date_of(start), date);
        assert_eq!(date_of(end_of_day(date)), date);
        assert_eq!(date_of(end_of_day(date) + 1), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    }

    #[test]
    fn whole_days_floor_negative_deltas() {
        assert_eq!(whole_days_between(MS_PER_HOUR, 0), -1);
        assert_eq!(whole_days_between(0, MS_PER_DAY - 1), 0);
        assert_eq!(whole_days_between(0, 3 * MS_PER_DAY), 3);
    }

    #[test]
    fn start_of_month_is_first_day_midnight() {
        let mid_month = start_of_day(NaiveDate::from_ymd_opt(2024, 2, 17).unwrap()) + 5 * MS_PER_HOUR;
        assert_eq!(
            start_of_month(mid_month),
            start_of_day(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
        );
    }

    #[test]
    fn minute_of_day_round_trips_with_at_minute_of_day() {
        let base = start_of_day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let at = at_minute_of_day(base + 7 * MS_PER_HOUR, 17 * 60 + 45);
        assert_eq!(minute_of_day(at), 17 * 60 + 45);
    }
}
