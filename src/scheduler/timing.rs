//! Recurring-fire computation
//!
//! Recurring jobs use cron `*/N` field semantics in the repository's
//! granularity, always in local wall-clock time:
//!
//! - `sec`:  fires at every second where `sec % N == 0`
//! - `min`:  fires at `:00` seconds of minutes where `min % N == 0`
//! - `hour`: fires on the hour where `hour % N == 0`
//! - `day`:  fires at midnight of days where `(day - 1) % N == 0`
//!
//! Deferred pointer-repoint jobs fire once, half a scheduling period
//! after the rotation that scheduled them.

use chrono::{Duration, NaiveDateTime, Timelike};

use crate::config::model::TimeUnit;

/// Next recurring fire time strictly after `after`
pub fn next_recurring_fire(unit: TimeUnit, every: u32, after: NaiveDateTime) -> NaiveDateTime {
    let every = every.max(1);
    match unit {
        TimeUnit::Sec => {
            let mut candidate = truncate_to_second(after) + Duration::seconds(1);
            while candidate.second() % every != 0 {
                candidate += Duration::seconds(1);
            }
            candidate
        }
        TimeUnit::Min => {
            let mut candidate = truncate_to_minute(after) + Duration::minutes(1);
            while candidate.minute() % every != 0 {
                candidate += Duration::minutes(1);
            }
            candidate
        }
        TimeUnit::Hour => {
            let mut candidate = truncate_to_hour(after) + Duration::hours(1);
            while candidate.hour() % every != 0 {
                candidate += Duration::hours(1);
            }
            candidate
        }
        TimeUnit::Day => {
            use chrono::Datelike;
            let mut candidate =
                after.date().and_hms_opt(0, 0, 0).expect("midnight is valid") + Duration::days(1);
            // Cron day-of-month fields count from 1, so `*/N` matches
            // days 1, 1+N, 1+2N, ...
            while (candidate.day() - 1) % every != 0 {
                candidate += Duration::days(1);
            }
            candidate
        }
    }
}

/// Absolute fire time of the deferred pointer-repoint job: half the
/// repository's period after `now`
pub fn deferred_fire(unit: TimeUnit, frequency: u32, now: NaiveDateTime) -> NaiveDateTime {
    now + Duration::seconds(unit.period_seconds(frequency) / 2)
}

fn truncate_to_second(t: NaiveDateTime) -> NaiveDateTime {
    t.with_nanosecond(0).unwrap_or(t)
}

fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    truncate_to_second(t).with_second(0).unwrap_or(t)
}

fn truncate_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    truncate_to_minute(t).with_minute(0).unwrap_or(t)
}
