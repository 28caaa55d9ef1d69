//! Utility functions for the smart-alert crate.

use chrono::{DateTime, TimeZone};

/// Convert a one-wire millidegree reading to degrees Celsius.
///
/// # Example
///
/// ```
/// use smart_alert::millidegrees_to_celsius;
///
/// assert!((millidegrees_to_celsius(23625) - 23.625).abs() < 1e-9);
/// assert!((millidegrees_to_celsius(-1250) + 1.25).abs() < 1e-9);
/// ```
#[inline]
pub fn millidegrees_to_celsius(millidegrees: i64) -> f64 {
    millidegrees as f64 / 1000.0
}

/// Timestamp prefix used by the event log, e.g. `10 18 2026 14:05:09`.
pub fn log_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%m %d %Y %H:%M:%S").to_string()
}

/// `asctime`-style timestamp, e.g. `Sun Oct 18 14:05:09 2026`.
///
/// Used as the first body line of every notification and, with spaces
/// replaced by `#`, as the local part of the Message-ID.
pub fn ctime_string<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%a %b %-d %H:%M:%S %Y").to_string()
}

/// Hours elapsed between `start` and `now`, as logged with every reading.
pub fn hours_since<Tz: TimeZone>(start: &DateTime<Tz>, now: &DateTime<Tz>) -> f64 {
    now.clone().signed_duration_since(start.clone()).num_seconds() as f64 / 3600.0
}
