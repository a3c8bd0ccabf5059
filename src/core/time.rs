//! Minute-precision time helpers.
//!
//! Every instant that enters rate arithmetic is truncated to a whole
//! minute first, so the ledger never accrues fractions of a minute.

use chrono::{DateTime, Duration, Timelike, Utc};

/// Truncate an instant down to the start of its minute.
pub fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at - Duration::seconds(i64::from(at.second()))
        - Duration::nanoseconds(i64::from(at.nanosecond()))
}

/// Signed number of whole minutes from `from` to `to`, both minute-truncated.
///
/// Negative when `to` lies before `from`.
pub fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (truncate_to_minute(to) - truncate_to_minute(from)).num_minutes()
}

/// `at` shifted forward by a whole number of minutes.
pub fn plus_minutes(at: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    at + Duration::minutes(minutes)
}
