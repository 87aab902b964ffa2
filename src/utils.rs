//! Calendar-time conversions for NTP timestamps.
//!
//! Gated behind the `utils` feature since it pulls in `chrono`.

use chrono::{DateTime, Utc};

use crate::{fraction_to_nanoseconds, Timestamp};

/// Convert an NTP timestamp to a `chrono` UTC date-time.
///
/// Goes through [`Timestamp::to_unix_seconds`], so it inherits that
/// conversion's 31-bit wrap for out-of-range values and keeps the
/// fraction at nanosecond resolution.
#[must_use]
pub fn to_datetime(timestamp: &Timestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(
        i64::from(timestamp.to_unix_seconds()),
        fraction_to_nanoseconds(timestamp.fraction),
    )
}
