//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds since the Unix epoch for `timestamp`
///
/// Used for export file names, which only need to be unique per session.
pub fn epoch_millis(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_millis()
}
