/// Time utilities for bucketing, file dating and storage
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};

/// Width of one aggregation bucket. Downstream charts are built on 1m bars.
pub const BUCKET_WIDTH_SECS: i64 = 60;

/// How far before the latest stored bucket a rerun starts scanning,
/// so late rows for the last covered minute are picked up again.
pub const CURSOR_OVERLAP_MINUTES: i64 = 1;

/// Storage format for bucket timestamps; sorts lexicographically in time order
pub const STORE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const FILE_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn bucket_width() -> TimeDelta {
    TimeDelta::seconds(BUCKET_WIDTH_SECS)
}

/// Truncate a timestamp down to the start of its bucket.
///
/// Works on whole seconds so it holds over chrono's full range, not just
/// the nanosecond-representable span that `DurationRound` needs.
pub fn bucket_start(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    let secs = timestamp.timestamp().div_euclid(BUCKET_WIDTH_SECS) * BUCKET_WIDTH_SECS;
    // The earliest representable instant is minute-aligned, so this never underflows
    Utc.timestamp_opt(secs, 0).single().unwrap_or(timestamp)
}

/// Convert epoch milliseconds into an instant
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// Date embedded in the first 10 characters of an aggregator file name
pub fn file_date_prefix(file_name: &str) -> Option<NaiveDate> {
    let prefix = file_name.get(..10)?;
    NaiveDate::parse_from_str(prefix, FILE_DATE_FORMAT).ok()
}

pub fn format_store_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(STORE_TIMESTAMP_FORMAT).to_string()
}

pub fn parse_store_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
