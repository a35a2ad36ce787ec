//! Storage text format for diary timestamps.
//!
//! Timestamps are local wall-clock values stored as `YYYY-MM-DD HH:MM:SS`.

use chrono::{Local, NaiveDateTime, Timelike};

pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ACCEPTED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Formats a timestamp for persistence. Sub-second precision is dropped.
pub fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(STORAGE_FORMAT).to_string()
}

/// Parses a stored timestamp, accepting fractional seconds and a `T` separator.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    ACCEPTED_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}

/// Current local wall-clock time truncated to whole seconds.
pub fn now_local() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
