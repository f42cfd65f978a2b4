//! Tick-based timestamps and the textual date layouts some properties use.

use chrono::{DateTime, FixedOffset, Utc};

/// Milliseconds between 1601-01-01 and 1970-01-01.
pub const EPOCH_OFFSET_MILLIS: i64 = 11_644_473_600_000;
/// 100-nanosecond ticks per millisecond.
pub const TICKS_PER_MILLI: u64 = 10_000;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

const TEXT_LAYOUTS: [&str; 2] = [
    // RFC 1123 with a numeric zone, day name already stripped
    "%d %b %Y %H:%M:%S %z",
    // same, space-padded day
    "%e %b %Y %H:%M:%S %z",
];

/// Converts a tick count to Unix-epoch milliseconds.
pub fn ticks_to_unix_millis(ticks: u64) -> i64 {
    // u64::MAX / 10_000 fits in i64
    (ticks / TICKS_PER_MILLI) as i64 - EPOCH_OFFSET_MILLIS
}

/// Converts a tick count to an instant, `None` when chrono cannot represent
/// it.
pub fn ticks_to_datetime(ticks: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ticks_to_unix_millis(ticks))
}

/// Parses a textual timestamp such as `Mon, 2 Jan 2006 15:04:05 -0700`.
///
/// The leading day name must be a known abbreviation but is not checked
/// against the date. Empty or unparseable input yields `None`.
pub fn parse_text_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim_end_matches('\0').trim();
    if text.is_empty() {
        return None;
    }
    let parsed = strip_weekday(text).and_then(|rest| {
        TEXT_LAYOUTS
            .iter()
            .find_map(|layout| DateTime::parse_from_str(rest, layout).ok())
    });
    if parsed.is_none() {
        tracing::debug!(text, "Unrecognized date layout");
    }
    parsed
}

fn strip_weekday(text: &str) -> Option<&str> {
    let (day, rest) = text.split_once(',')?;
    WEEKDAYS
        .iter()
        .any(|d| d.eq_ignore_ascii_case(day.trim()))
        .then(|| rest.trim_start())
}
