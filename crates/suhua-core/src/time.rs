//! Taipei wall-clock helpers. Every upstream publishes and every label is
//! shown in UTC+8.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};

const TAIPEI_OFFSET_SECS: i32 = 8 * 3600;

pub fn taipei() -> FixedOffset {
    // east_opt only fails outside ±24h
    FixedOffset::east_opt(TAIPEI_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

pub fn to_taipei(at: DateTime<Utc>) -> DateTime<FixedOffset> {
    at.with_timezone(&taipei())
}

/// "2025-07-25 15:30"
pub fn format_minute(at: DateTime<Utc>) -> String {
    to_taipei(at).format("%Y-%m-%d %H:%M").to_string()
}

/// "15:30"
pub fn format_clock(at: DateTime<Utc>) -> String {
    to_taipei(at).format("%H:%M").to_string()
}

/// Parse the timestamp shapes used by CWA and TDX: RFC 3339 with offset, or
/// a naive "YYYY-MM-DD HH:MM:SS" read as Taipei time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| taipei().from_local_datetime(&naive).single())
        .map(|dt| dt.with_timezone(&Utc))
}
