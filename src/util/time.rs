use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use super::text::trim_whitespace;

/// Layouts accepted for timestamps that carry no UTC offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y%m%dT%H%M%S%.f",
];

/// Parses an ISO 8601 timestamp.
///
/// Accepts RFC 3339 (any offset, `T` or space separator, lowercase `t`/`z`)
/// as well as offset-less extended and basic forms, which are read as UTC.
/// Surrounding whitespace is ignored.
///
/// Returns `None` when the text is not a recognizable timestamp.
pub fn parse_iso8601(s: &str) -> Option<DateTime<Utc>> {
    let s = trim_whitespace(s);
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = s.strip_suffix(['Z', 'z']).unwrap_or(s);
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(naive, format).ok())
        .map(|dt| dt.and_utc())
}

/// Formats a timestamp in RFC 3339 form with a `Z` suffix.
///
/// Fractional seconds are written only when present.
pub fn format_iso8601(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses a calendar date in `YYYY-MM-DD` or `YYYYMMDD` form.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    match s.len() {
        10 => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
        8 => NaiveDate::parse_from_str(s, "%Y%m%d").ok(),
        _ => None,
    }
}

/// Formats a calendar date as `YYYY-MM-DD`.
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
