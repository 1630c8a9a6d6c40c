//! DateTime parsing and formatting helpers for Cypher `localdatetime` values.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parse a timestamp as rendered by `toString(localdatetime())` into a
/// [`NaiveDateTime`].
///
/// Supported formats (attempted in order):
/// 1. ISO 8601 with sub-seconds: `"2024-01-15T10:30:00.123456789"`
/// 2. ISO 8601 without sub-seconds: `"2024-01-15T10:30:00"`
/// 3. ISO 8601 without seconds: `"2024-01-15T10:30"` (Cypher drops `:00`)
/// 4. RFC 3339 with an offset; the offset is discarded, wall time kept
/// 5. Date only (midnight): `"2024-01-15"`
///
/// Returns `None` for empty input or unrecognised formats.
pub fn parse_local_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|nd| nd.and_hms_opt(0, 0, 0))
}

/// Format a [`NaiveDateTime`] the way the store renders a `localdatetime`.
///
/// Output format: `"2024-01-15T10:30:00.000000000"` (nanosecond precision).
pub fn format_local_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.9f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|nd| nd.and_hms_opt(h, min, s))
            .unwrap()
    }

    #[test]
    fn test_parse_nanoseconds() {
        let dt = parse_local_datetime("2024-06-01T12:00:00.123456789").expect("should parse");
        assert_eq!(dt.nanosecond(), 123_456_789);
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_parse_short_fraction() {
        let dt = parse_local_datetime("2024-06-01T12:00:00.5").expect("should parse");
        assert_eq!(dt.nanosecond(), 500_000_000);
    }

    #[test]
    fn test_parse_without_seconds() {
        let dt = parse_local_datetime("2024-01-15T10:30").expect("should parse");
        assert_eq!(dt, ymd_hms(2024, 1, 15, 10, 30, 0));
    }

    #[test]
    fn test_parse_rfc3339_keeps_wall_time() {
        let dt = parse_local_datetime("2024-01-15T10:30:00+05:00").expect("should parse");
        assert_eq!(dt, ymd_hms(2024, 1, 15, 10, 30, 0));
    }

    #[test]
    fn test_parse_date_only() {
        let dt = parse_local_datetime("2024-01-15").expect("should parse");
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_local_datetime("").is_none());
        assert!(parse_local_datetime("yesterday").is_none());
        assert!(parse_local_datetime("2024-13-01").is_none());
    }

    #[test]
    fn test_format_roundtrip() {
        let dt = ymd_hms(2024, 6, 15, 8, 45, 30) + chrono::Duration::nanoseconds(1_500);
        let formatted = format_local_datetime(&dt);
        assert_eq!(formatted, "2024-06-15T08:45:30.000001500");
        assert_eq!(parse_local_datetime(&formatted), Some(dt));
    }
}
