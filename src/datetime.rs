//! Timestamp helpers.
//!
//! Letter and notification timestamps are stored as fixed-width UTC strings
//! (`2024-01-15T10:30:00.000000Z`) so that lexical order in SQLite equals
//! chronological order.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Storage format for timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Current time in storage format.
pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Format a UTC datetime in storage format.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a client-supplied date.
///
/// Accepts RFC3339, SQLite `YYYY-MM-DD HH:MM:SS`, and plain `YYYY-MM-DD`
/// (midnight UTC).
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a client-supplied date and re-format it in storage format.
pub fn normalize_date(input: &str) -> Option<String> {
    parse_date(input).map(|dt| format_timestamp(&dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp_fixed_width() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 5, 9, 3, 7).unwrap();
        assert_eq!(format_timestamp(&dt), "2024-01-05T09:03:07.000000Z");
        assert_eq!(now_timestamp().len(), "2024-01-05T09:03:07.000000Z".len());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_date("2024-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_date("2024-03-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_date("2024-03-01 12:30:00"), Some(expected));
        assert_eq!(parse_date("2024-03-01T12:30:00"), Some(expected));
        assert_eq!(
            parse_date("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_date_invalid() {
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2024-13-01"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(
            normalize_date("2024-03-01").as_deref(),
            Some("2024-03-01T00:00:00.000000Z")
        );
        assert!(normalize_date("nope").is_none());
    }

    #[test]
    fn test_storage_order_is_chronological() {
        let a = format_timestamp(&Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap());
        let b = format_timestamp(&Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
        assert!(a < b);
    }
}
