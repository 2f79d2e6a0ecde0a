//! Parsing and formatting for the loosely formatted dates found in post
//! frontmatter. Dates without an offset are taken to be UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Parses a frontmatter date. Accepts RFC 3339, RFC 2822, and the common
/// `YYYY-MM-DD[ HH:MM[:SS]]` shapes. Returns `None` for anything else.
pub fn parse(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Formats a date as `YYYY-MM-DDTHH:MM:SS.sssZ`, the shape sitemaps and Atom
/// feeds expect.
pub fn to_iso(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_plain_date_is_utc_midnight() {
        let date = parse("2024-01-01").unwrap();
        assert_eq!("2024-01-01T00:00:00.000Z", to_iso(&date));
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(
            "2024-01-01T08:30:00.000Z",
            to_iso(&parse("2024-01-01T10:30:00+02:00").unwrap())
        );
        assert_eq!(
            "2024-05-06T07:08:00.000Z",
            to_iso(&parse("2024-05-06 07:08").unwrap())
        );
        assert_eq!(
            "2024-05-06T07:08:09.000Z",
            to_iso(&parse("2024-05-06T07:08:09").unwrap())
        );
        assert_eq!(
            "2023-12-31T00:00:00.000Z",
            to_iso(&parse("2023/12/31").unwrap())
        );
        assert_eq!(
            "2024-01-01T00:00:00.000Z",
            to_iso(&parse("Mon, 01 Jan 2024 00:00:00 +0000").unwrap())
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(None, parse(""));
        assert_eq!(None, parse("   "));
        assert_eq!(None, parse("someday"));
        assert_eq!(None, parse("2024-13-45"));
    }

    #[test]
    fn test_iso_keeps_milliseconds() {
        let date = parse("2024-01-01T00:00:00.250Z").unwrap();
        assert_eq!("2024-01-01T00:00:00.250Z", to_iso(&date));
    }
}
