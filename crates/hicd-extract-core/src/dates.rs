//! Date parsing for the formats HICD pages print.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\d{2}/\d{2}/\d{4}(?:[ T]+\d{1,2}:\d{2}(?::\d{2})?)?|\d{4}-\d{2}-\d{2}(?:[ T]+\d{1,2}:\d{2}(?::\d{2})?)?",
    )
    .expect("valid date regex")
});

const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d"];

/// Parse the first date found in `text`.
///
/// Accepts `DD/MM/YYYY[ HH:MM[:SS]]` and `YYYY-MM-DD[ HH:MM[:SS]]`; a date
/// without time is midnight. Surrounding text is ignored.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let token = DATE_TOKEN.find(text)?.as_str().replace('T', " ");
    let token = token.split_whitespace().collect::<Vec<_>>().join(" ");
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(&token, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(&token, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Sort key for a page date: unparsable dates map to the Unix epoch.
pub fn sort_key(text: &str) -> NaiveDateTime {
    parse_datetime(text).unwrap_or_default()
}

/// Whether the text contains a recognizable date.
pub fn has_date(text: &str) -> bool {
    parse_datetime(text).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_brazilian_formats() {
        assert_eq!(parse_datetime("15/03/2024 10:30:15"), Some(at(2024, 3, 15, 10, 30, 15)));
        assert_eq!(parse_datetime("15/03/2024 10:30"), Some(at(2024, 3, 15, 10, 30, 0)));
        assert_eq!(parse_datetime("15/03/2024"), Some(at(2024, 3, 15, 0, 0, 0)));
    }

    #[test]
    fn test_iso_formats() {
        assert_eq!(parse_datetime("2024-03-15 08:05:00"), Some(at(2024, 3, 15, 8, 5, 0)));
        assert_eq!(parse_datetime("2024-03-15T08:05"), Some(at(2024, 3, 15, 8, 5, 0)));
        assert_eq!(parse_datetime("2024-03-15"), Some(at(2024, 3, 15, 0, 0, 0)));
    }

    #[test]
    fn test_date_inside_text() {
        assert_eq!(
            parse_datetime("Data Evolução: 01/02/2024  07:45 (editado)"),
            Some(at(2024, 2, 1, 7, 45, 0))
        );
    }

    #[test]
    fn test_unparsable_sorts_as_epoch() {
        assert_eq!(parse_datetime("ontem"), None);
        assert_eq!(parse_datetime("31/02/2024"), None);
        assert_eq!(sort_key("sem data"), NaiveDateTime::default());
        assert!(sort_key("sem data") < sort_key("01/01/2000"));
    }
}
