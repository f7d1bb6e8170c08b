//! Date parsing under the explicit set of accepted formats.
//!
//! Both the validator and the transformer go through [`parse_date`], so a
//! value the validator accepted can never fail to coerce later. Source
//! feeds carry dates in a handful of spellings (slash, dash and compact
//! digit forms); anything outside the accepted set is a violation, never a
//! silent null.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Accepted date formats, tried in order.
const DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%Y%m%d",
    "%m%d%Y",
    "%d%m%Y",
];

/// Plausible year window; feeds occasionally carry typo years like 19344.
const YEAR_MIN: i32 = 1900;
const YEAR_MAX: i32 = 2100;

/// Strips decoration so "2024.01.05" still matches.
static DECORATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\d/\-]").expect("valid regex"));

/// A date value that failed to parse, with a human-readable reason.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DateParseError {
    #[error("empty date value")]
    Empty,

    #[error("year {0} out of range (must be between {YEAR_MIN} and {YEAR_MAX})")]
    YearOutOfRange(i32),

    #[error("unrecognized date format: '{0}'")]
    Unrecognized(String),
}

/// Parse a raw date string under the accepted formats.
///
/// Spreadsheet exports leak float artifacts ("20101012.0"); the integer
/// part is kept. Digit-only values get a month-first compact reading,
/// including the 7-digit form with a 1-digit month ("6031987" is
/// 06/03/1987). Otherwise decoration characters (anything other than
/// digits, `/` and `-`) are stripped and each format is tried in order.
/// Calendar validity (month 1-12, day bounds, leap years) comes from
/// chrono.
pub fn parse_date(value: &str) -> Result<NaiveDate, DateParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DateParseError::Empty);
    }

    let normalized = strip_float_artifact(trimmed);

    let mut out_of_range = None;
    match parse_compact_digits(normalized) {
        Some(Ok(date)) => return Ok(date),
        Some(Err(year)) => out_of_range = Some(year),
        None => {}
    }

    let cleaned = DECORATION.replace_all(normalized, "");
    if cleaned.is_empty() {
        return Err(DateParseError::Unrecognized(trimmed.to_string()));
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            if date.year() < YEAR_MIN || date.year() > YEAR_MAX {
                out_of_range = Some(date.year());
                continue;
            }
            return Ok(date);
        }
    }

    match out_of_range {
        Some(year) => Err(DateParseError::YearOutOfRange(year)),
        None => Err(DateParseError::Unrecognized(trimmed.to_string())),
    }
}

/// Drop a purely-numeric fractional part, keeping the integer digits.
fn strip_float_artifact(value: &str) -> &str {
    match value.split_once('.') {
        Some((int_part, frac))
            if !int_part.is_empty()
                && !frac.is_empty()
                && int_part.bytes().all(|b| b.is_ascii_digit())
                && frac.bytes().all(|b| b.is_ascii_digit()) =>
        {
            int_part
        }
        _ => value,
    }
}

/// Month-first reading of a digit-only value: mmddyyyy, mddyyyy (1-digit
/// month) or mmddyy (2-digit years land in 20xx).
///
/// `None` means the value is not a compact date (wrong shape, or a month
/// the reading cannot produce) and the format loop decides; `Err` carries
/// a calendar-valid year outside the accepted window.
fn parse_compact_digits(value: &str) -> Option<Result<NaiveDate, i32>> {
    if !(6..=8).contains(&value.len()) || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (month, day, year) = if value.len() == 7 {
        (&value[0..1], &value[1..3], &value[3..])
    } else {
        (&value[0..2], &value[2..4], &value[4..])
    };
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    let mut year: i32 = year.parse().ok()?;
    if year < 100 {
        year += 2000;
    }

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    if year < YEAR_MIN || year > YEAR_MAX {
        return Some(Err(year));
    }
    Some(Ok(date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_iso_format() {
        assert_eq!(parse_date("2024-01-05"), Ok(d(2024, 1, 5)));
    }

    #[test]
    fn test_slash_formats() {
        assert_eq!(parse_date("01/05/2024"), Ok(d(2024, 1, 5)));
        assert_eq!(parse_date("2024/01/05"), Ok(d(2024, 1, 5)));
        // Day-first only matches once month-first is impossible.
        assert_eq!(parse_date("25/12/2023"), Ok(d(2023, 12, 25)));
    }

    #[test]
    fn test_compact_format() {
        assert_eq!(parse_date("20240105"), Ok(d(2024, 1, 5)));
        assert_eq!(parse_date("12253112"), Err(DateParseError::YearOutOfRange(3112)));
    }

    #[test]
    fn test_seven_digit_compact_has_one_digit_month() {
        assert_eq!(parse_date("6031987"), Ok(d(1987, 6, 3)));
        assert_eq!(parse_date("1251990"), Ok(d(1990, 1, 25)));
    }

    #[test]
    fn test_six_digit_compact_year_lands_in_2000s() {
        assert_eq!(parse_date("010520"), Ok(d(2020, 1, 5)));
    }

    #[test]
    fn test_float_artifact_truncated() {
        assert_eq!(parse_date("20101012.0"), Ok(d(2010, 10, 12)));
        assert_eq!(parse_date("6031987.0"), Ok(d(1987, 6, 3)));
    }

    #[test]
    fn test_decoration_stripped() {
        assert_eq!(parse_date("  2024-01-05  "), Ok(d(2024, 1, 5)));
        assert_eq!(parse_date("2024.01.05"), Ok(d(2024, 1, 5)));
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(parse_date(""), Err(DateParseError::Empty));
        assert_eq!(parse_date("   "), Err(DateParseError::Empty));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            parse_date("not-a-date"),
            Err(DateParseError::Unrecognized(_))
        ));
        assert!(matches!(
            parse_date("13/13/2024"),
            Err(DateParseError::Unrecognized(_))
        ));
    }

    #[test]
    fn test_year_window() {
        assert!(matches!(
            parse_date("0099-01-01"),
            Err(DateParseError::YearOutOfRange(99))
        ));
        assert_eq!(parse_date("1900-01-01"), Ok(d(1900, 1, 1)));
        assert_eq!(parse_date("2100-12-31"), Ok(d(2100, 12, 31)));
    }

    #[test]
    fn test_leap_day() {
        assert_eq!(parse_date("2024-02-29"), Ok(d(2024, 2, 29)));
        assert!(matches!(
            parse_date("2023-02-29"),
            Err(DateParseError::Unrecognized(_))
        ));
    }
}
