//! Permissive date parsing.
//!
//! Accepts the textual date forms people actually put in spreadsheets and
//! normalizes them to a second-precision [`NaiveDateTime`] in UTC. Offsets are
//! honoured and converted; values without an offset are taken as-is.

use chrono::{Datelike, DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;

/// Date-time layouts tried in order. `%B` accepts full and short month names.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %I:%M %p",
    "%Y-%m-%d %I:%M:%S %p",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M %p",
    "%B %d %Y %H:%M",
    "%d %B %Y %H:%M:%S",
    "%d %B %Y %H:%M",
    "%d %B %Y %I:%M %p",
];

/// Date-only layouts; the time becomes midnight.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
];

/// Two-digit-year fallbacks, tried only when the four-digit forms fail.
const SHORT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%d.%m.%y"];

/// Offset-carrying layouts that are neither RFC 3339 nor RFC 2822.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%dT%H:%M:%S%z",
];

static ORDINAL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").ok());
static WEEKDAY_PREFIX: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)^(mon|tue|tues|wed|thu|thur|thurs|fri|sat|sun)(day|nesday|rsday|urday)?\.?,?\s+")
        .ok()
});

/// Parses a loosely formatted date.
///
/// `now` anchors the relative keywords `now`, `today`, `yesterday` and
/// `tomorrow`. Returns `None` for anything unrecognized. Sub-second precision
/// is discarded.
#[must_use]
pub fn parse_loose_datetime(input: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    parse_relative(trimmed, now)
        .or_else(|| parse_unix(trimmed))
        .or_else(|| parse_with_offset(trimmed))
        .or_else(|| parse_naive(&normalize(trimmed)))
        .and_then(|dt| dt.with_nanosecond(0))
}

fn parse_relative(input: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let midnight = |date: NaiveDate| date.and_time(NaiveTime::MIN);
    match input.to_ascii_lowercase().as_str() {
        "now" => Some(now),
        "today" | "midnight" => Some(midnight(now.date())),
        "yesterday" => Some(midnight(now.date()) - Duration::days(1)),
        "tomorrow" => Some(midnight(now.date()) + Duration::days(1)),
        _ => None,
    }
}

fn parse_unix(input: &str) -> Option<NaiveDateTime> {
    let secs: i64 = input.strip_prefix('@')?.trim().parse().ok()?;
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

fn parse_with_offset(input: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(input)
        .or_else(|_| DateTime::parse_from_rfc2822(input))
        .ok()
        .or_else(|| {
            OFFSET_FORMATS
                .iter()
                .find_map(|fmt| DateTime::parse_from_str(input, fmt).ok())
        })
        .map(|dt| dt.naive_utc())
}

/// Drops a leading weekday, ordinal suffixes and repeated whitespace.
fn normalize(input: &str) -> String {
    let mut text = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Some(re) = WEEKDAY_PREFIX.as_ref() {
        text = re.replace(&text, "").into_owned();
    }
    if let Some(re) = ORDINAL.as_ref() {
        text = re.replace_all(&text, "$1").into_owned();
    }
    text
}

fn parse_naive(input: &str) -> Option<NaiveDateTime> {
    let plausible = |dt: &NaiveDateTime| dt.year() >= 1000;

    DATETIME_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .find(plausible)
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .filter_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
                .find(plausible)
        })
        .or_else(|| {
            SHORT_YEAR_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}
