//! Row normalization.
//!
//! Turns the raw fields of a [`ParsedRow`] into a [`ContentRecordDraft`]:
//! plain-text fields are stripped of markup and whitespace noise, the body is
//! passed through an HTML allow-list and the date is normalized. A row either
//! normalizes completely or yields the first [`RowError`] encountered.

use crate::io::dates::parse_loose_datetime;
use crate::io::formats::csv::ParsedRow;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Why a single row was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowErrorKind {
    /// Too few cells, an empty title or undecodable bytes.
    Malformed,
    /// The date cell could not be parsed.
    InvalidDate,
    /// The store refused the record.
    Persistence,
}

impl RowErrorKind {
    /// Returns the kind as a short label, used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::InvalidDate => "invalid_date",
            Self::Persistence => "persistence",
        }
    }
}

impl fmt::Display for RowErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable failure tied to one data row.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("row {row}: {kind}: {message}")]
pub struct RowError {
    /// Data row number, 1-based, header excluded.
    pub row: usize,
    /// Failure category.
    pub kind: RowErrorKind,
    /// Human-readable detail.
    pub message: String,
}

impl RowError {
    /// Creates a row error.
    #[must_use]
    pub fn new(row: usize, kind: RowErrorKind, message: impl Into<String>) -> Self {
        Self {
            row,
            kind,
            message: message.into(),
        }
    }

    /// Creates a [`RowErrorKind::Malformed`] error.
    #[must_use]
    pub fn malformed(row: usize, message: impl Into<String>) -> Self {
        Self::new(row, RowErrorKind::Malformed, message)
    }

    /// Creates a [`RowErrorKind::InvalidDate`] error.
    #[must_use]
    pub fn invalid_date(row: usize, message: impl Into<String>) -> Self {
        Self::new(row, RowErrorKind::InvalidDate, message)
    }

    /// Creates a [`RowErrorKind::Persistence`] error.
    #[must_use]
    pub fn persistence(row: usize, message: impl Into<String>) -> Self {
        Self::new(row, RowErrorKind::Persistence, message)
    }
}

static SCRIPT_OR_STYLE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").ok());
static TAG: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").ok());

/// Reduces a string to single-line plain text.
///
/// Removes `script`/`style` elements with their contents and any other tags,
/// drops control characters, collapses whitespace runs to one space and trims.
#[must_use]
pub fn sanitize_text(input: &str) -> String {
    let mut text = input.to_string();
    for pattern in [&*SCRIPT_OR_STYLE, &*TAG].into_iter().flatten() {
        text = pattern.replace_all(&text, "").into_owned();
    }

    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if c.is_control() {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

/// HTML allow-list applied to post bodies.
pub struct HtmlSanitizer {
    builder: ammonia::Builder<'static>,
}

impl Default for HtmlSanitizer {
    fn default() -> Self {
        let mut builder = ammonia::Builder::default();
        builder
            .add_tags(&["figure", "figcaption"])
            .add_generic_attributes(&["class", "id"])
            .add_tag_attributes("img", &["loading"])
            .link_rel(None);
        Self { builder }
    }
}

impl HtmlSanitizer {
    /// Creates the default allow-list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitizes a fragment. Never fails; disallowed markup is dropped.
    #[must_use]
    pub fn clean(&self, html: &str) -> String {
        self.builder.clean(html).to_string()
    }
}

impl fmt::Debug for HtmlSanitizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlSanitizer").finish_non_exhaustive()
    }
}

/// A normalized row, ready for author resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecordDraft {
    /// Data row number.
    pub row: usize,
    /// Plain-text title, non-empty.
    pub title: String,
    /// Sanitized body HTML.
    pub content: String,
    /// Normalized publish timestamp.
    pub published_at: NaiveDateTime,
    /// Plain-text author name as given, possibly empty.
    pub author_name_raw: String,
}

/// Normalizes parsed rows.
///
/// Relative dates (`now`, `yesterday`) are evaluated against the clock the
/// normalizer was created with, so one import run sees a single "now".
#[derive(Debug)]
pub struct RowNormalizer {
    html: HtmlSanitizer,
    now: NaiveDateTime,
}

impl RowNormalizer {
    /// Creates a normalizer with a fixed clock.
    #[must_use]
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            html: HtmlSanitizer::new(),
            now,
        }
    }

    /// Normalizes a row.
    ///
    /// # Errors
    ///
    /// Returns [`RowErrorKind::Malformed`] if the title is empty once markup is
    /// removed, or [`RowErrorKind::InvalidDate`] if the date cannot be parsed.
    pub fn normalize(&self, parsed: &ParsedRow) -> Result<ContentRecordDraft, RowError> {
        let title = sanitize_text(&parsed.title);
        if title.is_empty() {
            return Err(RowError::malformed(
                parsed.row,
                "title is empty after sanitization",
            ));
        }

        let date = sanitize_text(&parsed.date);
        let published_at = parse_loose_datetime(&date, self.now).ok_or_else(|| {
            RowError::invalid_date(parsed.row, format!("unrecognized date '{date}'"))
        })?;

        Ok(ContentRecordDraft {
            row: parsed.row,
            title,
            content: self.html.clean(&parsed.content),
            published_at,
            author_name_raw: sanitize_text(&parsed.author),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use test_case::test_case;

    fn clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    fn parsed(title: &str, content: &str, date: &str, author: &str) -> ParsedRow {
        ParsedRow {
            row: 3,
            title: title.to_string(),
            content: content.to_string(),
            date: date.to_string(),
            author: author.to_string(),
        }
    }

    #[test_case("  Hello   world  ", "Hello world" ; "collapses spaces")]
    #[test_case("Line\none\ttab", "Line one tab" ; "newlines and tabs")]
    #[test_case("<b>Bold</b> move", "Bold move" ; "strips tags")]
    #[test_case("Hi<script>alert(1)</script>", "Hi" ; "drops script body")]
    #[test_case("a\u{0}b\u{7}c", "abc" ; "drops control characters")]
    #[test_case("Café ☕", "Café ☕" ; "keeps unicode")]
    fn test_sanitize_text(input: &str, expected: &str) {
        assert_eq!(sanitize_text(input), expected);
    }

    #[test]
    fn test_html_sanitizer_keeps_safe_markup() {
        let html = HtmlSanitizer::new();
        assert_eq!(
            html.clean("<p class=\"lead\"><strong>Hi</strong> <em>there</em></p>"),
            "<p class=\"lead\"><strong>Hi</strong> <em>there</em></p>"
        );
    }

    #[test_case("<p>See <a href=\"https://example.com/post\">this</a></p>" ; "link")]
    #[test_case("<p><img src=\"https://example.com/a.png\" alt=\"Chart\"></p>" ; "image")]
    fn test_html_sanitizer_leaves_allowed_attributes_alone(input: &str) {
        assert_eq!(HtmlSanitizer::new().clean(input), input);
    }

    #[test]
    fn test_html_sanitizer_drops_script_urls() {
        let cleaned = HtmlSanitizer::new().clean("<a href=\"javascript:steal()\">x</a>");
        assert_eq!(cleaned, "<a>x</a>");
    }

    #[test]
    fn test_html_sanitizer_removes_scripts_and_handlers() {
        let html = HtmlSanitizer::new();
        let cleaned = html.clean("<p onclick=\"steal()\">x</p><script>alert(1)</script>");
        assert_eq!(cleaned, "<p>x</p>");
    }

    #[test]
    fn test_normalize_full_row() {
        let normalizer = RowNormalizer::new(clock());
        let draft = normalizer
            .normalize(&parsed(
                " <i>My</i> post ",
                "<p>Body</p>",
                "2024-01-05 10:30",
                " Jane  Doe ",
            ))
            .unwrap();

        assert_eq!(draft.row, 3);
        assert_eq!(draft.title, "My post");
        assert_eq!(draft.content, "<p>Body</p>");
        assert_eq!(
            draft.published_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-01-05 10:30:00"
        );
        assert_eq!(draft.author_name_raw, "Jane Doe");
    }

    #[test]
    fn test_normalize_rejects_markup_only_title() {
        let normalizer = RowNormalizer::new(clock());
        let err = normalizer
            .normalize(&parsed("<br/>", "", "2024-01-05", ""))
            .unwrap_err();
        assert_eq!(err.kind, RowErrorKind::Malformed);
    }

    #[test]
    fn test_normalize_rejects_bad_date() {
        let normalizer = RowNormalizer::new(clock());
        let err = normalizer
            .normalize(&parsed("Title", "", "not-a-date", "jdoe"))
            .unwrap_err();
        assert_eq!(err.kind, RowErrorKind::InvalidDate);
        assert_eq!(err.row, 3);
        assert!(err.to_string().contains("not-a-date"));
    }

    #[test]
    fn test_row_error_display() {
        let err = RowError::persistence(9, "disk full");
        assert_eq!(err.to_string(), "row 9: persistence: disk full");
    }
}
