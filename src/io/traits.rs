//! Core traits for import/export operations.
//!
//! Defines the [`ImportSource`] and [`ExportSink`] traits that the CSV codec
//! implements. The import pipeline only ever sees rows through
//! [`ImportSource`], so alternative readers (an in-memory grid, a spreadsheet
//! adapter) can be plugged in without touching the orchestrator.

use crate::Result;
use crate::io::validation::RowError;
use crate::models::ContentRecord;

/// One data row as read from the source, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based data row number (the header row is not counted).
    pub number: usize,
    /// Cell values, untrimmed.
    pub cells: Vec<String>,
}

impl RawRow {
    /// Creates a row.
    #[must_use]
    pub const fn new(number: usize, cells: Vec<String>) -> Self {
        Self { number, cells }
    }
}

/// A read attempt for one row: the row itself, or why it could not be decoded.
pub type RowRead = std::result::Result<RawRow, RowError>;

/// Source of rows for import.
///
/// # Lifecycle
///
/// 1. `read_header()` exactly once; an error aborts the import
/// 2. `next_row()` until it yields `Ok(None)`
///
/// `next_row` distinguishes a row that is unreadable on its own (inner
/// `Err`, counted and skipped) from a stream that can no longer be read
/// (outer `Err`, ends the run).
pub trait ImportSource {
    /// Reads and validates the header row.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Schema`] when the header is missing or does not
    /// match, or [`crate::Error::Transport`] when the stream cannot be read.
    fn read_header(&mut self) -> Result<()>;

    /// Reads the next data row.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying stream fails.
    fn next_row(&mut self) -> Result<Option<RowRead>>;
}

/// A post flattened for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportableRecord {
    /// Post ID.
    pub id: String,
    /// Title.
    pub title: String,
    /// Body, verbatim.
    pub content: String,
    /// Date in the store's native format.
    pub date: String,
    /// Author display name (empty if the author no longer exists).
    pub author: String,
}

impl ExportableRecord {
    /// Flattens a record using an already-resolved author display name.
    #[must_use]
    pub fn from_record(record: &ContentRecord, author_display_name: impl Into<String>) -> Self {
        Self {
            id: record.id.to_string(),
            title: record.title.clone(),
            content: record.body.clone(),
            date: record.published_at_display(),
            author: author_display_name.into(),
        }
    }

    /// Returns the cells in column order.
    #[must_use]
    pub fn into_cells(self) -> [String; 5] {
        [self.id, self.title, self.content, self.date, self.author]
    }
}

/// Sink for exported posts.
///
/// # Lifecycle
///
/// 1. Create sink with output destination (writes the header)
/// 2. Call `write()` for each record
/// 3. Call `finalize()` to flush
pub trait ExportSink {
    /// Writes a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or I/O fails.
    fn write(&mut self, record: &ExportableRecord) -> Result<()>;

    /// Flushes buffered output. Consumes the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O fails.
    fn finalize(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PostId, PostStatus, UserId};
    use chrono::NaiveDate;

    #[test]
    fn test_exportable_from_record() {
        let record = ContentRecord {
            id: PostId::new(12),
            title: "Title".to_string(),
            body: "<p>Body</p>".to_string(),
            published_at: NaiveDate::from_ymd_opt(2022, 12, 31)
                .and_then(|d| d.and_hms_opt(23, 59, 59))
                .unwrap(),
            author: UserId::new(3),
            status: PostStatus::Published,
        };

        let flat = ExportableRecord::from_record(&record, "Jane");
        assert_eq!(flat.id, "12");
        assert_eq!(flat.date, "2022-12-31 23:59:59");
        assert_eq!(flat.author, "Jane");
        assert_eq!(flat.content, "<p>Body</p>");
    }
}
