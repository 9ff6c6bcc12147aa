//! CSV codec for the post exchange format.
//!
//! The schema is fixed: five columns named exactly `ID,Title,Content,Date,Author`
//! in that order. Quoting of delimiters, quotes and line breaks is left to the
//! `csv` crate; this module finds where each record ends and decides what a
//! header or row means.

use crate::io::traits::{ExportSink, ExportableRecord, ImportSource, RawRow, RowRead};
use crate::io::validation::RowError;
use crate::models::ContentRecord;
use crate::{Error, Result};
use std::io::{BufRead, BufReader, Read, Write};

/// Column names, in order.
pub const EXPECTED_HEADER: [&str; 5] = ["ID", "Title", "Content", "Date", "Author"];

/// Number of columns a data row must carry.
pub const COLUMN_COUNT: usize = EXPECTED_HEADER.len();

/// Outcome of checking a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderCheck {
    /// Cells match [`EXPECTED_HEADER`] exactly.
    Valid,
    /// There was no header row at all.
    Missing,
    /// A header row was present but did not match.
    Mismatch {
        /// Trimmed cells as found.
        found: Vec<String>,
    },
}

impl HeaderCheck {
    /// Returns true for [`HeaderCheck::Valid`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Converts into a result, mapping anything but `Valid` to
    /// [`Error::Schema`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] when the header is missing or mismatched.
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Valid => Ok(()),
            Self::Missing => Err(Error::Schema(format!(
                "file is empty, expected header {}",
                EXPECTED_HEADER.join(",")
            ))),
            Self::Mismatch { found } => Err(Error::Schema(format!(
                "expected header {}, found {}",
                EXPECTED_HEADER.join(","),
                found.join(",")
            ))),
        }
    }
}

/// Checks a header row.
///
/// Each cell is trimmed before comparison; names are case-sensitive and extra
/// columns are rejected.
#[must_use]
pub fn decode_header<S: AsRef<str>>(cells: &[S]) -> HeaderCheck {
    let found: Vec<String> = cells
        .iter()
        .map(|c| c.as_ref().trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    if found.len() == COLUMN_COUNT && found.iter().zip(EXPECTED_HEADER).all(|(a, b)| a == b) {
        HeaderCheck::Valid
    } else {
        HeaderCheck::Mismatch { found }
    }
}

/// Raw fields of a data row, not yet sanitized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    /// Data row number, 1-based.
    pub row: usize,
    /// Title cell.
    pub title: String,
    /// Content cell.
    pub content: String,
    /// Date cell.
    pub date: String,
    /// Author cell.
    pub author: String,
}

/// Splits a data row into its fields.
///
/// The ID cell is read and discarded; cells past the fifth are ignored.
///
/// # Errors
///
/// Returns a malformed-row error when the row has fewer than five cells or the
/// title is blank.
pub fn decode_row(raw: &RawRow) -> std::result::Result<ParsedRow, RowError> {
    if raw.cells.len() < COLUMN_COUNT {
        return Err(RowError::malformed(
            raw.number,
            format!(
                "expected {COLUMN_COUNT} columns, found {}",
                raw.cells.len()
            ),
        ));
    }

    let title = &raw.cells[1];
    if title.trim().is_empty() {
        return Err(RowError::malformed(raw.number, "title is empty"));
    }

    Ok(ParsedRow {
        row: raw.number,
        title: title.clone(),
        content: raw.cells[2].clone(),
        date: raw.cells[3].clone(),
        author: raw.cells[4].clone(),
    })
}

/// Encodes a record as the five output cells.
#[must_use]
pub fn encode_row(record: &ContentRecord, author_display_name: &str) -> [String; COLUMN_COUNT] {
    ExportableRecord::from_record(record, author_display_name).into_cells()
}

fn read_failed(e: &std::io::Error) -> Error {
    Error::Transport(format!("failed to read CSV: {e}"))
}

/// Quote state while scanning for the end of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

impl Framing {
    const fn advance(self, byte: u8) -> Self {
        match (self, byte) {
            (Self::Quoted, b'"') => Self::QuoteInQuoted,
            (Self::Quoted, _) => Self::Quoted,
            (Self::FieldStart | Self::QuoteInQuoted, b'"') => Self::Quoted,
            (_, b',' | b'\n' | b'\r') => Self::FieldStart,
            _ => Self::Unquoted,
        }
    }
}

/// Strips one trailing `\n` or `\r\n`.
fn trim_line_end(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    bytes.strip_suffix(b"\r").unwrap_or(bytes)
}

/// Parses one framed record.
fn parse_record(bytes: &[u8]) -> std::result::Result<csv::ByteRecord, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut record = csv::ByteRecord::new();
    reader.read_byte_record(&mut record)?;
    Ok(record)
}

/// Row source over any reader.
///
/// Records are framed here and only their fields are parsed by `csv`, because
/// the `csv` reader drops empty lines. An empty line is a data row without
/// cells and is reported as malformed.
pub struct CsvImportSource<R: Read> {
    input: BufReader<R>,
    buffer: Vec<u8>,
    rows: usize,
}

impl<R: Read> CsvImportSource<R> {
    /// Wraps a reader. Nothing is read until [`ImportSource::read_header`].
    pub fn new(reader: R) -> Self {
        Self {
            input: BufReader::new(reader),
            buffer: Vec::new(),
            rows: 0,
        }
    }

    /// Reads the next record into `buffer`, following line breaks inside
    /// quoted fields. Returns false at end of input.
    fn read_record(&mut self) -> std::io::Result<bool> {
        self.buffer.clear();
        let mut framing = Framing::FieldStart;
        loop {
            let start = self.buffer.len();
            if self.input.read_until(b'\n', &mut self.buffer)? == 0 {
                return Ok(!self.buffer.is_empty());
            }
            framing = self.buffer[start..]
                .iter()
                .fold(framing, |state, &byte| state.advance(byte));
            if framing != Framing::Quoted {
                return Ok(true);
            }
        }
    }
}

impl<R: Read> ImportSource for CsvImportSource<R> {
    fn read_header(&mut self) -> Result<()> {
        if !self.read_record().map_err(|e| read_failed(&e))? {
            return HeaderCheck::Missing.into_result();
        }

        let line = trim_line_end(&self.buffer);
        if line.is_empty() {
            return decode_header(&[""]).into_result();
        }
        let record = parse_record(line)
            .map_err(|e| Error::Schema(format!("unreadable header row: {e}")))?;
        let cells: Vec<String> = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        decode_header(&cells).into_result()
    }

    fn next_row(&mut self) -> Result<Option<RowRead>> {
        if !self.read_record().map_err(|e| read_failed(&e))? {
            return Ok(None);
        }
        self.rows += 1;
        let number = self.rows;

        let line = trim_line_end(&self.buffer);
        if line.is_empty() {
            return Ok(Some(Err(RowError::malformed(number, "blank line"))));
        }
        let record = match parse_record(line) {
            Ok(record) => record,
            Err(e) => return Ok(Some(Err(RowError::malformed(number, e.to_string())))),
        };

        let cells: std::result::Result<Vec<String>, _> = record
            .iter()
            .map(|field| std::str::from_utf8(field).map(str::to_string))
            .collect();

        Ok(Some(match cells {
            Ok(cells) => Ok(RawRow::new(number, cells)),
            Err(e) => Err(RowError::malformed(number, format!("row is not valid UTF-8: {e}"))),
        }))
    }
}

/// CSV export sink.
///
/// The header row is written on construction, so an export with no records is
/// still a well-formed file.
pub struct CsvExportSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvExportSink<W> {
    /// Creates the sink and writes the header row.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn new(writer: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);

        writer
            .write_record(EXPECTED_HEADER)
            .map_err(|e| Error::OperationFailed {
                operation: "write_csv_header".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self { writer })
    }

    /// Flushes and returns the inner writer.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered output cannot be flushed.
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner().map_err(|e| Error::OperationFailed {
            operation: "flush_csv".to_string(),
            cause: e.error().to_string(),
        })
    }
}

impl<W: Write> ExportSink for CsvExportSink<W> {
    fn write(&mut self, record: &ExportableRecord) -> Result<()> {
        self.writer
            .write_record([
                &record.id,
                &record.title,
                &record.content,
                &record.date,
                &record.author,
            ])
            .map_err(|e| Error::OperationFailed {
                operation: "write_csv".to_string(),
                cause: e.to_string(),
            })
    }

    fn finalize(mut self: Box<Self>) -> Result<()> {
        self.writer.flush().map_err(|e| Error::OperationFailed {
            operation: "flush_csv".to_string(),
            cause: e.to_string(),
        })
    }
}
