//! Import/Export I/O subsystem.
//!
//! Moves posts between the content store and the fixed five-column CSV
//! format.
//!
//! # Architecture
//!
//! - **Codec** ([`formats::csv`]) implements [`ImportSource`] and [`ExportSink`]
//! - **Normalization** ([`validation`], [`dates`], [`author`]) turns raw cells
//!   into a storable post
//! - **Services** orchestrate the codec, normalization and storage
//!
//! # Import pipeline
//!
//! ```text
//! bytes -> header check -> decode_row -> normalize -> resolve author -> store
//!                                 \___________ any failure ___________/
//!                                              counted, row skipped
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use postport::io::{ImportOptions, ImportService};
//!
//! let report = service.import_from_path(path, operator, &ImportOptions::default(), None);
//! println!("{}: {} imported, {} failed", report.outcome, report.tally.imported, report.tally.errors);
//! ```

pub mod author;
pub mod dates;
pub mod formats;
pub mod services;
pub mod traits;
pub mod validation;

// Re-exports for convenience
pub use author::{AuthorMatch, AuthorResolver};
pub use dates::parse_loose_datetime;
pub use formats::csv::{CsvExportSink, CsvImportSource, EXPECTED_HEADER, ParsedRow};
pub use services::export::{DEFAULT_PAGE_SIZE, ExportOptions, ExportResult, ExportService};
pub use services::import::{
    ImportOptions, ImportOutcome, ImportPhase, ImportProgress, ImportReport, ImportService,
    ImportTally, ProgressCallback,
};
pub use traits::{ExportSink, ExportableRecord, ImportSource, RawRow};
pub use validation::{ContentRecordDraft, HtmlSanitizer, RowError, RowErrorKind, RowNormalizer};
