//! Post import service.
//!
//! Runs a CSV file through header validation, per-row decoding, normalization,
//! author resolution and storage. Rows are independent: a bad row is counted
//! and skipped, never fatal. Only an unreadable stream or a wrong header stop
//! the run before the first row.

#![allow(clippy::needless_pass_by_value)]

use crate::io::author::AuthorResolver;
use crate::io::formats::csv::{CsvImportSource, decode_row};
use crate::io::traits::{ImportSource, RowRead};
use crate::io::validation::{RowError, RowErrorKind, RowNormalizer};
use crate::models::{NewPost, PostId, UserId};
use crate::storage::{ContentStore, UserDirectory};
use crate::{Error, Result};
use chrono::{NaiveDateTime, Utc};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Options for an import run.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate and resolve without writing to the store. Rows that would
    /// have been written count as imported.
    pub dry_run: bool,
    /// Clock for relative dates; defaults to the current UTC time.
    pub now: Option<NaiveDateTime>,
}

impl ImportOptions {
    /// Enables or disables dry run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Pins the clock used for `now`, `today` and friends.
    #[must_use]
    pub const fn with_clock(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }
}

/// Progress callback for import runs.
pub type ProgressCallback = Box<dyn Fn(&ImportProgress) + Send>;

/// Progress information, reported after every row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportProgress {
    /// Data row just processed (1-based).
    pub current: usize,
    /// Rows imported so far.
    pub imported: usize,
    /// Rows failed so far.
    pub errors: usize,
}

/// Running counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportTally {
    /// Rows written (or, in a dry run, that would have been).
    pub imported: usize,
    /// Rows rejected.
    pub errors: usize,
}

impl ImportTally {
    /// Total rows seen.
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.imported + self.errors
    }
}

/// Stage an import run is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    /// Reading and checking the header row.
    ValidatingHeader,
    /// Folding over data rows.
    ProcessingRows,
    /// Selecting the outcome.
    Finalizing,
}

impl ImportPhase {
    /// Returns the phase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidatingHeader => "validating_header",
            Self::ProcessingRows => "processing_rows",
            Self::Finalizing => "finalizing",
        }
    }
}

/// Terminal state of an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Every row imported.
    FullSuccess,
    /// Some rows imported, some failed.
    PartialSuccess,
    /// No row imported (including a file with no data rows).
    TotalFailure,
    /// The header did not match; no row was read.
    AbortedInvalidHeader,
    /// The input could not be opened or read; no row was read.
    AbortedIoFailure,
}

impl ImportOutcome {
    /// Selects the outcome for a completed row pass.
    #[must_use]
    pub const fn from_tally(tally: ImportTally) -> Self {
        match (tally.imported, tally.errors) {
            (0, _) => Self::TotalFailure,
            (_, 0) => Self::FullSuccess,
            _ => Self::PartialSuccess,
        }
    }

    /// Returns whether the run stopped before processing rows.
    #[must_use]
    pub const fn is_aborted(self) -> bool {
        matches!(self, Self::AbortedInvalidHeader | Self::AbortedIoFailure)
    }

    /// Returns the outcome name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FullSuccess => "full_success",
            Self::PartialSuccess => "partial_success",
            Self::TotalFailure => "total_failure",
            Self::AbortedInvalidHeader => "aborted_invalid_header",
            Self::AbortedIoFailure => "aborted_io_failure",
        }
    }
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Terminal state.
    pub outcome: ImportOutcome,
    /// Final counts.
    pub tally: ImportTally,
    /// One entry per failed row, in file order.
    pub failures: Vec<RowError>,
    /// IDs of the posts created, in file order. Empty for dry runs.
    pub created: Vec<PostId>,
    /// Why the run was aborted, if it was.
    pub abort_reason: Option<String>,
}

impl ImportReport {
    fn aborted(outcome: ImportOutcome, reason: &Error) -> Self {
        Self {
            outcome,
            tally: ImportTally::default(),
            failures: Vec::new(),
            created: Vec::new(),
            abort_reason: Some(reason.to_string()),
        }
    }
}

/// Service for importing posts from CSV.
pub struct ImportService {
    store: Arc<dyn ContentStore>,
    directory: Arc<dyn UserDirectory>,
}

impl ImportService {
    /// Creates a new import service.
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { store, directory }
    }

    /// Imports posts from a file.
    ///
    /// Failing to open the file yields [`ImportOutcome::AbortedIoFailure`].
    #[must_use]
    pub fn import_from_path(
        &self,
        path: &Path,
        operator: UserId,
        options: &ImportOptions,
        progress: Option<ProgressCallback>,
    ) -> ImportReport {
        match open_input(path) {
            Ok(file) => self.import_from_reader(file, operator, options, progress),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Import aborted: input unreadable");
                record_outcome(ImportOutcome::AbortedIoFailure);
                ImportReport::aborted(ImportOutcome::AbortedIoFailure, &e)
            },
        }
    }

    /// Imports posts from CSV bytes.
    #[must_use]
    pub fn import_from_reader<R: Read>(
        &self,
        reader: R,
        operator: UserId,
        options: &ImportOptions,
        progress: Option<ProgressCallback>,
    ) -> ImportReport {
        let mut source = CsvImportSource::new(reader);
        self.import_from_source(&mut source, operator, options, progress)
    }

    /// Imports posts from a row source.
    ///
    /// `operator` is the author used when a row's author name matches nobody.
    #[must_use]
    #[instrument(skip(self, source, options, progress), fields(dry_run = options.dry_run))]
    pub fn import_from_source(
        &self,
        source: &mut dyn ImportSource,
        operator: UserId,
        options: &ImportOptions,
        progress: Option<ProgressCallback>,
    ) -> ImportReport {
        debug!(phase = ImportPhase::ValidatingHeader.as_str(), "Import phase");
        if let Err(e) = source.read_header() {
            let outcome = match e {
                Error::Schema(_) => ImportOutcome::AbortedInvalidHeader,
                _ => ImportOutcome::AbortedIoFailure,
            };
            warn!(outcome = outcome.as_str(), error = %e, "Import aborted before first row");
            record_outcome(outcome);
            return ImportReport::aborted(outcome, &e);
        }

        debug!(phase = ImportPhase::ProcessingRows.as_str(), "Import phase");
        let normalizer = RowNormalizer::new(options.now.unwrap_or_else(|| Utc::now().naive_utc()));
        let resolver = AuthorResolver::new(self.directory.as_ref(), operator);

        let mut tally = ImportTally::default();
        let mut failures = Vec::new();
        let mut created = Vec::new();

        loop {
            let read = match source.next_row() {
                Ok(Some(read)) => read,
                Ok(None) => break,
                Err(e) => {
                    // The stream is gone; keep what was imported and stop.
                    let failure = RowError::malformed(tally.processed() + 1, e.to_string());
                    warn!(row = failure.row, error = %e, "Import stream failed mid-file");
                    record_row(Err(failure.kind));
                    tally.errors += 1;
                    failures.push(failure);
                    break;
                },
            };

            let current = match &read {
                Ok(raw) => raw.number,
                Err(err) => err.row,
            };
            match self.process_row(read, &normalizer, &resolver, options) {
                Ok(id) => {
                    tally.imported += 1;
                    created.extend(id);
                    record_row(Ok(()));
                },
                Err(failure) => {
                    warn!(
                        row = failure.row,
                        kind = failure.kind.as_str(),
                        reason = %failure.message,
                        "Import row rejected"
                    );
                    tally.errors += 1;
                    record_row(Err(failure.kind));
                    failures.push(failure);
                },
            }

            if let Some(ref cb) = progress {
                cb(&ImportProgress {
                    current,
                    imported: tally.imported,
                    errors: tally.errors,
                });
            }
        }

        debug!(phase = ImportPhase::Finalizing.as_str(), "Import phase");
        let outcome = ImportOutcome::from_tally(tally);
        record_outcome(outcome);
        info!(
            outcome = outcome.as_str(),
            imported = tally.imported,
            errors = tally.errors,
            "Import finished"
        );

        ImportReport {
            outcome,
            tally,
            failures,
            created,
            abort_reason: None,
        }
    }

    /// Runs one row through decode, normalize, resolve and store.
    ///
    /// Returns the new post ID, or `None` in a dry run.
    fn process_row(
        &self,
        read: RowRead,
        normalizer: &RowNormalizer,
        resolver: &AuthorResolver<'_>,
        options: &ImportOptions,
    ) -> std::result::Result<Option<PostId>, RowError> {
        let raw = read?;
        let parsed = decode_row(&raw)?;
        let draft = normalizer.normalize(&parsed)?;
        let author = resolver.resolve(&draft.author_name_raw);
        let row = draft.row;
        let post = NewPost::published(draft.title, draft.content, draft.published_at, author);

        if options.dry_run {
            return Ok(None);
        }

        self.store
            .insert(&post)
            .map(Some)
            .map_err(|e| RowError::persistence(row, e.to_string()))
    }
}

fn open_input(path: &Path) -> Result<std::io::BufReader<std::fs::File>> {
    let file = std::fs::File::open(path).map_err(|e| {
        Error::Transport(format!("cannot open {}: {e}", path.display()))
    })?;
    Ok(std::io::BufReader::new(file))
}

fn record_row(result: std::result::Result<(), RowErrorKind>) {
    match result {
        Ok(()) => metrics::counter!("postport_import_rows_total", "result" => "imported")
            .increment(1),
        Err(kind) => metrics::counter!(
            "postport_import_rows_total",
            "result" => "error",
            "kind" => kind.as_str()
        )
        .increment(1),
    }
}

fn record_outcome(outcome: ImportOutcome) {
    metrics::counter!("postport_import_runs_total", "outcome" => outcome.as_str()).increment(1);
}
