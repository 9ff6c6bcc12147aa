//! Post export service.
//!
//! Streams every published post to CSV, newest first, reading the store one
//! page at a time.

use crate::io::formats::csv::CsvExportSink;
use crate::io::traits::{ExportSink, ExportableRecord};
use crate::models::{PageCursor, UserId};
use crate::storage::{ContentStore, UserDirectory};
use crate::Result;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Default number of posts fetched per store query.
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Options for an export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Posts fetched per store query. Zero is treated as one.
    pub page_size: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ExportOptions {
    /// Sets the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Result of an export run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportResult {
    /// Number of posts written.
    pub exported: usize,
}

/// Service for exporting posts to CSV.
pub struct ExportService {
    store: Arc<dyn ContentStore>,
    directory: Arc<dyn UserDirectory>,
}

impl ExportService {
    /// Creates a new export service.
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { store, directory }
    }

    /// Exports posts to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if a store query or a write fails.
    pub fn export_to_writer<W: Write>(&self, writer: W, options: &ExportOptions) -> Result<ExportResult> {
        let mut sink = Box::new(CsvExportSink::new(writer)?);
        let result = self.export_to_sink(sink.as_mut(), options)?;
        sink.finalize()?;
        Ok(result)
    }

    /// Exports posts into a sink. The sink is not finalized.
    ///
    /// # Errors
    ///
    /// Returns an error if a store query or a write fails.
    #[instrument(skip(self, sink, options), fields(page_size = options.page_size))]
    pub fn export_to_sink(
        &self,
        sink: &mut dyn ExportSink,
        options: &ExportOptions,
    ) -> Result<ExportResult> {
        let page_size = options.page_size.max(1);
        let mut authors = AuthorNames::new(self.directory.as_ref());
        let mut cursor: Option<PageCursor> = None;
        let mut result = ExportResult::default();

        loop {
            let page = self.store.published_page(cursor.as_ref(), page_size)?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(last.cursor());

            for record in &page {
                let author = authors.lookup(record.author);
                sink.write(&ExportableRecord::from_record(record, author))?;
                result.exported += 1;
            }
            metrics::counter!("postport_export_records_total").increment(page.len() as u64);

            if page.len() < page_size {
                break;
            }
        }

        info!(exported = result.exported, "Export finished");
        Ok(result)
    }

    /// Returns whether there is anything to export.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub fn has_published(&self) -> Result<bool> {
        self.store.has_published()
    }
}

/// Per-run cache of author display names.
struct AuthorNames<'a> {
    directory: &'a dyn UserDirectory,
    names: HashMap<UserId, String>,
}

impl<'a> AuthorNames<'a> {
    fn new(directory: &'a dyn UserDirectory) -> Self {
        Self {
            directory,
            names: HashMap::new(),
        }
    }

    /// Display name for `id`; empty when the user is gone or the lookup fails.
    fn lookup(&mut self, id: UserId) -> &str {
        let directory = self.directory;
        self.names.entry(id).or_insert_with(|| {
            directory.display_name(id).unwrap_or_else(|e| {
                warn!(author = %id, error = %e, "Author lookup failed during export");
                None
            })
            .unwrap_or_default()
        })
    }
}
