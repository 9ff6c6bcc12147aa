//! # Postport
//!
//! Bidirectional CSV synchronization for a post content store.
//!
//! Postport moves published posts out of a content store as CSV and brings CSV
//! files back in as new posts. The import side is the interesting half: every
//! row is parsed, sanitized, date-normalized and author-resolved on its own, so
//! one bad row never sinks the batch and partial success is reported to the
//! caller.
//!
//! ## Features
//!
//! - Fixed five-column CSV schema (`ID,Title,Content,Date,Author`)
//! - Fault-tolerant import with per-row diagnostics and a coarse outcome signal
//! - Paginated export in date-descending order
//! - HTML sanitization of imported bodies, permissive date parsing
//! - Anti-forgery tokens and capability checks on every action
//! - License activation gate backed by a remote key authority
//!
//! ## Example
//!
//! ```rust,ignore
//! use postport::io::{ImportOptions, ImportService};
//!
//! let service = ImportService::new(store.clone(), directory.clone());
//! let report = service.import_from_path(path, operator.id(), &ImportOptions::default(), None);
//! println!("{}: {} imported, {} errors", report.outcome, report.tally.imported, report.tally.errors);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod actions;
pub mod config;
pub mod io;
pub mod license;
pub mod models;
pub mod observability;
pub mod security;
pub mod storage;

// Re-exports for convenience
pub use actions::{ActionContext, ActionResponse};
pub use config::{FeatureFlags, PostportConfig};
pub use io::{ExportService, ImportOutcome, ImportReport, ImportService};
pub use models::{ContentRecord, NewPost, PostId, PostStatus, User, UserId};
pub use storage::{ContentStore, MemoryStore, SqliteStore, UserDirectory};

/// Error type for postport operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed arguments, unknown users, bad config values |
/// | `OperationFailed` | I/O errors, database queries fail, remote calls fail |
/// | `Transport` | Upload missing or failed, wrong extension, unreadable stream |
/// | `Schema` | CSV header row absent or not the expected columns |
/// | `Unauthorized` | Missing capability or invalid anti-forgery token |
/// | `NotActivated` | License gate closed for export/import |
/// | `LicenseRejected` | Remote authority refused a serial key |
/// | `FeatureNotEnabled` | License manager not available in this installation |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` operations fail
    /// - Filesystem I/O errors occur
    /// - The license authority cannot be reached or answers garbage
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The uploaded file could not be used.
    ///
    /// Raised before any row is processed: upload missing, upload reported an
    /// error, extension is not `.csv`, or the stream could not be opened.
    #[error("transport error: {0}")]
    Transport(String),

    /// The CSV header does not match the expected columns.
    #[error("schema error: {0}")]
    Schema(String),

    /// Authorization failed.
    ///
    /// Raised when the operator lacks the required capability or the
    /// anti-forgery token does not verify. Always raised before any file or
    /// store access.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The license gate is closed.
    #[error("license not activated: {0}")]
    NotActivated(String),

    /// The remote authority rejected a serial key.
    #[error("license rejected: {0}")]
    LicenseRejected(String),

    /// Feature not enabled in this installation.
    #[error("feature not enabled: {0}")]
    FeatureNotEnabled(String),
}

/// Result type alias for postport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
