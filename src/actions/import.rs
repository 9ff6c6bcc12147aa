//! Import trigger.

use super::{ActionContext, ActionResponse, IMPORT_ACTION};
use crate::io::formats::has_csv_extension;
use crate::io::{ImportOptions, ImportOutcome, ImportReport, ProgressCallback};
use crate::security::Operator;
use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// An uploaded file as handed over by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Name the client gave the file.
    pub file_name: String,
    /// Where the transport stored the bytes.
    pub path: PathBuf,
    /// Transport-level failure, if the upload did not complete.
    pub error: Option<String>,
}

impl Upload {
    /// A completed upload.
    #[must_use]
    pub fn new(file_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            path: path.into(),
            error: None,
        }
    }

    /// A failed upload.
    #[must_use]
    pub fn failed(file_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            path: PathBuf::new(),
            error: Some(error.into()),
        }
    }

    fn check(&self) -> Result<()> {
        if let Some(error) = &self.error {
            return Err(Error::Transport(format!("upload failed: {error}")));
        }
        if !has_csv_extension(&self.file_name) {
            return Err(Error::Transport(format!(
                "'{}' is not a .csv file",
                self.file_name
            )));
        }
        Ok(())
    }
}

/// Coarse status carried back in the import redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportSignal {
    /// Every row imported.
    Success,
    /// Some rows imported.
    Partial,
    /// Nothing imported, or the run never started.
    Error,
}

impl ImportSignal {
    /// Returns the query value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Error => "error",
        }
    }
}

impl From<ImportOutcome> for ImportSignal {
    fn from(outcome: ImportOutcome) -> Self {
        match outcome {
            ImportOutcome::FullSuccess => Self::Success,
            ImportOutcome::PartialSuccess => Self::Partial,
            ImportOutcome::TotalFailure
            | ImportOutcome::AbortedInvalidHeader
            | ImportOutcome::AbortedIoFailure => Self::Error,
        }
    }
}

impl fmt::Display for ImportSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the import trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResponse {
    /// Status for the redirect.
    pub signal: ImportSignal,
    /// The run's report; `None` when the upload was refused before reading.
    pub report: Option<ImportReport>,
    /// Why the upload was refused, if it was.
    pub refused: Option<String>,
}

impl ImportResponse {
    /// The redirect to send back. Carries no counts.
    #[must_use]
    pub const fn response(&self) -> ActionResponse {
        ActionResponse::redirect("import", self.signal.as_str())
    }
}

/// Imports an uploaded CSV file.
///
/// Upload problems (missing, failed, wrong extension) are not errors: they
/// end in [`ImportSignal::Error`], as do header and read failures. `progress`
/// is called after every row.
///
/// # Errors
///
/// - [`Error::Unauthorized`] on a missing capability or bad token
/// - [`Error::NotActivated`] when the license gate is closed
#[instrument(skip_all, fields(operator = %operator.user().login))]
pub fn import_posts(
    context: &ActionContext,
    operator: &Operator,
    token: Option<&str>,
    upload: Option<&Upload>,
    options: &ImportOptions,
    progress: Option<ProgressCallback>,
) -> Result<ImportResponse> {
    context.authorize_request(operator, token, IMPORT_ACTION)?;
    context.check_license_gate()?;

    let checked = upload
        .ok_or_else(|| Error::Transport("no file uploaded".to_string()))
        .and_then(|u| u.check().map(|()| u));
    let upload = match checked {
        Ok(upload) => upload,
        Err(e) => {
            warn!(error = %e, "Import refused");
            return Ok(ImportResponse {
                signal: ImportSignal::Error,
                report: None,
                refused: Some(e.to_string()),
            });
        },
    };

    let report = context
        .import_service()
        .import_from_path(&upload.path, operator.id(), options, progress);
    let signal = ImportSignal::from(report.outcome);
    info!(
        file = %upload.file_name,
        outcome = %report.outcome,
        signal = %signal,
        "Import finished"
    );

    Ok(ImportResponse {
        signal,
        report: Some(report),
        refused: None,
    })
}
