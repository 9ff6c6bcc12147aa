//! Import and export command handlers.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use postport::actions::{self, EXPORT_ACTION, IMPORT_ACTION, ImportSignal, Upload};
use postport::io::{ImportOptions, ImportProgress, ProgressCallback};
use postport::ActionResponse;

use super::Session;

/// Maximum number of row failures listed after an import.
const MAX_LISTED_FAILURES: usize = 10;

/// Executes the export command.
///
/// Writes to `output`, `-` for stdout, or the suggested file name in the
/// current directory.
pub fn cmd_export(session: &Session, output: Option<PathBuf>) -> Result<()> {
    let token = session.token(EXPORT_ACTION)?;
    let today = chrono::Local::now().date_naive();

    let response =
        actions::export_posts(&session.context, &session.operator, Some(&token), today)?;
    let ActionResponse::Download { filename, body, .. } = response else {
        println!("Nothing published, nothing to export.");
        return Ok(());
    };

    match output {
        Some(path) if path.as_os_str() == "-" => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&body)?;
            stdout.flush()?;
        },
        output => {
            let path = output.unwrap_or_else(|| PathBuf::from(&filename));
            std::fs::write(&path, &body)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported to {}", path.display());
        },
    }
    Ok(())
}

/// Executes the import command.
pub fn cmd_import(session: &Session, file: &Path, dry_run: bool) -> Result<()> {
    let token = session.token(IMPORT_ACTION)?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let upload = Upload::new(file_name, file);
    let options = ImportOptions::default().with_dry_run(dry_run);

    let progress_callback: ProgressCallback = Box::new(|progress: &ImportProgress| {
        print!(
            "\rProcessing row {} - Imported: {}, Errors: {}",
            progress.current, progress.imported, progress.errors
        );
        let _ = std::io::stdout().flush();
    });

    let response = actions::import_posts(
        &session.context,
        &session.operator,
        Some(&token),
        Some(&upload),
        &options,
        Some(progress_callback),
    )?;

    if let Some(reason) = &response.refused {
        bail!("import refused: {reason}");
    }
    let Some(report) = response.report else {
        bail!("import produced no report");
    };

    println!();
    if let Some(reason) = &report.abort_reason {
        bail!("import aborted ({}): {reason}", report.outcome);
    }

    if dry_run {
        println!("Dry run completed (no changes made):");
    } else {
        println!("Import completed:");
    }
    println!("  Outcome:  {}", report.outcome);
    println!("  Imported: {}", report.tally.imported);
    println!("  Errors:   {}", report.tally.errors);

    if !report.failures.is_empty() {
        println!();
        println!("Failed rows ({}):", report.failures.len());
        for failure in report.failures.iter().take(MAX_LISTED_FAILURES) {
            println!("  - {failure}");
        }
        if report.failures.len() > MAX_LISTED_FAILURES {
            println!(
                "  ... and {} more",
                report.failures.len() - MAX_LISTED_FAILURES
            );
        }
    }

    if response.signal == ImportSignal::Error {
        bail!("no rows were imported");
    }
    Ok(())
}
