//! Export trigger.

use super::{ActionContext, ActionResponse, EXPORT_ACTION};
use crate::Result;
use crate::io::formats::{CSV_CONTENT_TYPE, export_filename};
use crate::security::Operator;
use chrono::NaiveDate;
use tracing::{info, instrument};

/// Exports every published post as a CSV download.
///
/// With nothing published, redirects with `export=success` instead of
/// sending an empty file. `today` names the file.
///
/// # Errors
///
/// - [`crate::Error::Unauthorized`] on a missing capability or bad token
/// - [`crate::Error::NotActivated`] when the license gate is closed
/// - store or encoding errors
#[instrument(skip(context, operator, token), fields(operator = %operator.user().login))]
pub fn export_posts(
    context: &ActionContext,
    operator: &Operator,
    token: Option<&str>,
    today: NaiveDate,
) -> Result<ActionResponse> {
    context.authorize_request(operator, token, EXPORT_ACTION)?;
    context.check_license_gate()?;

    let service = context.export_service();
    if !service.has_published()? {
        info!("Nothing published, skipping download");
        return Ok(ActionResponse::redirect("export", "success"));
    }

    let mut body = Vec::new();
    let result = service.export_to_writer(&mut body, context.export_options())?;
    let filename = export_filename(today);
    info!(exported = result.exported, filename = %filename, "Export ready");

    Ok(ActionResponse::Download {
        content_disposition: format!("attachment; filename={filename}"),
        content_type: CSV_CONTENT_TYPE.to_string(),
        filename,
        body,
    })
}
