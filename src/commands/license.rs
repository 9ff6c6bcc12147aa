//! License command handlers.

use anyhow::{Result, bail};
use clap::Subcommand;
use postport::actions::{self, LICENSE_ACTION};
use postport::security::{Capability, authorize};

use super::Session;

/// License subcommands.
#[derive(Subcommand)]
pub enum LicenseAction {
    /// Activate with a serial key.
    Activate {
        /// The serial key.
        key: String,
    },
    /// Show the stored activation state.
    Status,
    /// Re-validate the stored key with the authority.
    Check,
    /// Forget the stored key.
    Deactivate,
}

/// Executes a license subcommand.
pub fn cmd_license(session: &Session, action: LicenseAction) -> Result<()> {
    if let LicenseAction::Activate { key } = action {
        let token = session.token(LICENSE_ACTION)?;
        let response =
            actions::activate_license(&session.context, &session.operator, Some(&token), &key)?;
        println!("{}", response.notice);
        if !response.activated {
            bail!("activation failed");
        }
        return Ok(());
    }

    authorize(&session.operator, Capability::ManageOptions)?;
    let Some(gate) = session.context.license() else {
        bail!("license manager is not enabled; set features.license_manager in the config");
    };

    match action {
        LicenseAction::Status => {
            let state = gate.status()?;
            println!("Activated: {}", if state.activated { "yes" } else { "no" });
            if let Some(key) = &state.serial_key {
                println!("Serial key: {}", mask_key(key));
            }
            if let Some(at) = state.activated_at.and_then(|t| i64::try_from(t).ok()) {
                if let Some(when) = chrono::DateTime::from_timestamp(at, 0) {
                    println!("Activated at: {}", when.format("%Y-%m-%d %H:%M:%S UTC"));
                }
            }
            println!(
                "Required for export/import: {}",
                if session.context.features().gate_enforced() { "yes" } else { "no" }
            );
        },
        LicenseAction::Check => {
            if gate.check_activation()? {
                println!("License is active.");
            } else {
                bail!("license is not active");
            }
        },
        LicenseAction::Deactivate => {
            gate.deactivate()?;
            println!("License deactivated.");
        },
        LicenseAction::Activate { .. } => {},
    }
    Ok(())
}

/// Shows the last four characters of a key.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let visible = chars.len().min(4);
    let hidden = chars.len() - visible;
    let tail: String = chars[hidden..].iter().collect();
    format!("{}{tail}", "*".repeat(hidden))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("ABCD-1234"), "*****1234");
        assert_eq!(mask_key("XY"), "XY");
        assert_eq!(mask_key(""), "");
    }
}
