//! Command handlers module.
//!
//! - `io.rs`: export and import
//! - `license.rs`: license activation and status
//! - `user.rs`: user directory management
//!
//! Every handler runs inside a [`Session`]: the configured operator acting
//! through an [`ActionContext`], issuing its own tokens.

mod io;
mod license;
mod user;

pub use io::{cmd_export, cmd_import};
pub use license::{LicenseAction, cmd_license};
pub use user::{UserAction, cmd_user};

use anyhow::{Context, Result, bail};
use postport::config::PostportConfig;
use postport::security::{Operator, Role};
use postport::storage::UserDirectory;
use postport::ActionContext;

/// The operator and services for one CLI invocation.
pub struct Session {
    /// Shared services.
    pub context: ActionContext,
    /// Who is acting.
    pub operator: Operator,
}

impl Session {
    /// Opens the data directory and resolves the configured operator.
    ///
    /// On an empty directory the operator account is created, so a fresh
    /// installation is usable straight away.
    pub fn open(config: &PostportConfig) -> Result<Self> {
        let context = ActionContext::from_config(config).with_context(|| {
            format!("failed to open data directory {}", config.data_dir.display())
        })?;
        let directory = context.directory();

        let user = match directory.find_by_login(&config.operator)? {
            Some(id) => directory.get_user(id)?,
            None if directory.list_users()?.is_empty() => {
                tracing::info!(login = %config.operator, "Creating operator account");
                Some(directory.add_user(&config.operator, &config.operator)?)
            },
            None => None,
        };
        let Some(user) = user else {
            bail!(
                "operator '{}' does not exist; add it with `postport user add`",
                config.operator
            );
        };

        Ok(Self {
            operator: Operator::new(user, Role::Administrator),
            context,
        })
    }

    /// Issues a token for `action` as the session operator.
    pub fn token(&self, action: &str) -> Result<String> {
        Ok(self.context.issue_token(action, &self.operator)?)
    }
}
