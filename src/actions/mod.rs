//! Request-level actions.
//!
//! Each action is a state-changing request made by an [`Operator`] carrying
//! an anti-forgery token. Handlers run the checks in a fixed order, and
//! nothing touches the store until the first two pass:
//!
//! 1. capability ([`Capability::ManageOptions`])
//! 2. token for the action
//! 3. license gate, when the installation requires one
//! 4. the action itself
//!
//! The services an action needs travel in an [`ActionContext`], built once
//! and passed explicitly.

mod export;
mod import;
mod license;

pub use export::export_posts;
pub use import::{ImportResponse, ImportSignal, Upload, import_posts};
pub use license::{LicenseResponse, activate_license};

use crate::config::{FeatureFlags, PostportConfig};
use crate::io::{ExportOptions, ExportService, ImportService};
use crate::license::{
    FileActivationStore, HttpKeyValidator, KeyValidator, LicenseGate, StaticKeyValidator,
};
use crate::security::{Capability, CsrfGuard, Operator, authorize};
use crate::storage::{ContentStore, SqliteStore, UserDirectory};
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// Action name bound into export tokens.
pub const EXPORT_ACTION: &str = "export_posts";

/// Action name bound into import tokens.
pub const IMPORT_ACTION: &str = "import_posts";

/// Action name bound into license activation tokens.
pub const LICENSE_ACTION: &str = "activate_license";

/// Admin page redirects point back to.
pub const ADMIN_PAGE: &str = "postport";

/// What the caller should send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResponse {
    /// A file download.
    Download {
        /// Suggested file name.
        filename: String,
        /// `Content-Type` value.
        content_type: String,
        /// `Content-Disposition` value.
        content_disposition: String,
        /// File contents.
        body: Vec<u8>,
    },
    /// Return to the admin page with a status parameter.
    Redirect {
        /// Status parameter name (`export`, `import`).
        param: &'static str,
        /// Status value (`success`, `partial`, `error`).
        value: &'static str,
    },
}

impl ActionResponse {
    /// Creates a redirect.
    #[must_use]
    pub const fn redirect(param: &'static str, value: &'static str) -> Self {
        Self::Redirect { param, value }
    }

    /// Relative redirect target, or `None` for downloads.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Redirect { param, value } => Some(format!("?page={ADMIN_PAGE}&{param}={value}")),
            Self::Download { .. } => None,
        }
    }

    /// Returns whether this is a download.
    #[must_use]
    pub const fn is_download(&self) -> bool {
        matches!(self, Self::Download { .. })
    }
}

/// Services shared by all actions.
#[derive(Clone)]
pub struct ActionContext {
    store: Arc<dyn ContentStore>,
    directory: Arc<dyn UserDirectory>,
    csrf: Arc<CsrfGuard>,
    license: Option<LicenseGate>,
    features: FeatureFlags,
    export_options: ExportOptions,
}

impl ActionContext {
    /// Creates a context without a license manager.
    #[must_use]
    pub fn new(
        store: Arc<dyn ContentStore>,
        directory: Arc<dyn UserDirectory>,
        csrf: CsrfGuard,
    ) -> Self {
        Self {
            store,
            directory,
            csrf: Arc::new(csrf),
            license: None,
            features: FeatureFlags::none(),
            export_options: ExportOptions::default(),
        }
    }

    /// Installs a license manager.
    #[must_use]
    pub fn with_license(mut self, gate: LicenseGate) -> Self {
        self.license = Some(gate);
        self.features.license_manager = true;
        self
    }

    /// Makes export and import wait for an active license. Ignored unless a
    /// license manager is installed.
    #[must_use]
    pub const fn require_license(mut self, required: bool) -> Self {
        self.features.require_license = required;
        self
    }

    /// Sets export options.
    #[must_use]
    pub const fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.export_options = options;
        self
    }

    /// Builds a context from configuration.
    ///
    /// Opens the content database under the data directory and, when
    /// `features.license_manager` is set, a license gate whose state lives
    /// next to it. The form secret comes from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn from_config(config: &PostportConfig) -> Result<Self> {
        let db = Arc::new(SqliteStore::open(config.db_path())?);
        let mut context = Self::new(db.clone(), db, CsrfGuard::from_env())
            .with_export_options(ExportOptions::default().with_page_size(config.export_page_size));

        if config.features.license_manager {
            let validator: Arc<dyn KeyValidator> = match &config.license.endpoint {
                Some(endpoint) => Arc::new(HttpKeyValidator::new(
                    endpoint.clone(),
                    config.license.site.clone(),
                    config.license.timeout(),
                )),
                None => Arc::new(StaticKeyValidator::new(config.license.offline_keys.clone())),
            };
            let store = Arc::new(FileActivationStore::in_dir(&config.data_dir));
            context = context.with_license(LicenseGate::new(validator, store));
        }

        tracing::debug!(
            license_manager = context.features.license_manager,
            require_license = config.features.require_license,
            "Action context ready"
        );
        Ok(context.require_license(config.features.require_license))
    }

    /// The content store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// The user directory.
    #[must_use]
    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    /// Effective feature flags.
    #[must_use]
    pub const fn features(&self) -> FeatureFlags {
        self.features
    }

    /// The license gate, if a license manager is installed.
    #[must_use]
    pub const fn license(&self) -> Option<&LicenseGate> {
        self.license.as_ref()
    }

    /// Export options.
    #[must_use]
    pub const fn export_options(&self) -> &ExportOptions {
        &self.export_options
    }

    /// Issues a token for `action` by `operator`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be signed.
    pub fn issue_token(&self, action: &str, operator: &Operator) -> Result<String> {
        self.csrf.issue(action, operator.id())
    }

    pub(crate) fn export_service(&self) -> ExportService {
        ExportService::new(self.store.clone(), self.directory.clone())
    }

    pub(crate) fn import_service(&self) -> ImportService {
        ImportService::new(self.store.clone(), self.directory.clone())
    }

    pub(crate) fn license_gate(&self) -> Result<&LicenseGate> {
        self.license.as_ref().ok_or_else(|| {
            Error::FeatureNotEnabled("license manager is not installed".to_string())
        })
    }

    /// Capability then token. Runs before any file or store access.
    pub(crate) fn authorize_request(
        &self,
        operator: &Operator,
        token: Option<&str>,
        action: &str,
    ) -> Result<()> {
        authorize(operator, Capability::ManageOptions)?;
        self.csrf.verify(token, action, operator.id())
    }

    /// Fails with [`Error::NotActivated`] when the gate is enforced and closed.
    pub(crate) fn check_license_gate(&self) -> Result<()> {
        if !self.features.gate_enforced() {
            return Ok(());
        }
        match &self.license {
            Some(gate) => gate.require_active(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("csrf", &self.csrf)
            .field("license", &self.license)
            .field("features", &self.features)
            .field("export_options", &self.export_options)
            .finish_non_exhaustive()
    }
}
