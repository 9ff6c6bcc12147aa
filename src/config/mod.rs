//! Configuration management.
//!
//! Configuration is read from a TOML file and layered over defaults. The file
//! is located, in order, from an explicit path, `POSTPORT_CONFIG_PATH`, or the
//! platform config directory (`<config>/postport/config.toml`).
//!
//! ```toml
//! data_dir = "/var/lib/postport"
//! operator = "admin"
//!
//! [features]
//! license_manager = true
//! require_license = true
//!
//! [license]
//! endpoint = "https://licenses.example.com/validate"
//! site = "https://blog.example.com"
//! timeout_secs = 10
//!
//! [logging]
//! format = "json"
//! filter = "postport=info"
//! file = "/var/log/postport.log"
//!
//! [export]
//! page_size = 500
//! ```

mod features;

pub use features::FeatureFlags;

use crate::io::DEFAULT_PAGE_SIZE;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "POSTPORT_CONFIG_PATH";

/// Database file name inside the data directory.
pub const DB_FILE_NAME: &str = "postport.db";

/// Main configuration for postport.
#[derive(Debug, Clone)]
pub struct PostportConfig {
    /// Directory holding the content database and license state.
    pub data_dir: PathBuf,
    /// Login of the user the CLI acts as.
    pub operator: String,
    /// Feature flags.
    pub features: FeatureFlags,
    /// License authority configuration.
    pub license: LicenseConfig,
    /// Raw logging settings; environment overrides are applied by
    /// [`crate::observability::LoggingConfig::from_settings`].
    pub logging: LoggingSettings,
    /// Number of posts read from the store per export page.
    pub export_page_size: usize,
}

/// License authority configuration.
#[derive(Debug, Clone)]
pub struct LicenseConfig {
    /// Validation endpoint. When unset, only `offline_keys` are accepted.
    pub endpoint: Option<String>,
    /// Identifies this installation to the authority.
    pub site: String,
    /// Request timeout in seconds. Zero disables the timeout.
    pub timeout_secs: u64,
    /// Keys accepted without contacting an authority.
    pub offline_keys: Vec<String>,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            site: "localhost".to_string(),
            timeout_secs: 10,
            offline_keys: Vec::new(),
        }
    }
}

impl LicenseConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging section as written in the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// `EnvFilter` directive, e.g. `postport=debug`.
    pub filter: Option<String>,
    /// Append log output to this file instead of stderr.
    pub file: Option<String>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Operator login.
    pub operator: Option<String>,
    /// Feature flags.
    pub features: Option<ConfigFileFeatures>,
    /// License section.
    pub license: Option<ConfigFileLicense>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Export section.
    pub export: Option<ConfigFileExport>,
}

/// Features section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileFeatures {
    /// License manager installed.
    pub license_manager: Option<bool>,
    /// Export and import require an active license.
    pub require_license: Option<bool>,
}

/// License section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLicense {
    /// Validation endpoint.
    pub endpoint: Option<String>,
    /// Site identifier.
    pub site: Option<String>,
    /// Timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Offline keys.
    pub offline_keys: Option<Vec<String>>,
}

/// Export section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileExport {
    /// Page size.
    pub page_size: Option<usize>,
}

impl Default for PostportConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".postport"),
            operator: "admin".to_string(),
            features: FeatureFlags::default(),
            license: LicenseConfig::default(),
            logging: LoggingSettings::default(),
            export_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PostportConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds
    /// unusable values.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Returns default configuration if no config file is found or the one
    /// found cannot be used.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(path) = default_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unusable config file");
                Self::default()
            },
        }
    }

    /// Loads configuration for a run.
    ///
    /// An explicit path wins, then [`CONFIG_PATH_ENV`], then the default
    /// location. Unlike [`Self::load_default`], an explicitly named file
    /// must exist and parse.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be loaded.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::load_from_file(Path::new(path.trim())),
            _ => Ok(Self::load_default()),
        }
    }

    /// Converts a `ConfigFile` to `PostportConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(operator) = file.operator {
            let operator = operator.trim();
            if operator.is_empty() {
                return Err(Error::InvalidInput("operator login cannot be empty".to_string()));
            }
            config.operator = operator.to_string();
        }
        if let Some(features) = file.features {
            if let Some(v) = features.license_manager {
                config.features.license_manager = v;
            }
            if let Some(v) = features.require_license {
                config.features.require_license = v;
            }
        }
        if let Some(license) = file.license {
            config.license.endpoint = license.endpoint.filter(|e| !e.trim().is_empty());
            if let Some(site) = license.site {
                config.license.site = site;
            }
            if let Some(timeout) = license.timeout_secs {
                config.license.timeout_secs = timeout;
            }
            if let Some(keys) = license.offline_keys {
                config.license.offline_keys = keys;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }
        if let Some(export) = file.export {
            if let Some(page_size) = export.page_size {
                if page_size == 0 {
                    return Err(Error::InvalidInput(
                        "export.page_size must be at least 1".to_string(),
                    ));
                }
                config.export_page_size = page_size;
            }
        }

        Ok(config)
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the feature flags.
    #[must_use]
    pub const fn with_features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Path of the content database.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

/// Platform config file location, if a home directory can be determined.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.config_dir().join("postport").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_defaults() {
        let config = PostportConfig::new();
        assert_eq!(config.operator, "admin");
        assert_eq!(config.db_path(), PathBuf::from(".postport").join("postport.db"));
        assert_eq!(config.export_page_size, DEFAULT_PAGE_SIZE);
        assert!(!config.features.license_manager);
        assert_eq!(config.license.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_full_file() {
        let (_dir, path) = write_config(
            r#"
data_dir = "/srv/postport"
operator = "editor"

[features]
license_manager = true
require_license = true

[license]
endpoint = "https://licenses.example.com/validate"
site = "blog.example.com"
timeout_secs = 3
offline_keys = ["DEV-KEY"]

[logging]
format = "json"
filter = "postport=trace"

[export]
page_size = 50
"#,
        );

        let config = PostportConfig::load_from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/postport"));
        assert_eq!(config.operator, "editor");
        assert_eq!(config.features, FeatureFlags::all());
        assert_eq!(
            config.license.endpoint.as_deref(),
            Some("https://licenses.example.com/validate")
        );
        assert_eq!(config.license.site, "blog.example.com");
        assert_eq!(config.license.timeout_secs, 3);
        assert_eq!(config.license.offline_keys, vec!["DEV-KEY".to_string()]);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        assert_eq!(config.export_page_size, 50);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let (_dir, path) = write_config("[features]\nlicense_manager = true\n");
        let config = PostportConfig::load_from_file(&path).unwrap();
        assert!(config.features.license_manager);
        assert!(!config.features.require_license);
        assert_eq!(config.operator, "admin");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let (_dir, path) = write_config("[export]\npage_size = 0\n");
        assert!(matches!(
            PostportConfig::load_from_file(&path),
            Err(Error::InvalidInput(_))
        ));

        let (_dir, path) = write_config("operator = \"  \"\n");
        assert!(PostportConfig::load_from_file(&path).is_err());

        let (_dir, path) = write_config("not = [valid");
        assert!(matches!(
            PostportConfig::load_from_file(&path),
            Err(Error::OperationFailed { .. })
        ));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(PostportConfig::load(Some(&missing)).is_err());
    }
}
