//! Logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;

/// Environment variable overriding the log filter.
pub const LOG_FILTER_ENV: &str = "POSTPORT_LOG";

/// Environment variable overriding the log format.
pub const LOG_FORMAT_ENV: &str = "POSTPORT_LOG_FORMAT";

/// Environment variable overriding the log file.
pub const LOG_FILE_ENV: &str = "POSTPORT_LOG_FILE";

const DEFAULT_FILTER: &str = "warn";
const VERBOSE_FILTER: &str = "postport=debug,warn";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything but `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive.
    pub filter: String,
    /// Optional file to append to instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: DEFAULT_FILTER.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging config from file settings and the environment.
    ///
    /// Filter precedence: `POSTPORT_LOG`, `RUST_LOG`, `-v`, the config
    /// file, then `warn`.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        Self::resolve(settings, verbose, |key| std::env::var(key).ok())
    }

    fn resolve(
        settings: Option<&LoggingSettings>,
        verbose: bool,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let filter = env(LOG_FILTER_ENV)
            .or_else(|| env("RUST_LOG"))
            .or_else(|| verbose.then(|| VERBOSE_FILTER.to_string()))
            .or_else(|| settings.and_then(|s| s.filter.clone()))
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        let format = env(LOG_FORMAT_ENV)
            .or_else(|| settings.and_then(|s| s.format.clone()))
            .map_or(LogFormat::Pretty, |f| LogFormat::parse(&f));

        let file = env(LOG_FILE_ENV)
            .or_else(|| settings.and_then(|s| s.file.clone()))
            .map(PathBuf::from);

        Self {
            format,
            filter,
            file,
        }
    }
}
