//! Binary entry point for postport.
//!
//! This binary provides the CLI interface for CSV export and import of posts.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use commands::{LicenseAction, Session, UserAction, cmd_export, cmd_import, cmd_license, cmd_user};
use postport::config::PostportConfig;
use postport::observability::{self, LoggingConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Postport - CSV export and import for posts.
#[derive(Parser)]
#[command(name = "postport")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Export published posts as CSV.
    Export {
        /// Output file, or `-` for stdout (default: posts-export-<date>.csv).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import posts from a CSV file.
    Import {
        /// The CSV file.
        file: PathBuf,

        /// Validate every row without creating posts.
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage the license.
    License {
        /// License subcommand.
        #[command(subcommand)]
        action: LicenseAction,
    },

    /// Manage users.
    User {
        /// User subcommand.
        #[command(subcommand)]
        action: UserAction,
    },
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match PostportConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let logging = LoggingConfig::from_settings(Some(&config.logging), cli.verbose);
    if let Err(e) = observability::init(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: &PostportConfig) -> anyhow::Result<()> {
    let session = Session::open(config)?;

    match cli.command {
        Commands::Export { output } => cmd_export(&session, output),
        Commands::Import { file, dry_run } => cmd_import(&session, &file, dry_run),
        Commands::License { action } => cmd_license(&session, action),
        Commands::User { action } => cmd_user(&session, action),
    }
}
