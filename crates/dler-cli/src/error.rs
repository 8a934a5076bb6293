//! Error handling for the dler CLI.
//!
//! [`CliError`] wraps library errors and adds the failures that only exist
//! at the command line. [`cli_error_to_miette`] turns it into a report at
//! the `main` boundary, keeping the library diagnostics' codes and help.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Config-file discovery or option errors raised before a build starts.
    #[error("Configuration error: {0}")]
    Config(#[from] dler_config::ConfigError),

    /// A package build failed.
    #[error(transparent)]
    Build(#[from] dler_bundler::Error),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// ROOT or a `--lib` directory does not exist.
    #[error("Package directory not found: {}\n\nHint: ROOT is resolved against the working directory and --lib against ROOT", .0.display())]
    PackageNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Some packages failed under `--keep-going`.
    #[error("{failed} of {total} package build(s) failed\n\nHint: Run with --verbose for per-stage logs")]
    PackagesFailed { failed: usize, total: usize },
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Converts a CLI error into a miette report.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Build(e) => miette::Report::new(e),
        CliError::Config(e) => miette::Report::new(dler_bundler::Error::Config(e)),
        other => miette::miette!("{}", other),
    }
}
