//! # dler-bundler
//!
//! The per-package build pipeline: context assembly, externals inference,
//! output cleaning, the four build backends, output scanning, validation
//! and reporting. [`build_packages`] runs several pipelines with bounded
//! concurrency.
//!
//! ```rust,no_run
//! use dler_bundler::{BuildRequest, build};
//!
//! # async fn run() -> dler_bundler::Result<()> {
//! let outcome = build(BuildRequest::new("packages/core")).await?;
//! println!("{}", outcome.report);
//! # Ok(())
//! # }
//! ```

pub mod auto;
pub mod backends;
pub mod clean;
pub mod context;
pub mod exports;
pub mod externals;
pub mod hooks;
pub mod orchestrator;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod report;
pub mod scan;
pub mod transform;
pub mod validate;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

use std::path::PathBuf;

use dler_config::{BuilderKind, ConfigError};

pub use backends::{Backend, BackendOutput, BackendSet, run_backends};
pub use clean::{CleanedDirs, clean_outputs};
pub use context::{BuildContext, BuildEntry, Entry, ModuleSize};
pub use externals::{ExternalsSet, compute_externals, infer_pkg_externals, path_to_regex};
pub use hooks::{BuildHooks, HookStage};
pub use orchestrator::{ErrorPolicy, OrchestratorOptions, PackageResult, build_packages};
pub use pipeline::{BuildOutcome, BuildRequest, build};
pub use report::{BuildReport, format_bytes, format_duration};

/// Error types for dler-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Option merging, preset loading or entry normalization failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Removing or recreating an output directory failed.
    #[error("Failed to clean {}: {source}", path.display())]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{backend} backend failed: {message}")]
    Backend { backend: BuilderKind, message: String },

    /// Error from Rolldown.
    #[error("Rolldown bundler error: {0}")]
    Bundler(String),

    /// Parse, transpile or declaration emit failed for one file.
    #[error("Failed to transform {}: {message}", path.display())]
    Transform { path: PathBuf, message: String },

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// The build produced warnings and `transpileFailOnWarn` is set.
    #[error("Build of {package} finished with {} warning(s)", warnings.len())]
    WarningsAsErrors { package: String, warnings: Vec<String> },

    #[error("{stage} hook failed: {message}")]
    Hook { stage: HookStage, message: String },

    /// A package build task panicked or was cancelled.
    #[error("Build task failed: {0}")]
    Join(String),
}

/// Result type alias for dler-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps a Rolldown diagnostic batch.
    pub fn from_rolldown(error: &dyn std::fmt::Debug) -> Self {
        Error::Bundler(format!("{error:?}"))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Join(err.to_string())
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Config(_) => "dler::config",
            Error::Io(_) => "dler::io",
            Error::Clean { .. } => "dler::clean",
            Error::Backend { .. } => "dler::backend",
            Error::Bundler(_) => "dler::bundler",
            Error::Transform { .. } => "dler::transform",
            Error::InvalidOutputPath(_) => "dler::invalid_output_path",
            Error::WriteFailure(_) => "dler::write_failure",
            Error::WarningsAsErrors { .. } => "dler::warnings",
            Error::Hook { .. } => "dler::hook",
            Error::Join(_) => "dler::join",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Config(ConfigError::MissingEntryInput { index }) => Some(Box::new(format!(
                "Entry #{index} has no input. Set `input` to a source file or a directory ending in `/`."
            ))),
            Error::Config(ConfigError::PresetNotFound(path)) => Some(Box::new(format!(
                "No preset file at '{}'. Preset paths are resolved against the package root.",
                path.display()
            ))),
            Error::Config(_) => Some(Box::new(
                "Check the `dler`/`build` field in package.json and dler.toml.",
            )),
            Error::Clean { path, .. } => Some(Box::new(format!(
                "Could not reset '{}'. Check permissions, or build with --no-clean.",
                path.display()
            ))),
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output path '{}' is invalid. Outputs must stay inside their output directory.",
                path
            ))),
            Error::WriteFailure(msg) => Some(Box::new(format!(
                "Failed to write file. Check disk space and permissions.\nError: {}",
                msg
            ))),
            Error::WarningsAsErrors { warnings, .. } => Some(Box::new(format!(
                "{}\nFix the warnings or set `transpileFailOnWarn: false`.",
                warnings
                    .iter()
                    .map(|w| format!("- {w}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            ))),
            Error::Transform { .. } => Some(Box::new(
                "Fix the syntax error, or make exported types explicit for declaration output.",
            )),
            _ => None,
        }
    }
}
