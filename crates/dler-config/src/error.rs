//! Error types for configuration loading and merging.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("entry has no input (index {index})")]
    MissingEntryInput { index: usize },

    #[error("preset not found: {0}")]
    PresetNotFound(PathBuf),

    #[error("failed to load preset {path}: {message}")]
    PresetLoad { path: PathBuf, message: String },

    #[error("unsupported preset format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("invalid external `{pattern}`: {message}")]
    InvalidExternal { pattern: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("config discovery failed: {0}")]
    Discovery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn parse(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
