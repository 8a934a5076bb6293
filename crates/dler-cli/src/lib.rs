//! dler CLI - builds JavaScript/TypeScript packages from their
//! `package.json`.
//!
//! - [`cli`] - clap argument model
//! - [`commands`] - command implementations
//! - [`error`] - CLI errors and miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - terminal output

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
