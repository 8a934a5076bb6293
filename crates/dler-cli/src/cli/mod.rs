//! Command-line interface definition.
//!
//! - `dler build [ROOT]` - build a package and any `--lib` packages

mod commands;
pub mod enums;

use clap::Parser;

pub use commands::{BuildArgs, Command};
pub use enums::SourcemapArg;

/// dler - build JavaScript/TypeScript packages
#[derive(Parser, Debug)]
#[command(
    name = "dler",
    version,
    about = "Build orchestrator for JavaScript and TypeScript packages",
    long_about = "dler builds npm packages from their package.json.\n\
                  Entries are bundled with Rolldown, mirrored file by file, copied, or\n\
                  turned into TypeScript declarations, then the output is checked\n\
                  against the manifest's dependencies and declared files."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
