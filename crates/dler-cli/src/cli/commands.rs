use clap::{Args, Subcommand};
use serde_json::{Map, Value, json};
use std::path::PathBuf;

use crate::cli::enums::SourcemapArg;

/// Available dler subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a package and, optionally, sibling packages
    ///
    /// Reads package.json, merges presets, config files and flags, runs the
    /// configured backends and validates the output against the manifest.
    Build(BuildArgs),
}

/// Arguments for the build command
#[derive(Args, Debug, Default, Clone)]
pub struct BuildArgs {
    /// Package root containing package.json
    #[arg(value_name = "ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Additional package directories to build, relative to ROOT
    ///
    /// Examples:
    ///   dler build --lib packages/core --lib packages/utils
    #[arg(long = "lib", value_name = "DIR")]
    pub libs: Vec<PathBuf>,

    /// Output directory, relative to each package root
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Remove output directories before building
    #[arg(long, overrides_with = "no_clean")]
    pub clean: bool,

    /// Keep existing output directories
    #[arg(long, overrides_with = "clean")]
    pub no_clean: bool,

    /// Run the backends of one package concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Stub build: skip output scanning and validation
    #[arg(long)]
    pub stub: bool,

    /// Watch build: skip output scanning and validation
    #[arg(long)]
    pub watch: bool,

    /// Emit TypeScript declarations for every entry
    #[arg(long)]
    pub declaration: bool,

    /// Generate source maps (defaults to `file` when given without a value)
    #[arg(
        long,
        value_enum,
        value_name = "MODE",
        num_args = 0..=1,
        default_missing_value = "file"
    )]
    pub sourcemap: Option<SourcemapArg>,

    /// Minify bundled output
    #[arg(short = 'm', long)]
    pub minify: bool,

    /// Preset file (JSON or TOML), relative to each package root
    #[arg(long, value_name = "PATH")]
    pub preset: Option<String>,

    /// Maximum number of packages built at once
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub max_parallel: Option<u16>,

    /// Build every package even after a failure
    #[arg(long)]
    pub keep_going: bool,

    /// Report warnings without failing the build
    #[arg(long)]
    pub no_fail_on_warn: bool,
}

impl BuildArgs {
    /// The per-invocation config layer: only flags that were passed.
    pub fn build_config(&self) -> Value {
        let mut config = Map::new();

        if let Some(out_dir) = &self.out_dir {
            config.insert("outDir".into(), json!(out_dir));
        }
        if self.clean {
            config.insert("clean".into(), json!(true));
        } else if self.no_clean {
            config.insert("clean".into(), json!(false));
        }

        let switches = [
            ("parallel", self.parallel),
            ("transpileStub", self.stub),
            ("transpileWatch", self.watch),
            ("declaration", self.declaration),
            ("minify", self.minify),
        ];
        for (key, enabled) in switches {
            if enabled {
                config.insert(key.into(), json!(true));
            }
        }

        if let Some(sourcemap) = self.sourcemap {
            config.insert("sourcemap".into(), json!(sourcemap.as_str()));
        }
        if self.no_fail_on_warn {
            config.insert("transpileFailOnWarn".into(), json!(false));
        }

        Value::Object(config)
    }

    /// ROOT followed by every `--lib` directory resolved against it.
    pub fn package_dirs(&self, root: &std::path::Path) -> Vec<PathBuf> {
        std::iter::once(root.to_path_buf())
            .chain(self.libs.iter().map(|lib| root.join(lib)))
            .collect()
    }
}
