//! Option records produced by the merger.

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::external::ExternalPattern;

/// The compilation strategy for one entry.
///
/// Variant order is the canonical backend execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuilderKind {
    /// `.d.ts` emission from TypeScript sources.
    Declaration,
    /// File-by-file transpile that mirrors a source directory.
    Mirror,
    /// Rolldown bundle.
    Bundle,
    /// Verbatim copy.
    Copy,
}

impl BuilderKind {
    pub const ALL: [BuilderKind; 4] = [Self::Declaration, Self::Mirror, Self::Bundle, Self::Copy];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Declaration => "declaration",
            Self::Mirror => "mirror",
            Self::Bundle => "bundle",
            Self::Copy => "copy",
        }
    }
}

impl std::fmt::Display for BuilderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcemapMode {
    #[default]
    None,
    File,
    Inline,
    Hidden,
}

impl SourcemapMode {
    pub fn is_enabled(self) -> bool {
        !matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    #[default]
    Esm,
    Cjs,
}

impl ModuleFormat {
    /// File extension used for bundled chunks.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Esm => "js",
            Self::Cjs => "cjs",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    #[default]
    Node,
    Browser,
    Neutral,
}

/// Entry as written in config, before normalization.
///
/// Accepts either a bare input string or an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "EntrySpec")]
pub struct EntryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builder: Option<BuilderKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration: Option<bool>,
}

impl EntryConfig {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn with_builder(mut self, builder: BuilderKind) -> Self {
        self.builder = Some(builder);
        self
    }

    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(out_dir.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntrySpec {
    Input(String),
    Config {
        name: Option<String>,
        #[serde(default)]
        input: String,
        #[serde(rename = "outDir")]
        out_dir: Option<PathBuf>,
        builder: Option<BuilderKind>,
        declaration: Option<bool>,
    },
}

impl From<EntrySpec> for EntryConfig {
    fn from(spec: EntrySpec) -> Self {
        match spec {
            EntrySpec::Input(input) => EntryConfig::new(input),
            EntrySpec::Config {
                name,
                input,
                out_dir,
                builder,
                declaration,
            } => EntryConfig {
                name,
                input,
                out_dir,
                builder,
                declaration,
            },
        }
    }
}

/// Settings for the bundle backend, merged one level deep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BundlerSettings {
    /// Bundle bare imports that are not externals without warning.
    pub inline_dependencies: bool,
    pub format: ModuleFormat,
    pub platform: TargetPlatform,
}

/// Settings for the mirror backend, merged one level deep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MirrorSettings {
    /// Extension for transpiled `.ts`/`.tsx`/`.jsx` files.
    pub ext: String,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            ext: "js".to_string(),
        }
    }
}

/// Fully merged build configuration for one package.
///
/// After [`BuildOptions::resolve_paths`], `root_dir` and `out_dir` are absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    pub name: String,
    pub root_dir: PathBuf,
    pub out_dir: PathBuf,
    #[serde(default)]
    pub entries: Vec<EntryConfig>,
    #[serde(default)]
    pub externals: Vec<ExternalPattern>,
    /// Extra dependency names treated as declared and used.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub peer_dependencies: Vec<String>,
    #[serde(default)]
    pub dev_dependencies: Vec<String>,
    /// Global declaration flag; entries without an override inherit it.
    #[serde(default)]
    pub declaration: Option<bool>,
    #[serde(default)]
    pub clean: bool,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_true")]
    pub transpile_fail_on_warn: bool,
    #[serde(default)]
    pub transpile_stub: bool,
    #[serde(default)]
    pub transpile_watch: bool,
    /// Default builder for entries that do not name one.
    #[serde(default)]
    pub builder: Option<BuilderKind>,
    #[serde(default)]
    pub sourcemap: SourcemapMode,
    #[serde(default)]
    pub minify: bool,
    #[serde(default)]
    pub bundler: BundlerSettings,
    #[serde(default)]
    pub mirror: MirrorSettings,
}

fn default_true() -> bool {
    true
}

impl BuildOptions {
    /// Makes `root_dir` absolute (against the process cwd) and `out_dir`
    /// absolute against `root_dir`.
    pub fn resolve_paths(&mut self) -> Result<()> {
        if !self.root_dir.is_absolute() {
            self.root_dir = std::env::current_dir()?.join(&self.root_dir);
        }
        self.root_dir = self.root_dir.clean();
        self.out_dir = self.resolve(&self.out_dir);
        Ok(())
    }

    /// Resolves `path` against `root_dir`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root_dir.join(path).clean()
    }

    /// Stub or watch builds skip output scanning and validation.
    pub fn is_incremental(&self) -> bool {
        self.transpile_stub || self.transpile_watch
    }
}
