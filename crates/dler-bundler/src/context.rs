//! Per-package build state shared by every pipeline stage.

use std::path::{Path, PathBuf};

use dler_config::{BuildOptions, BuilderKind, ConfigError, PackageManifest};
use indexmap::IndexSet;
use serde::Serialize;

use crate::externals::{ExternalsSet, compute_externals};
use crate::paths::derive_entry_name;
use crate::Result;

/// One normalized compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub name: String,
    pub input: PathBuf,
    pub out_dir: PathBuf,
    pub builder: BuilderKind,
    pub declaration: bool,
}

/// Rendered size of one module inside a bundled chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSize {
    pub id: String,
    pub bytes: u64,
}

/// A file (or directory) the build emitted, relative to `outDir`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildEntry {
    pub path: String,
    pub bytes: Option<u64>,
    /// Dependency chunk rather than a named entry.
    pub chunk: bool,
    pub chunks: Option<Vec<String>>,
    pub exports: Option<Vec<String>>,
    pub modules: Option<Vec<ModuleSize>>,
}

impl BuildEntry {
    pub fn entry(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn chunk(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            chunk: true,
            ..Default::default()
        }
    }

    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes = Some(bytes);
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<String>) -> Self {
        self.chunks = Some(chunks);
        self
    }

    pub fn with_exports(mut self, exports: Vec<String>) -> Self {
        self.exports = Some(exports);
        self
    }
}

/// Dependency names declared by the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyNames {
    pub dependencies: Vec<String>,
    pub peer_dependencies: Vec<String>,
    pub dev_dependencies: Vec<String>,
}

impl DependencyNames {
    pub fn from_manifest(pkg: &PackageManifest) -> Self {
        Self {
            dependencies: pkg.dependency_names(),
            peer_dependencies: pkg.peer_dependency_names(),
            dev_dependencies: pkg.dev_dependency_names(),
        }
    }
}

/// Mutable state for one package build.
///
/// Backends never touch this directly; the dispatcher appends what they
/// return. Hooks receive it mutably.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub options: BuildOptions,
    pub pkg: PackageManifest,
    /// Normalized entries; empty until [`BuildContext::normalize_entries`].
    pub entries: Vec<Entry>,
    pub externals: ExternalsSet,
    pub manifest_deps: DependencyNames,
    pub build_entries: Vec<BuildEntry>,
    pub used_imports: IndexSet<String>,
    pub warnings: IndexSet<String>,
}

impl BuildContext {
    /// Assembles the context: manifest dependency lists and the externals
    /// set (configured externals plus manifest inference).
    pub fn new(options: BuildOptions, pkg: PackageManifest) -> Self {
        let externals = compute_externals(&options.externals, &pkg);
        let manifest_deps = DependencyNames::from_manifest(&pkg);
        Self {
            options,
            pkg,
            entries: Vec::new(),
            externals,
            manifest_deps,
            build_entries: Vec::new(),
            used_imports: IndexSet::new(),
            warnings: IndexSet::new(),
        }
    }

    /// Folds the current `options.externals` and the manifest inference
    /// into the externals set. Entries added earlier (by hooks) stay.
    pub fn refresh_externals(&mut self) {
        let computed = compute_externals(&self.options.externals, &self.pkg);
        self.externals.extend(computed.to_patterns());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(package = %self.options.name, %message, "build warning");
        self.warnings.insert(message);
    }

    /// Normalizes `options.entries` into [`BuildContext::entries`].
    pub fn normalize_entries(&mut self) -> Result<()> {
        self.entries = normalize_entries(&self.options)?;
        Ok(())
    }

    pub fn entries_for(&self, builder: BuilderKind) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |entry| entry.builder == builder)
    }

    pub fn out_dir(&self) -> &Path {
        &self.options.out_dir
    }
}

/// Normalizes configured entries.
///
/// Per entry: derive the name from the input when missing, reject an empty
/// input, infer the builder (`/`-terminated inputs mirror, everything else
/// bundles), inherit the global declaration flag, and resolve input and
/// output directory against the root. Names are unique across builders.
pub fn normalize_entries(options: &BuildOptions) -> Result<Vec<Entry>> {
    let mut entries = Vec::with_capacity(options.entries.len());
    let mut names = IndexSet::new();

    for (index, config) in options.entries.iter().enumerate() {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| derive_entry_name(&config.input, &options.root_dir));

        if config.input.trim().is_empty() {
            return Err(ConfigError::MissingEntryInput { index }.into());
        }

        let builder = config.builder.or(options.builder).unwrap_or_else(|| {
            if config.input.ends_with('/') {
                BuilderKind::Mirror
            } else {
                BuilderKind::Bundle
            }
        });

        let declaration = config.declaration.or(options.declaration).unwrap_or(false);

        let out_dir = config
            .out_dir
            .as_deref()
            .map(|dir| options.resolve(dir))
            .unwrap_or_else(|| options.out_dir.clone());

        if !names.insert(name.clone()) {
            return Err(ConfigError::InvalidValue(format!(
                "duplicate entry name `{name}` ({builder} entry #{index})"
            ))
            .into());
        }

        entries.push(Entry {
            name,
            input: options.resolve(Path::new(&config.input)),
            out_dir,
            builder,
            declaration,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dler_config::EntryConfig;
    use serde_json::json;

    fn options(entries: Vec<EntryConfig>) -> BuildOptions {
        let mut options: BuildOptions = serde_json::from_value(json!({
            "name": "pkg",
            "rootDir": "/work/pkg",
            "outDir": "/work/pkg/dist"
        }))
        .unwrap();
        options.entries = entries;
        options
    }

    #[test]
    fn derives_name_and_builder() {
        let entries = normalize_entries(&options(vec![
            EntryConfig::new("src/utils/helper.ts"),
            EntryConfig::new("src/runtime/"),
        ]))
        .unwrap();

        assert_eq!(entries[0].name, "utils/helper");
        assert_eq!(entries[0].builder, BuilderKind::Bundle);
        assert_eq!(entries[0].input, PathBuf::from("/work/pkg/src/utils/helper.ts"));
        assert_eq!(entries[0].out_dir, PathBuf::from("/work/pkg/dist"));

        assert_eq!(entries[1].name, "runtime/");
        assert_eq!(entries[1].builder, BuilderKind::Mirror);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = normalize_entries(&options(vec![
            EntryConfig::new("src/a.ts"),
            EntryConfig::new(""),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Config(ConfigError::MissingEntryInput { index: 1 })
        ));
    }

    #[test]
    fn declaration_inherits_global_flag() {
        let mut opts = options(vec![
            EntryConfig::new("src/a.ts"),
            EntryConfig {
                declaration: Some(false),
                ..EntryConfig::new("src/b.ts")
            },
        ]);
        opts.declaration = Some(true);

        let entries = normalize_entries(&opts).unwrap();
        assert!(entries[0].declaration);
        assert!(!entries[1].declaration);
    }

    #[test]
    fn explicit_out_dir_resolves_against_root() {
        let entries = normalize_entries(&options(vec![
            EntryConfig::new("src/cli.ts").with_out_dir("bin"),
        ]))
        .unwrap();
        assert_eq!(entries[0].out_dir, PathBuf::from("/work/pkg/bin"));
    }

    #[test]
    fn duplicate_names_for_one_builder_are_rejected() {
        let result = normalize_entries(&options(vec![
            EntryConfig::new("src/index.ts"),
            EntryConfig::new("src/index.mts"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_names_across_builders_are_rejected() {
        let err = normalize_entries(&options(vec![
            EntryConfig::new("src/index.ts"),
            EntryConfig::new("src/index.ts").with_builder(BuilderKind::Declaration),
        ]))
        .unwrap_err();
        match err {
            crate::Error::Config(ConfigError::InvalidValue(message)) => {
                assert!(message.contains("`index`"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn context_computes_externals_and_dependency_names() {
        let pkg: PackageManifest = serde_json::from_value(json!({
            "name": "foo",
            "dependencies": { "bar": "^1.0.0" },
            "devDependencies": { "vitest": "*" }
        }))
        .unwrap();
        let ctx = BuildContext::new(options(vec![]), pkg);

        assert!(ctx.externals.matches("bar"));
        assert!(ctx.externals.matches("foo"));
        assert!(!ctx.externals.matches("vitest"));
        assert_eq!(ctx.manifest_deps.dependencies, vec!["bar"]);
        assert_eq!(ctx.manifest_deps.dev_dependencies, vec!["vitest"]);
    }

    #[test]
    fn warnings_are_deduplicated() {
        let mut ctx = BuildContext::new(options(vec![]), PackageManifest::default());
        ctx.warn("same");
        ctx.warn("same");
        assert_eq!(ctx.warnings.len(), 1);
    }
}
