//! Rolldown-backed bundling for `bundle` entries.
//!
//! Entries are grouped by output directory and each group is bundled once
//! with every entry as a named input, so shared code lands in shared
//! chunks. A resolve-id plugin applies the externals set.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dler_config::{BuilderKind, ModuleFormat, SourcemapMode, TargetPlatform, package_name};
use indexmap::IndexSet;
use parking_lot::Mutex;
use rolldown::{
    BundlerBuilder, BundlerOptions, InputItem, OutputFormat, Platform, RawMinifyOptions,
    SourceMapType,
};
use rolldown_common::{Output, OutputChunk, ResolvedExternal};
use rolldown_plugin::__inner::SharedPluginable;
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookUsage, Plugin,
    PluginContext,
};
use rustc_hash::FxHashSet;

use super::declaration::display_path;
use super::{Backend, BackendOutput};
use crate::context::{BuildContext, BuildEntry, Entry, ModuleSize};
use crate::externals::ExternalsSet;
use crate::output::{OutputFile, write_output_files};
use crate::paths::{declaration_path, is_typescript, to_slash};
use crate::transform::generate_declaration;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct BundleBackend;

#[async_trait]
impl Backend for BundleBackend {
    fn kind(&self) -> BuilderKind {
        BuilderKind::Bundle
    }

    async fn build(&self, ctx: &BuildContext, entries: &[Entry]) -> Result<BackendOutput> {
        let mut groups: BTreeMap<&Path, Vec<&Entry>> = BTreeMap::new();
        for entry in entries {
            groups.entry(entry.out_dir.as_path()).or_default().push(entry);
        }

        let externals = Arc::new(ctx.externals.clone());
        let mut output = BackendOutput::new();
        for (out_dir, group) in groups {
            output.extend(bundle_group(ctx, out_dir, &group, Arc::clone(&externals)).await?);
        }
        Ok(output)
    }
}

async fn bundle_group(
    ctx: &BuildContext,
    out_dir: &Path,
    entries: &[&Entry],
    externals: Arc<ExternalsSet>,
) -> Result<BackendOutput> {
    let plugin = ExternalsPlugin::new(externals, ctx.options.bundler.inline_dependencies);
    let seen = plugin.seen();
    let plugins: Vec<SharedPluginable> = vec![Arc::new(plugin)];

    let options = BundlerOptions {
        input: Some(
            entries
                .iter()
                .map(|entry| InputItem {
                    name: Some(entry.name.clone()),
                    import: entry.input.to_string_lossy().into_owned(),
                })
                .collect(),
        ),
        cwd: Some(ctx.options.root_dir.clone()),
        format: Some(output_format(ctx.options.bundler.format)),
        platform: Some(platform(ctx.options.bundler.platform)),
        sourcemap: sourcemap_type(ctx.options.sourcemap),
        minify: ctx.options.minify.then(|| RawMinifyOptions::from(true)),
        ..Default::default()
    };

    tracing::debug!(out_dir = %out_dir.display(), entries = entries.len(), "bundling");

    let mut bundler = BundlerBuilder::default()
        .with_options(options)
        .with_plugins(plugins)
        .build()
        .map_err(|e| Error::from_rolldown(&e))?;
    let bundle = bundler
        .generate()
        .await
        .map_err(|e| Error::from_rolldown(&e))?;

    let mut chunk_files = FxHashSet::default();
    let mut asset_files = FxHashSet::default();
    for item in &bundle.assets {
        match item {
            Output::Chunk(chunk) => chunk_files.insert(chunk.filename.to_string()),
            Output::Asset(asset) => asset_files.insert(asset.filename.to_string()),
        };
    }

    let mut files = Vec::new();
    let mut records = Vec::new();
    let mut output = BackendOutput::new();

    for item in &bundle.assets {
        match item {
            Output::Chunk(chunk) => {
                files.push(OutputFile::new(chunk.filename.as_str(), chunk.code.as_bytes()));
                if let (Some(map), Some(map_file)) = (&chunk.map, &chunk.sourcemap_filename) {
                    if !asset_files.contains(map_file.as_str()) {
                        files.push(OutputFile::new(map_file.as_str(), map.to_json_string()));
                    }
                }

                let (record, external_imports) = chunk_record(chunk, &chunk_files);
                output.used_imports.extend(external_imports);
                records.push(record);
            }
            Output::Asset(asset) => {
                files.push(OutputFile::new(asset.filename.as_str(), asset.source.as_bytes()));
            }
        }
    }

    for entry in entries.iter().filter(|entry| entry.declaration) {
        if !is_typescript(&entry.input) {
            continue;
        }
        let source = tokio::fs::read_to_string(&entry.input).await?;
        let dts = generate_declaration(&source, &entry.input)?;
        let ext = entry.input.extension().and_then(|e| e.to_str()).unwrap_or("ts");
        let relative = declaration_path(&PathBuf::from(format!("{}.{ext}", entry.name)));
        let filename = to_slash(&relative);
        records.push(BuildEntry::entry(filename.clone()).with_bytes(dts.len() as u64));
        files.push(OutputFile::new(filename, dts));
    }

    write_output_files(out_dir, &files)?;

    // Record paths are relative to the group directory until here.
    let relocate = |name: &str| display_path(ctx.out_dir(), &out_dir.join(name));
    for record in records {
        output.push_entry(BuildEntry {
            path: relocate(&record.path),
            chunks: record
                .chunks
                .as_ref()
                .map(|chunks| chunks.iter().map(|chunk| relocate(chunk)).collect()),
            ..record
        });
    }

    let seen = seen.lock();
    output.used_imports.extend(seen.used.iter().cloned());
    output.warnings.extend(seen.warnings.iter().cloned());

    Ok(output)
}

/// Build record for one chunk plus the imports that are not emitted chunks.
fn chunk_record(chunk: &OutputChunk, chunk_files: &FxHashSet<String>) -> (BuildEntry, Vec<String>) {
    let (internal, external): (Vec<String>, Vec<String>) = chunk
        .imports
        .iter()
        .chain(chunk.dynamic_imports.iter())
        .map(|import| import.to_string())
        .partition(|import| chunk_files.contains(import));

    let modules = chunk
        .modules
        .keys
        .iter()
        .zip(chunk.modules.values.iter())
        .map(|(id, module)| ModuleSize {
            id: id.to_string(),
            bytes: module.code().map(|code| code.len() as u64).unwrap_or(0),
        })
        .collect();

    let record = BuildEntry {
        path: chunk.filename.to_string(),
        bytes: Some(chunk.code.len() as u64),
        chunk: !chunk.is_entry,
        chunks: Some(internal),
        exports: Some(chunk.exports.iter().map(|name| name.to_string()).collect()),
        modules: Some(modules),
    };
    (record, external)
}

fn output_format(format: ModuleFormat) -> OutputFormat {
    match format {
        ModuleFormat::Esm => OutputFormat::Esm,
        ModuleFormat::Cjs => OutputFormat::Cjs,
    }
}

fn platform(platform: TargetPlatform) -> Platform {
    match platform {
        TargetPlatform::Node => Platform::Node,
        TargetPlatform::Browser => Platform::Browser,
        TargetPlatform::Neutral => Platform::Neutral,
    }
}

fn sourcemap_type(mode: SourcemapMode) -> Option<SourceMapType> {
    match mode {
        SourcemapMode::None => None,
        SourcemapMode::File => Some(SourceMapType::File),
        SourcemapMode::Inline => Some(SourceMapType::Inline),
        SourcemapMode::Hidden => Some(SourceMapType::Hidden),
    }
}

/// Specifiers the externals plugin observed during one bundle run.
#[derive(Debug, Default)]
pub struct SeenImports {
    pub used: IndexSet<String>,
    pub warnings: IndexSet<String>,
}

/// Resolve-id plugin that applies the externals set.
///
/// Bare specifiers matched by the set (directly or by package name) are
/// marked external. Every bare specifier is recorded; one that stays
/// inlined produces an `Inlined implicit external` warning unless
/// dependency inlining is enabled.
#[derive(Debug, Clone)]
pub struct ExternalsPlugin {
    externals: Arc<ExternalsSet>,
    inline_dependencies: bool,
    seen: Arc<Mutex<SeenImports>>,
}

impl ExternalsPlugin {
    pub fn new(externals: Arc<ExternalsSet>, inline_dependencies: bool) -> Self {
        Self {
            externals,
            inline_dependencies,
            seen: Arc::default(),
        }
    }

    /// Handle to the recorded specifiers; readable after the bundle run.
    pub fn seen(&self) -> Arc<Mutex<SeenImports>> {
        Arc::clone(&self.seen)
    }

    /// Classifies one import. Returns whether it is external.
    pub fn observe(&self, specifier: &str) -> bool {
        let external =
            self.externals.matches(specifier) || self.externals.matches(package_name(specifier));
        if specifier.starts_with('#') {
            return external;
        }

        let mut seen = self.seen.lock();
        seen.used.insert(specifier.to_string());
        if !external && !self.inline_dependencies {
            seen.warnings
                .insert(format!("Inlined implicit external {specifier}"));
        }
        external
    }
}

/// Relative, absolute and virtual ids are never externals candidates.
fn is_bare_specifier(specifier: &str) -> bool {
    !(specifier.is_empty()
        || specifier.starts_with('.')
        || specifier.starts_with('/')
        || specifier.starts_with('\0')
        || Path::new(specifier).is_absolute())
}

impl Plugin for ExternalsPlugin {
    fn name(&self) -> Cow<'static, str> {
        "dler-externals".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let has_importer = args.importer.is_some();
        let plugin = self.clone();

        async move {
            if !has_importer || !is_bare_specifier(&specifier) {
                return Ok(None);
            }
            if !plugin.observe(&specifier) {
                return Ok(None);
            }
            Ok(Some(HookResolveIdOutput {
                id: specifier.into(),
                external: Some(ResolvedExternal::Bool(true)),
                ..Default::default()
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dler_config::{BuildOptions, EntryConfig, ExternalPattern, PackageManifest};
    use std::fs;
    use tempfile::TempDir;

    fn plugin(inline: bool) -> ExternalsPlugin {
        let externals: ExternalsSet = [
            ExternalPattern::exact("bar"),
            ExternalPattern::exact("node:fs"),
            ExternalPattern::regex("^#internal/.*$").unwrap(),
        ]
        .into_iter()
        .collect();
        ExternalsPlugin::new(Arc::new(externals), inline)
    }

    #[test]
    fn bare_specifier_detection() {
        assert!(is_bare_specifier("bar"));
        assert!(is_bare_specifier("@scope/pkg/sub"));
        assert!(!is_bare_specifier("./local"));
        assert!(!is_bare_specifier("../up"));
        assert!(!is_bare_specifier("/abs/file.js"));
        assert!(!is_bare_specifier("\0virtual"));
    }

    #[test]
    fn subpaths_of_externals_are_external() {
        let plugin = plugin(false);
        assert!(plugin.observe("bar"));
        assert!(plugin.observe("bar/sub"));
        assert!(plugin.observe("node:fs"));
        assert!(plugin.seen().lock().warnings.is_empty());
    }

    #[test]
    fn inlined_bare_imports_warn() {
        let plugin = plugin(false);
        assert!(!plugin.observe("baz"));

        let seen = plugin.seen();
        let seen = seen.lock();
        assert!(seen.used.contains("baz"));
        assert!(seen.warnings.contains("Inlined implicit external baz"));
    }

    #[test]
    fn inline_dependencies_silences_the_warning() {
        let plugin = plugin(true);
        assert!(!plugin.observe("baz"));
        assert!(plugin.seen().lock().warnings.is_empty());
    }

    #[test]
    fn subpath_imports_are_not_recorded() {
        let plugin = plugin(false);
        assert!(plugin.observe("#internal/util"));
        assert!(!plugin.observe("#other"));
        let seen = plugin.seen();
        let seen = seen.lock();
        assert!(seen.used.is_empty());
        assert!(seen.warnings.is_empty());
    }

    #[tokio::test]
    async fn shared_module_lands_in_one_chunk() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/shared.ts"), "export const greeting: string = \"hi\";\n").unwrap();
        fs::write(
            root.join("src/a.ts"),
            "import { greeting } from \"./shared.ts\";\nimport { join } from \"bar\";\n\
             export function a(): string {\n  return join(greeting, \"a\");\n}\n",
        )
        .unwrap();
        fs::write(
            root.join("src/b.ts"),
            "import { greeting } from \"./shared.ts\";\nimport { join } from \"bar\";\n\
             export function b(): string {\n  return join(greeting, \"b\");\n}\n",
        )
        .unwrap();

        let mut options: BuildOptions = serde_json::from_value(serde_json::json!({
            "name": "pkg",
            "rootDir": root,
            "outDir": root.join("dist"),
            "declaration": true,
        }))
        .unwrap();
        options.entries = vec![EntryConfig::new("src/a.ts"), EntryConfig::new("src/b.ts")];
        let pkg: PackageManifest = serde_json::from_value(serde_json::json!({
            "name": "pkg",
            "dependencies": { "bar": "^1.0.0" }
        }))
        .unwrap();
        let mut ctx = BuildContext::new(options, pkg);
        ctx.normalize_entries().unwrap();

        let entries: Vec<Entry> = ctx.entries.clone();
        let output = BundleBackend.build(&ctx, &entries).await.unwrap();

        let record = |path: &str| {
            output
                .entries
                .iter()
                .find(|entry| entry.path == path)
                .unwrap_or_else(|| panic!("no record for {path}: {:?}", output.entries))
        };
        for (path, export) in [("a.js", "a"), ("b.js", "b")] {
            let entry = record(path);
            assert!(!entry.chunk);
            assert_eq!(entry.exports.as_deref(), Some(&[export.to_string()][..]));
            assert_eq!(entry.chunks.as_ref().map(Vec::len), Some(1));
            assert!(root.join("dist").join(path).exists());
        }

        let shared: Vec<_> = output.entries.iter().filter(|entry| entry.chunk).collect();
        assert_eq!(shared.len(), 1);
        assert!(record("a.js").chunks.as_ref().unwrap().contains(&shared[0].path));
        assert!(root.join("dist").join(&shared[0].path).exists());

        assert!(output.used_imports.contains("bar"));
        assert!(output.warnings.is_empty());

        for path in ["a.d.ts", "b.d.ts"] {
            assert!(record(path).bytes.is_some_and(|bytes| bytes > 0));
            let dts = fs::read_to_string(root.join("dist").join(path)).unwrap();
            assert!(dts.contains("(): string"), "{dts}");
        }
    }
}
