//! Per-package build driver.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use dler_config::{
    PackageManifest, Preset, default_options, manifest::manifest_path, merge_options,
    resolve_preset, select_preset,
};
use path_clean::PathClean;
use serde_json::Value;

use crate::auto::infer_entries_hook;
use crate::backends::{BackendSet, run_backends};
use crate::clean::{CleanedDirs, clean_outputs};
use crate::context::BuildContext;
use crate::hooks::{BuildHooks, HookStage};
use crate::report::{BuildReport, format_duration};
use crate::scan::scan_outputs;
use crate::validate::validate;
use crate::{Error, Result};

/// Everything needed to build one package.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub root_dir: PathBuf,
    /// Per-invocation options; highest precedence.
    pub build_config: Value,
    /// Caller defaults, typically from config-file discovery.
    pub input_config: Value,
    /// Overrides preset selection from the config layers.
    pub preset: Option<Preset>,
    pub hooks: BuildHooks,
    pub backends: BackendSet,
    pub cleaned: CleanedDirs,
}

impl BuildRequest {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            build_config: Value::Null,
            input_config: Value::Null,
            preset: None,
            hooks: BuildHooks::new(),
            backends: BackendSet::standard(),
            cleaned: CleanedDirs::new(),
        }
    }

    pub fn with_build_config(mut self, config: Value) -> Self {
        self.build_config = config;
        self
    }

    pub fn with_input_config(mut self, config: Value) -> Self {
        self.input_config = config;
        self
    }

    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = Some(preset);
        self
    }

    pub fn with_hooks(mut self, hooks: BuildHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_backends(mut self, backends: BackendSet) -> Self {
        self.backends = backends;
        self
    }

    pub fn with_cleaned(mut self, cleaned: CleanedDirs) -> Self {
        self.cleaned = cleaned;
        self
    }
}

/// Result of a successful package build.
#[derive(Debug)]
pub struct BuildOutcome {
    pub context: BuildContext,
    pub elapsed: Duration,
    pub report: BuildReport,
}

/// Builds one package.
///
/// Stages run strictly in order: manifest, preset, merge (with option
/// validation), context, prepare hooks, entry normalization, externals,
/// cleaning, before hooks, backends. Stub and watch builds stop there and
/// run the done hooks; full builds then scan the output directory,
/// validate, and run the done hooks.
///
/// With `transpileFailOnWarn`, any warning turns the result into
/// [`Error::WarningsAsErrors`].
pub async fn build(request: BuildRequest) -> Result<BuildOutcome> {
    let start = Instant::now();
    let BuildRequest {
        root_dir,
        build_config,
        input_config,
        preset,
        hooks: caller_hooks,
        backends,
        cleaned,
    } = request;

    let root_dir = absolute_root(&root_dir)?;
    let pkg = read_manifest(&root_dir).await?;

    let preset = preset.unwrap_or_else(|| select_preset(&build_config, &pkg, &input_config));
    let resolved = resolve_preset(&preset, &root_dir)?;
    let defaults = default_options(&root_dir, &pkg);
    let options = merge_options(
        &build_config,
        &pkg.build_config(),
        &input_config,
        &resolved.config,
        &defaults,
    )?;

    let mut ctx = BuildContext::new(options, pkg);
    tracing::debug!(package = %ctx.options.name, root = %root_dir.display(), "building package");

    let mut hooks = BuildHooks::new();
    if resolved.infer_entries {
        hooks.on(HookStage::Prepare, infer_entries_hook);
    }
    hooks.extend(caller_hooks);

    hooks.call(HookStage::Prepare, &mut ctx)?;
    ctx.normalize_entries()?;
    ctx.refresh_externals();

    if ctx.entries.is_empty() {
        ctx.warn("No build entries specified.");
    }

    if ctx.options.clean {
        clean_outputs(&ctx.options.root_dir, &ctx.entries, &cleaned).await?;
    }

    hooks.call(HookStage::Before, &mut ctx)?;
    run_backends(&mut ctx, &backends).await?;

    if ctx.options.is_incremental() {
        tracing::debug!(package = %ctx.options.name, "stub/watch build; skipping output scan and validation");
        hooks.call(HookStage::Done, &mut ctx)?;
    } else {
        scan_outputs(&mut ctx).await?;
        validate(&mut ctx);
        hooks.call(HookStage::Done, &mut ctx)?;
    }

    let elapsed = start.elapsed();
    if ctx.options.transpile_fail_on_warn && !ctx.warnings.is_empty() {
        return Err(Error::WarningsAsErrors {
            package: ctx.options.name.clone(),
            warnings: ctx.warnings.iter().cloned().collect(),
        });
    }

    let report = BuildReport::from_context(&ctx, elapsed);
    tracing::info!(
        package = %ctx.options.name,
        entries = ctx.build_entries.len(),
        warnings = ctx.warnings.len(),
        elapsed = %format_duration(elapsed),
        "build succeeded"
    );

    Ok(BuildOutcome {
        context: ctx,
        elapsed,
        report,
    })
}

fn absolute_root(root_dir: &Path) -> Result<PathBuf> {
    if root_dir.is_absolute() {
        return Ok(root_dir.clean());
    }
    Ok(std::env::current_dir()?.join(root_dir).clean())
}

/// Reads `package.json`; a package without one builds with an empty
/// manifest.
async fn read_manifest(root_dir: &Path) -> Result<PackageManifest> {
    let path = manifest_path(root_dir);
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Ok(PackageManifest::parse(&content, &path)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(PackageManifest::default()),
        Err(err) => Err(err.into()),
    }
}
