//! Post-build validation. Findings become warnings on the context; nothing
//! here fails the build.

use std::path::Path;

use dler_config::package_name;
use indexmap::IndexSet;
use path_clean::PathClean;
use rustc_hash::FxHashSet;

use crate::context::BuildContext;
use crate::exports::extract_export_filenames;
use crate::paths::relative_to;

/// Prefix of emitted shared chunks; such imports are never dependencies.
pub const CHUNK_PREFIX: &str = "chunks/";

/// Runs both validations.
pub fn validate(ctx: &mut BuildContext) {
    validate_dependencies(ctx);
    validate_package(ctx);
}

/// Flags declared-but-unused and used-but-undeclared dependencies.
pub fn validate_dependencies(ctx: &mut BuildContext) {
    let used_packages: FxHashSet<&str> = ctx
        .used_imports
        .iter()
        .map(|specifier| package_name(specifier))
        .collect();
    let overrides: FxHashSet<&str> = ctx.options.dependencies.iter().map(String::as_str).collect();

    let unused: Vec<&str> = ctx
        .manifest_deps
        .dependencies
        .iter()
        .map(String::as_str)
        .filter(|name| !used_packages.contains(name) && !overrides.contains(name))
        .collect();

    let declared: FxHashSet<&str> = ctx
        .manifest_deps
        .dependencies
        .iter()
        .chain(&ctx.manifest_deps.peer_dependencies)
        .chain(&ctx.options.dependencies)
        .chain(&ctx.options.peer_dependencies)
        .map(String::as_str)
        .collect();

    let implicit: IndexSet<&str> = ctx
        .used_imports
        .iter()
        .map(String::as_str)
        .filter(|id| {
            !ctx.externals.matches(id)
                && !id.starts_with(CHUNK_PREFIX)
                && !declared.contains(package_name(id))
        })
        .collect();

    let mut warnings = Vec::new();
    if !unused.is_empty() {
        warnings.push(format!(
            "Potential unused dependencies found: {}",
            unused.join(", ")
        ));
    }
    if !implicit.is_empty() && !ctx.options.bundler.inline_dependencies {
        warnings.push(format!(
            "Potential implicit dependencies found: {}",
            implicit.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }

    for warning in warnings {
        ctx.warn(warning);
    }
}

/// Flags manifest-referenced outputs that do not exist after the build.
///
/// Wildcard paths are checked up to the directory holding the wildcard.
pub fn validate_package(ctx: &mut BuildContext) {
    let root_dir = ctx.options.root_dir.clone();
    let pkg = &ctx.pkg;

    let mut declared: Vec<&str> = Vec::new();
    if let Some(bin) = &pkg.bin {
        declared.extend(bin.paths());
    }
    declared.extend(
        [&pkg.main, &pkg.module, &pkg.types, &pkg.typings]
            .into_iter()
            .flatten()
            .map(String::as_str),
    );
    let export_files: Vec<String> = pkg
        .exports
        .as_ref()
        .map(|exports| extract_export_filenames(exports).into_iter().map(|d| d.file).collect())
        .unwrap_or_default();
    declared.extend(export_files.iter().map(String::as_str));

    let mut seen = IndexSet::new();
    let mut missing = Vec::new();
    for file in declared.into_iter().filter(|file| !file.contains('*')) {
        let path = root_dir.join(file).clean();
        if !seen.insert(path.clone()) {
            continue;
        }
        if !path.exists() {
            missing.push(display_missing(&root_dir, &path));
        }
    }

    if !missing.is_empty() {
        ctx.warn(format!(
            "Potential missing package.json files: {}",
            missing.join(", ")
        ));
    }
}

fn display_missing(root_dir: &Path, path: &Path) -> String {
    relative_to(root_dir, path).unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dler_config::{BuildOptions, ExternalPattern, PackageManifest};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn ctx(root: &Path, pkg: serde_json::Value) -> BuildContext {
        let options: BuildOptions = serde_json::from_value(json!({
            "name": "pkg",
            "rootDir": root,
            "outDir": root.join("dist"),
        }))
        .unwrap();
        let pkg: PackageManifest = serde_json::from_value(pkg).unwrap();
        BuildContext::new(options, pkg)
    }

    #[test]
    fn unused_dependency_yields_one_warning() {
        let temp = TempDir::new().unwrap();
        let mut ctx = ctx(temp.path(), json!({ "name": "foo", "dependencies": { "lodash": "*" } }));

        validate_dependencies(&mut ctx);

        assert_eq!(ctx.warnings.len(), 1);
        assert!(ctx.warnings[0].contains("lodash"));
        assert!(ctx.warnings[0].starts_with("Potential unused dependencies found"));
    }

    #[test]
    fn subpath_import_counts_as_use() {
        let temp = TempDir::new().unwrap();
        let mut ctx = ctx(temp.path(), json!({ "dependencies": { "lodash": "*" } }));
        ctx.used_imports.insert("lodash/merge".into());

        validate_dependencies(&mut ctx);
        assert!(ctx.warnings.is_empty());
    }

    #[test]
    fn override_list_suppresses_unused() {
        let temp = TempDir::new().unwrap();
        let mut ctx = ctx(temp.path(), json!({ "dependencies": { "lodash": "*" } }));
        ctx.options.dependencies.push("lodash".into());

        validate_dependencies(&mut ctx);
        assert!(ctx.warnings.is_empty());
    }

    #[test]
    fn implicit_dependencies_are_reported() {
        let temp = TempDir::new().unwrap();
        let mut ctx = ctx(temp.path(), json!({ "name": "foo" }));
        ctx.used_imports.insert("@scope/util/sub".into());
        ctx.used_imports.insert("chunks/shared.js".into());
        ctx.externals.insert(ExternalPattern::exact("node:fs"));
        ctx.used_imports.insert("node:fs".into());

        validate_dependencies(&mut ctx);

        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(
            ctx.warnings[0],
            "Potential implicit dependencies found: @scope/util/sub"
        );
    }

    #[test]
    fn inline_dependencies_silences_implicit_warning() {
        let temp = TempDir::new().unwrap();
        let mut ctx = ctx(temp.path(), json!({ "name": "foo" }));
        ctx.used_imports.insert("baz".into());
        ctx.options.bundler.inline_dependencies = true;

        validate_dependencies(&mut ctx);
        assert!(ctx.warnings.is_empty());
    }

    #[test]
    fn missing_main_is_reported_until_it_exists() {
        let temp = TempDir::new().unwrap();
        let pkg = json!({ "name": "foo", "main": "./dist/index.js" });

        let mut missing = ctx(temp.path(), pkg.clone());
        validate_package(&mut missing);
        assert_eq!(missing.warnings.len(), 1);
        assert!(missing.warnings[0].contains("dist/index.js"));

        fs::create_dir_all(temp.path().join("dist")).unwrap();
        fs::write(temp.path().join("dist/index.js"), "").unwrap();
        let mut present = ctx(temp.path(), pkg);
        validate_package(&mut present);
        assert!(present.warnings.is_empty());
    }

    #[test]
    fn exports_bin_and_wildcards_are_checked() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("dist")).unwrap();
        fs::write(temp.path().join("dist/index.mjs"), "").unwrap();

        let mut ctx = ctx(
            temp.path(),
            json!({
                "name": "foo",
                "bin": { "foo": "./dist/cli.mjs" },
                "exports": {
                    ".": { "import": "./dist/index.mjs", "require": "./dist/index.cjs" },
                    "./features/*": "./dist/features/*.mjs",
                    "./locales/*": { "import": "./dist/locales/*/index.mjs" },
                    "./package.json": "./package.json"
                }
            }),
        );
        validate_package(&mut ctx);

        // Neither dist/features nor dist/locales exists; wildcard targets
        // are never checked.
        assert!(!temp.path().join("dist/features").exists());
        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(
            ctx.warnings[0],
            "Potential missing package.json files: dist/cli.mjs, dist/index.cjs"
        );
    }
}
