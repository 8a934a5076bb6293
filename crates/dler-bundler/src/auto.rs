//! Entry inference for the `auto` preset.
//!
//! Maps every output the manifest declares (`exports`, `bin`, `main`,
//! `module`, `types`) back to a source under `src/`.

use std::borrow::Cow;
use std::path::Path;

use dler_config::{EntryConfig, PackageManifest};
use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

use crate::Result;
use crate::context::BuildContext;
use crate::exports::extract_export_filenames;

static OUTPUT_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\*[^/\\]*|\.d\.(m|c)?ts|\.\w+)$").expect("valid regex"));
static SOURCE_EXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\.[jt]sx?|\.[mc]ts)$").expect("valid regex"));
static DECLARATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.d\.(m|c)?ts$").expect("valid regex"));

#[derive(Debug, Default, PartialEq, Eq)]
pub struct InferredEntries {
    pub entries: Vec<EntryConfig>,
    /// A declaration file is among the outputs.
    pub declaration: bool,
    pub warnings: Vec<String>,
}

/// `build:prepare` hook installed by the `auto` preset. Does nothing when
/// entries are already configured.
pub fn infer_entries_hook(ctx: &mut BuildContext) -> Result<()> {
    if !ctx.options.entries.is_empty() {
        return Ok(());
    }

    let root_dir = ctx.options.root_dir.clone();
    let sources = list_sources(&root_dir.join("src"))?;
    let inferred = infer_entries(&ctx.pkg, &sources, &root_dir);

    for warning in inferred.warnings {
        ctx.warn(warning);
    }
    if ctx.options.declaration.is_none() {
        ctx.options.declaration = Some(inferred.declaration);
    }

    tracing::debug!(
        package = %ctx.options.name,
        entries = ?inferred.entries.iter().map(|e| e.input.as_str()).collect::<Vec<_>>(),
        "automatically detected entries"
    );
    ctx.options.entries.extend(inferred.entries);
    Ok(())
}

/// Infers entries from the manifest outputs.
///
/// `sources` are forward-slash paths; directories end with `/`.
pub fn infer_entries(pkg: &PackageManifest, sources: &[String], root_dir: &Path) -> InferredEntries {
    let mut sources: Vec<&String> = sources.iter().collect();
    sources.sort_by_key(|source| source.split('/').count());

    let mut inferred = InferredEntries::default();

    for output in declared_outputs(pkg) {
        let slug = OUTPUT_SLUG_RE.replace(&output, "").into_owned();
        let is_dir = slug.ends_with('/');
        if is_dir && (slug == "./" || slug == "/") {
            continue;
        }

        let Some(input) = find_source(&slug, is_dir, &sources) else {
            if !root_dir.join(&output).exists() {
                inferred
                    .warnings
                    .push(format!("Could not find entrypoint for `{output}`"));
            }
            continue;
        };

        if DECLARATION_RE.is_match(&output) {
            inferred.declaration = true;
        }

        let position = match inferred.entries.iter().position(|e| e.input == input) {
            Some(position) => position,
            None => {
                inferred.entries.push(EntryConfig::new(input));
                inferred.entries.len() - 1
            }
        };
        if is_dir {
            inferred.entries[position].out_dir = Some(slug.into());
        }
    }

    inferred
}

/// Every output file the manifest declares.
fn declared_outputs(pkg: &PackageManifest) -> Vec<String> {
    let mut outputs: Vec<String> = pkg
        .exports
        .as_ref()
        .map(extract_export_filenames)
        .unwrap_or_default()
        .into_iter()
        .map(|descriptor| descriptor.file)
        .collect();

    if let Some(bin) = &pkg.bin {
        outputs.extend(bin.paths().into_iter().map(str::to_string));
    }
    outputs.extend(pkg.main.iter().cloned());
    outputs.extend(pkg.module.iter().cloned());
    outputs.extend(pkg.types.as_ref().or(pkg.typings.as_ref()).cloned());
    outputs
}

/// Candidate source suffixes for an output slug: `./dist/a/b` ->
/// `dist/a/b`, `a/b`, `b`.
fn entrypoint_paths(slug: &str) -> Vec<String> {
    let normalized = slug.trim_start_matches("./").trim_start_matches('/');
    let segments: Vec<&str> = normalized.split('/').collect();
    (0..segments.len())
        .map(|index| segments[index..].join("/"))
        .filter(|candidate| !candidate.is_empty())
        .collect()
}

fn find_source(slug: &str, is_dir: bool, sources: &[&String]) -> Option<String> {
    entrypoint_paths(slug).into_iter().find_map(|candidate| {
        sources.iter().find_map(|source| {
            let stem: Cow<'_, str> = if is_dir {
                Cow::Borrowed(source.as_str())
            } else {
                SOURCE_EXT_RE.replace(source.as_str(), "")
            };
            let matched = stem == candidate || stem.ends_with(&format!("/{candidate}"));
            matched.then(|| source.to_string())
        })
    })
}

/// Files and directories under `src_dir`, as forward-slash strings with a
/// trailing `/` on directories.
fn list_sources(src_dir: &Path) -> std::io::Result<Vec<String>> {
    if !src_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut sources = Vec::new();
    for entry in WalkDir::new(src_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path().to_string_lossy().replace('\\', "/");
        if entry.file_type().is_dir() {
            sources.push(format!("{path}/"));
        } else {
            sources.push(path);
        }
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn pkg(value: serde_json::Value) -> PackageManifest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn maps_exports_to_sources() {
        let sources = vec![
            "/p/src/index.ts".to_string(),
            "/p/src/cli/".to_string(),
            "/p/src/cli/main.ts".to_string(),
        ];
        let inferred = infer_entries(
            &pkg(json!({
                "exports": {
                    ".": { "types": "./dist/index.d.ts", "import": "./dist/index.mjs" }
                },
                "bin": { "tool": "./dist/cli/main.mjs" }
            })),
            &sources,
            Path::new("/p"),
        );

        let inputs: Vec<_> = inferred.entries.iter().map(|e| e.input.as_str()).collect();
        assert_eq!(inputs, vec!["/p/src/index.ts", "/p/src/cli/main.ts"]);
        assert!(inferred.declaration);
        assert!(inferred.warnings.is_empty());
    }

    #[test]
    fn directory_outputs_become_mirror_entries() {
        let sources = vec!["/p/src/runtime/".to_string(), "/p/src/runtime/a.ts".to_string()];
        let inferred = infer_entries(
            &pkg(json!({ "exports": { "./runtime/*": "./dist/runtime/*" } })),
            &sources,
            Path::new("/p"),
        );

        assert_eq!(inferred.entries.len(), 1);
        assert_eq!(inferred.entries[0].input, "/p/src/runtime/");
        assert_eq!(
            inferred.entries[0].out_dir.as_deref(),
            Some(Path::new("./dist/runtime/"))
        );
        assert!(!inferred.declaration);
    }

    #[test]
    fn missing_sources_warn() {
        let inferred = infer_entries(
            &pkg(json!({ "main": "./dist/missing.js" })),
            &[],
            Path::new("/nonexistent-root"),
        );
        assert!(inferred.entries.is_empty());
        assert_eq!(
            inferred.warnings,
            vec!["Could not find entrypoint for `./dist/missing.js`"]
        );
    }

    #[test]
    fn shared_sources_are_deduplicated() {
        let sources = vec!["/p/src/index.ts".to_string()];
        let inferred = infer_entries(
            &pkg(json!({ "main": "./dist/index.cjs", "module": "./dist/index.mjs" })),
            &sources,
            Path::new("/p"),
        );
        assert_eq!(inferred.entries.len(), 1);
    }

    #[test]
    fn lists_sources_with_directory_markers() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src/nested")).unwrap();
        std::fs::write(temp.path().join("src/nested/a.ts"), "").unwrap();

        let sources = list_sources(&temp.path().join("src")).unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources[0].ends_with("/src/nested/"));
        assert!(sources[1].ends_with("/src/nested/a.ts"));
    }

    #[test]
    fn entrypoint_candidates_drop_leading_segments() {
        assert_eq!(
            entrypoint_paths("./dist/a/b"),
            vec!["dist/a/b", "a/b", "b"]
        );
        assert_eq!(entrypoint_paths("./dist/rt/"), vec!["dist/rt/", "rt/"]);
    }
}
