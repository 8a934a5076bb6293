//! File-to-file transpile for directory entries.
//!
//! Walks the input directory and writes a mirrored tree: TypeScript and JSX
//! sources become JavaScript, everything else is copied as-is.

use std::borrow::Cow;
use std::path::Path;

use async_trait::async_trait;
use dler_config::BuilderKind;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::declaration::display_path;
use super::{Backend, BackendOutput};
use crate::context::{BuildContext, BuildEntry, Entry};
use crate::output::{OutputFile, write_output_files};
use crate::paths::{declaration_path, is_declaration_file, is_typescript, list_recursively, to_slash};
use crate::transform::{generate_declaration, transpile_module};
use crate::{Error, Result};

static RELATIVE_TS_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"((?:\bfrom|\bimport|\brequire)\s*\(?\s*)(["'])(\.\.?/[^"'\n]+?)\.(tsx?|mts|cts)(["'])"#)
        .expect("valid regex")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct MirrorBackend;

#[async_trait]
impl Backend for MirrorBackend {
    fn kind(&self) -> BuilderKind {
        BuilderKind::Mirror
    }

    async fn build(&self, ctx: &BuildContext, entries: &[Entry]) -> Result<BackendOutput> {
        let mut output = BackendOutput::new();
        let js_ext = ctx.options.mirror.ext.trim_start_matches('.');

        for entry in entries {
            if !entry.input.is_dir() {
                return Err(Error::Backend {
                    backend: BuilderKind::Mirror,
                    message: format!("input `{}` is not a directory", entry.input.display()),
                });
            }

            let mut files = Vec::new();
            for source_path in list_recursively(&entry.input)? {
                let Ok(relative) = source_path.strip_prefix(&entry.input) else {
                    continue;
                };
                files.extend(mirror_file(&source_path, relative, js_ext, entry.declaration).await?);
            }

            let written = write_output_files(&entry.out_dir, &files)?;
            let chunks: Vec<String> = written
                .iter()
                .map(|path| display_path(ctx.out_dir(), path))
                .collect();

            tracing::debug!(entry = %entry.name, files = chunks.len(), "mirrored directory");
            output.push_entry(
                BuildEntry::entry(dir_label(ctx.out_dir(), &entry.out_dir)).with_chunks(chunks),
            );
        }

        Ok(output)
    }
}

/// The output files for one source file.
async fn mirror_file(
    source_path: &Path,
    relative: &Path,
    js_ext: &str,
    declaration: bool,
) -> Result<Vec<OutputFile>> {
    if is_declaration_file(source_path) || !is_transpilable(source_path) {
        let contents = tokio::fs::read(source_path).await?;
        return Ok(vec![OutputFile::new(to_slash(relative), contents)]);
    }

    let source = tokio::fs::read_to_string(source_path).await?;
    let code = transpile_module(&source, source_path)?;
    let code = rewrite_relative_imports(&code, js_ext).into_owned();

    let out_ext = match relative.extension().and_then(|e| e.to_str()) {
        Some("mts") => "mjs",
        Some("cts") => "cjs",
        _ => js_ext,
    };
    let mut files = vec![OutputFile::new(to_slash(&relative.with_extension(out_ext)), code)];

    if declaration && is_typescript(source_path) {
        let dts = generate_declaration(&source, source_path)?;
        files.push(OutputFile::new(to_slash(&declaration_path(relative)), dts));
    }

    Ok(files)
}

fn is_transpilable(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ts" | "mts" | "cts" | "tsx" | "jsx")
    )
}

/// Rewrites relative import specifiers that name a TypeScript file so they
/// point at the emitted JavaScript file.
pub fn rewrite_relative_imports<'a>(code: &'a str, js_ext: &str) -> Cow<'a, str> {
    RELATIVE_TS_IMPORT_RE.replace_all(code, |caps: &Captures<'_>| {
        let ext = match &caps[4] {
            "mts" => "mjs",
            "cts" => "cjs",
            _ => js_ext,
        };
        format!("{}{}{}.{ext}{}", &caps[1], &caps[2], &caps[3], &caps[5])
    })
}

/// Label for a directory-level entry: relative to `outDir` with a trailing
/// slash.
pub(crate) fn dir_label(out_dir: &Path, dir: &Path) -> String {
    let label = display_path(out_dir, dir);
    if label.is_empty() {
        "./".to_string()
    } else {
        format!("{label}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dler_config::{BuildOptions, EntryConfig, PackageManifest};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn rewrites_typescript_specifiers() {
        let code = r#"import { a } from "./a.ts";
export * from '../b.mts';
const c = await import("./c.tsx");
import x from "pkg/file.ts";
"#;
        let rewritten = rewrite_relative_imports(code, "js");
        assert!(rewritten.contains(r#"from "./a.js""#));
        assert!(rewritten.contains("from '../b.mjs'"));
        assert!(rewritten.contains(r#"import("./c.js")"#));
        assert!(rewritten.contains(r#""pkg/file.ts""#));
    }

    #[tokio::test]
    async fn mirrors_directory_tree() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src/runtime");
        fs::create_dir_all(src.join("nested")).unwrap();
        fs::write(
            src.join("index.ts"),
            "import { helper } from './nested/helper.ts';\nexport const run = (): number => helper();\n",
        )
        .unwrap();
        fs::write(
            src.join("nested/helper.ts"),
            "export function helper(): number { return 1; }\n",
        )
        .unwrap();
        fs::write(src.join("types.d.ts"), "export type T = 1;\n").unwrap();
        fs::write(src.join("data.json"), "{}").unwrap();

        let mut options: BuildOptions = serde_json::from_value(serde_json::json!({
            "name": "pkg",
            "rootDir": temp.path(),
            "outDir": temp.path().join("dist"),
        }))
        .unwrap();
        options.entries = vec![EntryConfig::new("src/runtime/").with_out_dir("dist/runtime")];
        let mut ctx = BuildContext::new(options, PackageManifest::default());
        ctx.normalize_entries().unwrap();
        ctx.entries[0].declaration = true;

        let entries = ctx.entries.clone();
        let output = MirrorBackend.build(&ctx, &entries).await.unwrap();

        let out = temp.path().join("dist/runtime");
        let index = fs::read_to_string(out.join("index.js")).unwrap();
        assert!(index.contains("./nested/helper.js"));
        assert!(!index.contains(": number"));
        assert!(out.join("nested/helper.js").exists());
        assert!(out.join("index.d.ts").exists());
        assert!(out.join("types.d.ts").exists());
        assert!(out.join("data.json").exists());

        assert_eq!(output.entries.len(), 1);
        assert_eq!(output.entries[0].path, "runtime/");
        let chunks = output.entries[0].chunks.as_ref().unwrap();
        assert!(chunks.contains(&"runtime/index.js".to_string()));
    }

    #[tokio::test]
    async fn file_input_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/index.ts"), "export {};\n").unwrap();

        let mut options: BuildOptions = serde_json::from_value(serde_json::json!({
            "name": "pkg",
            "rootDir": temp.path(),
            "outDir": temp.path().join("dist"),
        }))
        .unwrap();
        options.entries = vec![EntryConfig::new("src/index.ts").with_builder(BuilderKind::Mirror)];
        let mut ctx = BuildContext::new(options, PackageManifest::default());
        ctx.normalize_entries().unwrap();

        let entries = ctx.entries.clone();
        assert!(MirrorBackend.build(&ctx, &entries).await.is_err());
    }
}
