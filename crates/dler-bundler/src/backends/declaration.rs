//! `.d.ts` emit for `declaration` entries.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dler_config::BuilderKind;

use super::{Backend, BackendOutput};
use crate::context::{BuildContext, BuildEntry, Entry};
use crate::output::{OutputFile, write_output_files};
use crate::paths::{declaration_path, is_typescript, list_recursively, relative_to, to_slash};
use crate::transform::generate_declaration;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarationBackend;

#[async_trait]
impl Backend for DeclarationBackend {
    fn kind(&self) -> BuilderKind {
        BuilderKind::Declaration
    }

    async fn build(&self, ctx: &BuildContext, entries: &[Entry]) -> Result<BackendOutput> {
        let mut output = BackendOutput::new();

        for entry in entries {
            let sources = declaration_sources(entry)?;
            if sources.is_empty() {
                output.warn(format!(
                    "No TypeScript sources found for declaration entry `{}`",
                    entry.name
                ));
                continue;
            }

            let mut files = Vec::with_capacity(sources.len());
            for (source_path, relative) in sources {
                let source = tokio::fs::read_to_string(&source_path).await?;
                let dts = generate_declaration(&source, &source_path)?;
                files.push(OutputFile::new(to_slash(&declaration_path(&relative)), dts));
            }

            let written = write_output_files(&entry.out_dir, &files)?;
            for (path, file) in written.iter().zip(&files) {
                output.push_entry(
                    BuildEntry::entry(display_path(ctx.out_dir(), path))
                        .with_bytes(file.contents.len() as u64),
                );
            }
        }

        Ok(output)
    }
}

/// Source files for one entry paired with their output-relative path.
///
/// A file input keeps the entry name as its output stem; a directory input
/// contributes every TypeScript file beneath it.
fn declaration_sources(entry: &Entry) -> Result<Vec<(PathBuf, PathBuf)>> {
    if entry.input.is_dir() {
        let files = list_recursively(&entry.input)?;
        return Ok(files
            .into_iter()
            .filter(|file| is_typescript(file))
            .filter_map(|file| {
                let relative = file.strip_prefix(&entry.input).ok()?.to_path_buf();
                Some((file, relative))
            })
            .collect());
    }

    if !entry.input.exists() {
        return Err(Error::Backend {
            backend: BuilderKind::Declaration,
            message: format!("input `{}` does not exist", entry.input.display()),
        });
    }
    if !is_typescript(&entry.input) {
        return Ok(Vec::new());
    }

    let ext = entry
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("ts");
    let relative = PathBuf::from(format!("{}.{ext}", entry.name.trim_end_matches('/')));
    Ok(vec![(entry.input.clone(), relative)])
}

/// `path` relative to the package `outDir`, or absolute when it lives
/// elsewhere.
pub(crate) fn display_path(out_dir: &Path, path: &Path) -> String {
    relative_to(out_dir, path).unwrap_or_else(|| path.display().to_string())
}
