//! Verbatim copy for `copy` entries.

use async_trait::async_trait;
use dler_config::BuilderKind;

use super::declaration::display_path;
use super::mirror::dir_label;
use super::{Backend, BackendOutput};
use crate::context::{BuildContext, BuildEntry, Entry};
use crate::output::{OutputFile, write_output_files};
use crate::paths::{list_recursively, to_slash};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct CopyBackend;

#[async_trait]
impl Backend for CopyBackend {
    fn kind(&self) -> BuilderKind {
        BuilderKind::Copy
    }

    async fn build(&self, ctx: &BuildContext, entries: &[Entry]) -> Result<BackendOutput> {
        let mut output = BackendOutput::new();

        for entry in entries {
            let mut files = Vec::new();
            if entry.input.is_dir() {
                for path in list_recursively(&entry.input)? {
                    let Ok(relative) = path.strip_prefix(&entry.input) else {
                        continue;
                    };
                    let contents = tokio::fs::read(&path).await?;
                    files.push(OutputFile::new(to_slash(relative), contents));
                }
            } else if entry.input.is_file() {
                let file_name = entry
                    .input
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| entry.name.clone());
                let contents = tokio::fs::read(&entry.input).await?;
                files.push(OutputFile::new(file_name, contents));
            } else {
                return Err(Error::Backend {
                    backend: BuilderKind::Copy,
                    message: format!("input `{}` does not exist", entry.input.display()),
                });
            }

            let written = write_output_files(&entry.out_dir, &files)?;
            let chunks = written
                .iter()
                .map(|path| display_path(ctx.out_dir(), path))
                .collect();
            output.push_entry(
                BuildEntry::entry(dir_label(ctx.out_dir(), &entry.out_dir)).with_chunks(chunks),
            );
        }

        Ok(output)
    }
}
