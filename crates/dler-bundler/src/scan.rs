//! Post-build output scan.

use crate::Result;
use crate::context::{BuildContext, BuildEntry};
use crate::paths::{list_recursively, relative_to};

/// Reconciles `ctx.build_entries` with what is on disk under `outDir`.
///
/// Every file without a matching record is added as a chunk, and every
/// record for an existing file gets its size filled in when a backend did
/// not report one.
pub async fn scan_outputs(ctx: &mut BuildContext) -> Result<()> {
    let out_dir = ctx.options.out_dir.clone();
    let files = list_recursively(&out_dir)?;
    let mut added = 0usize;

    for file in files {
        let Some(relative) = relative_to(&out_dir, &file) else {
            continue;
        };

        let index = match ctx.build_entries.iter().position(|e| e.path == relative) {
            Some(index) => index,
            None => {
                ctx.build_entries.push(BuildEntry::chunk(relative));
                added += 1;
                ctx.build_entries.len() - 1
            }
        };

        if ctx.build_entries[index].bytes.is_none() {
            let metadata = tokio::fs::metadata(&file).await?;
            ctx.build_entries[index].bytes = Some(metadata.len());
        }
    }

    tracing::debug!(package = %ctx.options.name, added, "scanned output directory");
    Ok(())
}
