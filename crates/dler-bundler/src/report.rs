//! Plain-text build report.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::context::BuildContext;
use crate::paths::{relative_to, to_slash};

/// Decimal byte size: `512 B`, `1.23 kB`, `45.6 MB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "kB", "MB", "GB", "TB"];

    if bytes < 1000 {
        return format!("{bytes} B");
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;
    while size >= 1000.0 && unit_idx < UNITS.len() - 1 {
        size /= 1000.0;
        unit_idx += 1;
    }

    let precision = if size < 10.0 {
        2
    } else if size < 100.0 {
        1
    } else {
        0
    };
    let formatted = format!("{size:.precision$}");
    let trimmed = if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.')
    } else {
        formatted.as_str()
    };
    format!("{trimmed} {}", UNITS[unit_idx])
}

/// `50ms`, `1.50s`, `1m 30s`.
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine {
    pub path: String,
    pub bytes: u64,
}

/// One non-chunk output with its chunk tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub path: String,
    pub total_bytes: u64,
    pub chunk_bytes: Option<u64>,
    pub exports: Vec<String>,
    pub chunks: Vec<ReportLine>,
    /// Bundled `node_modules` modules, largest first.
    pub modules: Vec<ReportLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub package: String,
    pub out_dir: String,
    pub entries: Vec<ReportEntry>,
    pub total_bytes: u64,
    #[serde(skip)]
    pub elapsed: Duration,
    pub warnings: Vec<String>,
}

impl BuildReport {
    pub fn from_context(ctx: &BuildContext, elapsed: Duration) -> Self {
        let root_dir = ctx.options.root_dir.as_path();
        let out_dir = relative_to(root_dir, ctx.out_dir())
            .unwrap_or_else(|| ctx.out_dir().display().to_string());
        let label = |path: &str| output_label(root_dir, &out_dir, path);
        let bytes_of = |path: &str| {
            ctx.build_entries
                .iter()
                .find(|e| e.path == path)
                .and_then(|e| e.bytes)
        };

        let entries = ctx
            .build_entries
            .iter()
            .filter(|entry| !entry.chunk)
            .map(|entry| {
                let chunk_paths = entry.chunks.as_deref().unwrap_or_default();
                let chunks: Vec<ReportLine> = chunk_paths
                    .iter()
                    .map(|chunk| ReportLine {
                        path: label(chunk),
                        bytes: bytes_of(chunk).unwrap_or(0),
                    })
                    .collect();

                let mut modules: Vec<ReportLine> = entry
                    .modules
                    .as_deref()
                    .unwrap_or_default()
                    .iter()
                    .filter(|module| module.id.contains("node_modules"))
                    .map(|module| ReportLine {
                        path: display_module(root_dir, &module.id),
                        bytes: module.bytes,
                    })
                    .collect();
                modules.sort_by(|a, b| b.bytes.cmp(&a.bytes));

                ReportEntry {
                    path: label(&entry.path),
                    total_bytes: entry.bytes.unwrap_or(0)
                        + chunks.iter().map(|chunk| chunk.bytes).sum::<u64>(),
                    chunk_bytes: entry.bytes,
                    exports: entry.exports.clone().unwrap_or_default(),
                    chunks,
                    modules,
                }
            })
            .collect();

        Self {
            package: ctx.options.name.clone(),
            out_dir,
            entries,
            total_bytes: ctx.build_entries.iter().filter_map(|e| e.bytes).sum(),
            elapsed,
            warnings: ctx.warnings.iter().cloned().collect(),
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// The warnings as one block, or `None` when there are none.
    pub fn warnings_block(&self) -> Option<String> {
        if self.warnings.is_empty() {
            return None;
        }
        let list: Vec<String> = self.warnings.iter().map(|w| format!("- {w}")).collect();
        Some(format!("Build is done with some warnings:\n\n{}", list.join("\n")))
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Build succeeded for {} ({})", self.package, self.out_dir)?;

        for entry in &self.entries {
            let mut details = Vec::new();
            if entry.total_bytes > 0 {
                details.push(format!("total size: {}", format_bytes(entry.total_bytes)));
            }
            if let Some(bytes) = entry.chunk_bytes.filter(|b| *b > 0) {
                details.push(format!("chunk size: {}", format_bytes(bytes)));
            }
            if !entry.exports.is_empty() {
                details.push(format!("exports: {}", entry.exports.join(", ")));
            }

            if details.is_empty() {
                writeln!(f, "  {}", entry.path)?;
            } else {
                writeln!(f, "  {} ({})", entry.path, details.join(", "))?;
            }
            for line in entry.chunks.iter().chain(&entry.modules) {
                if line.bytes > 0 {
                    writeln!(f, "  └─ {} ({})", line.path, format_bytes(line.bytes))?;
                } else {
                    writeln!(f, "  └─ {}", line.path)?;
                }
            }
        }

        writeln!(f, "Σ Total dist size (byte size): {}", format_bytes(self.total_bytes))?;
        write!(f, "Done in {}", format_duration(self.elapsed))?;

        if let Some(block) = self.warnings_block() {
            write!(f, "\n\n{block}")?;
        }
        Ok(())
    }
}

/// Output path as shown to the user: relative to the package root.
fn output_label(root_dir: &Path, out_dir: &str, path: &str) -> String {
    let path_ref = Path::new(path);
    if path_ref.is_absolute() {
        return relative_to(root_dir, path_ref).unwrap_or_else(|| path.to_string());
    }
    to_slash(&Path::new(out_dir).join(path_ref))
}

fn display_module(root_dir: &Path, id: &str) -> String {
    relative_to(root_dir, Path::new(id)).unwrap_or_else(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BuildEntry, ModuleSize};
    use dler_config::{BuildOptions, PackageManifest};

    #[test]
    fn bytes_use_decimal_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1000), "1 kB");
        assert_eq!(format_bytes(1234), "1.23 kB");
        assert_eq!(format_bytes(12_345), "12.3 kB");
        assert_eq!(format_bytes(123_456), "123 kB");
        assert_eq!(format_bytes(2_500_000), "2.5 MB");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
    }

    fn ctx() -> BuildContext {
        let options: BuildOptions = serde_json::from_value(serde_json::json!({
            "name": "foo", "rootDir": "/work/foo", "outDir": "/work/foo/dist"
        }))
        .unwrap();
        let mut ctx = BuildContext::new(options, PackageManifest::default());
        ctx.build_entries.push(BuildEntry {
            modules: Some(vec![
                ModuleSize { id: "/work/foo/src/index.ts".into(), bytes: 40 },
                ModuleSize { id: "/work/foo/node_modules/tiny/index.js".into(), bytes: 60 },
            ]),
            ..BuildEntry::entry("index.mjs")
                .with_bytes(100)
                .with_chunks(vec!["chunks/shared.mjs".into()])
                .with_exports(vec!["run".into(), "stop".into()])
        });
        ctx.build_entries.push(BuildEntry::chunk("chunks/shared.mjs").with_bytes(20));
        ctx
    }

    #[test]
    fn report_sums_chunk_sizes() {
        let report = BuildReport::from_context(&ctx(), Duration::from_millis(12));
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].path, "dist/index.mjs");
        assert_eq!(report.entries[0].total_bytes, 120);
        assert_eq!(report.entries[0].modules[0].path, "node_modules/tiny/index.js");
        assert_eq!(report.total_bytes, 120);
    }

    #[test]
    fn rendered_report() {
        let mut ctx = ctx();
        ctx.warn("Potential unused dependencies found: lodash");
        let text = BuildReport::from_context(&ctx, Duration::from_millis(12)).render();

        assert!(text.starts_with("Build succeeded for foo (dist)"));
        assert!(text.contains("  dist/index.mjs (total size: 120 B, chunk size: 100 B, exports: run, stop)"));
        assert!(text.contains("  └─ dist/chunks/shared.mjs (20 B)"));
        assert!(text.contains("  └─ node_modules/tiny/index.js (60 B)"));
        assert!(text.contains("Σ Total dist size (byte size): 120 B"));
        assert!(text.contains("Done in 12ms"));
        assert!(text.ends_with("- Potential unused dependencies found: lodash"));
    }
}
