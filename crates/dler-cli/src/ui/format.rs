//! Build report rendering.

use console::Term;
use dler_bundler::{BuildReport, format_bytes, format_duration};
use owo_colors::OwoColorize;

use super::colors_enabled;

/// Prints `report` to stdout.
pub fn print_report(report: &BuildReport) -> std::io::Result<()> {
    Term::stdout().write_line(&render_report(report, colors_enabled()))
}

/// The report text. Without color this is exactly the report's `Display`
/// output.
pub fn render_report(report: &BuildReport, color: bool) -> String {
    if !color {
        return report.to_string();
    }

    let mut lines = vec![format!(
        "{} {} {}",
        "Build succeeded for".green(),
        report.package.bold(),
        format!("({})", report.out_dir).dimmed()
    )];

    for entry in &report.entries {
        let mut details = Vec::new();
        if entry.total_bytes > 0 {
            details.push(format!("total size: {}", format_bytes(entry.total_bytes).cyan()));
        }
        if let Some(bytes) = entry.chunk_bytes.filter(|bytes| *bytes > 0) {
            details.push(format!("chunk size: {}", format_bytes(bytes).cyan()));
        }
        if !entry.exports.is_empty() {
            details.push(format!("exports: {}", entry.exports.join(", ").dimmed()));
        }

        if details.is_empty() {
            lines.push(format!("  {}", entry.path.bold()));
        } else {
            lines.push(format!("  {} ({})", entry.path.bold(), details.join(", ")));
        }
        for line in entry.chunks.iter().chain(&entry.modules) {
            let size = if line.bytes > 0 {
                format!(" ({})", format_bytes(line.bytes))
            } else {
                String::new()
            };
            lines.push(format!("  {} {}{}", "└─".dimmed(), line.path.dimmed(), size.dimmed()));
        }
    }

    lines.push(format!(
        "{} {}",
        "Σ Total dist size (byte size):".cyan(),
        format_bytes(report.total_bytes).cyan().bold()
    ));
    lines.push(format!("Done in {}", format_duration(report.elapsed).green()));

    if let Some(block) = report.warnings_block() {
        lines.push(String::new());
        lines.push(block.yellow().to_string());
    }

    lines.join("\n")
}
