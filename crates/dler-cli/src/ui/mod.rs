//! Terminal output: colored build reports and status lines.

mod format;
mod messages;

use std::sync::atomic::{AtomicBool, Ordering};

pub use format::{print_report, render_report};
pub use messages::{error, info, success, warning};

static COLORS: AtomicBool = AtomicBool::new(false);

/// Enables colors unless `--no-color` was passed or the environment
/// disables them. Call once, early in `main`.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && crate::logger::should_use_colors();
    COLORS.store(enabled, Ordering::Relaxed);
    console::set_colors_enabled(enabled);
    console::set_colors_enabled_stderr(enabled);
}

pub fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}
