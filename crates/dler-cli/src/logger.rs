//! Logging setup for the dler CLI.
//!
//! Library crates only emit `tracing` events; this module installs the
//! subscriber that prints them to stderr.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "dler_cli=debug,dler_bundler=debug,dler_config=debug";
const QUIET_FILTER: &str = "error";
const DEFAULT_FILTER: &str = "dler_cli=info,dler_bundler=info,dler_config=warn";

/// Filter directive for the global flags. `--verbose` wins over `--quiet`.
pub fn filter_directive(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        VERBOSE_FILTER
    } else if quiet {
        QUIET_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG`, when set and valid, replaces the flag-derived filter.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbose, quiet)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .compact();

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// `NO_COLOR` disables colors, `FORCE_COLOR` forces them, otherwise the
/// terminal decides.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}
