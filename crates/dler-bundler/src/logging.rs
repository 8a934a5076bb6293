//! Subscriber setup for hosts that embed dler-bundler without a logger of
//! their own (`logging` feature). The `dler` binary installs its own.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Verbosity of the bundler crates. Manifest and config loading
/// (`dler_config`) stays at `warn` until `Debug`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Silent,
    Error,
    Warn,
    /// Package completion and cleaning.
    #[default]
    Info,
    /// Per-stage pipeline progress.
    Debug,
    Trace,
}

impl LogLevel {
    const ALL: [LogLevel; 6] = [
        LogLevel::Silent,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// `EnvFilter` directive for this level.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "dler_bundler=warn,dler_config=warn",
            LogLevel::Info => "dler_bundler=info,dler_config=warn",
            LogLevel::Debug => "dler_bundler=debug,dler_config=debug",
            LogLevel::Trace => "dler_bundler=trace,dler_config=trace",
        }
    }

    fn name(self) -> &'static str {
        match self {
            LogLevel::Silent => "silent",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        match lowered.as_str() {
            "off" => Ok(LogLevel::Silent),
            "warning" => Ok(LogLevel::Warn),
            name => Self::ALL
                .into_iter()
                .find(|level| level.name() == name)
                .ok_or_else(|| format!("unknown log level `{s}`")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Installs a global subscriber writing compact lines to stderr.
///
/// `RUST_LOG`, when set and valid, replaces the level's directive. If a
/// subscriber is already installed this does nothing.
///
/// ```rust,no_run
/// use dler_bundler::logging::{LogLevel, init_logging};
///
/// init_logging(LogLevel::Debug);
/// ```
pub fn init_logging(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .compact(),
        )
        .try_init();
}

/// [`init_logging`] at the default level, so only `RUST_LOG` changes it.
pub fn init_logging_from_env() {
    init_logging(LogLevel::default());
}
