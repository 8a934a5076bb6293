//! File and environment config discovery for CLI use.
//!
//! The discovered config becomes the `input` layer of the merge: it sits
//! above presets and below both the manifest and per-invocation settings.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Toml},
};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

pub const CONFIG_FILES: &[&str] = &["dler.toml", "dler.config.toml", "dler.config.json"];
pub const ENV_PREFIX: &str = "DLER_";

/// Finds and loads dler config for one package root.
///
/// # Example
///
/// ```no_run
/// use dler_config::ConfigDiscovery;
///
/// let input = ConfigDiscovery::new(".").load().unwrap();
/// assert!(input.is_object());
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
    use_env: bool,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            use_env: true,
        }
    }

    /// Skip `DLER_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// First config file present in the root, in [`CONFIG_FILES`] order.
    pub fn find(&self) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| self.root.join(name))
            .find(|path| path.is_file())
    }

    /// Loads the config file (if any) overlaid with `DLER_*` variables.
    ///
    /// Environment keys are snake case; `__` separates nested keys, so
    /// `DLER_BUNDLER__INLINE_DEPENDENCIES=true` sets
    /// `bundler.inlineDependencies`.
    pub fn load(&self) -> Result<Value> {
        let mut figment = Figment::new();

        if let Some(path) = self.find() {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => figment.merge(Json::file(&path)),
                _ => figment.merge(Toml::file(&path)),
            };
        }

        if self.use_env {
            figment = figment.merge(
                Env::prefixed(ENV_PREFIX)
                    .split("__")
                    .map(|key| camel_case_path(key.as_str()).into()),
            );
        }

        let value: Value = figment
            .extract()
            .map_err(|e| ConfigError::Discovery(e.to_string()))?;

        match value {
            Value::Object(_) => Ok(value),
            Value::Null => Ok(Value::Object(Map::new())),
            other => Err(ConfigError::Discovery(format!(
                "config must be a table, got {other}"
            ))),
        }
    }
}

/// Loads the input config for `root`.
pub fn discover(root: impl AsRef<Path>) -> Result<Value> {
    ConfigDiscovery::new(root).load()
}

/// `bundler.inline_dependencies` -> `bundler.inlineDependencies`.
fn camel_case_path(key: &str) -> String {
    key.split('.')
        .map(camel_case)
        .collect::<Vec<_>>()
        .join(".")
}

fn camel_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut upper = false;
    for ch in segment.chars() {
        if ch == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}
