//! Build presets.
//!
//! A preset is a partial configuration merged just above the defaults. It
//! can be the built-in `auto` preset, a file relative to the package root,
//! an inline object, or a factory closure supplied by an embedding caller.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};
use crate::manifest::PackageManifest;

pub const AUTO_PRESET: &str = "auto";

/// Produces a preset config on demand.
pub type PresetFactory = Arc<dyn Fn() -> Result<Value> + Send + Sync>;

#[derive(Clone)]
pub enum Preset {
    /// Infer entries from the manifest when none are configured.
    Auto,
    /// JSON or TOML file, relative to the package root.
    Path(String),
    Inline(Value),
    Factory(PresetFactory),
}

impl fmt::Debug for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("Auto"),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Inline(value) => f.debug_tuple("Inline").field(value).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

impl Preset {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) if name == AUTO_PRESET => Some(Self::Auto),
            Value::String(path) if !path.is_empty() => Some(Self::Path(path.clone())),
            Value::Object(_) => Some(Self::Inline(value.clone())),
            _ => None,
        }
    }
}

/// Preset config plus whether entry inference should run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPreset {
    pub config: Value,
    pub infer_entries: bool,
}

/// Picks the preset: build config, then `pkg.dler`, then `pkg.build`, then
/// the input config, falling back to `auto`.
pub fn select_preset(build_config: &Value, pkg: &PackageManifest, input_config: &Value) -> Preset {
    let candidates = [
        Some(build_config),
        pkg.dler.as_ref(),
        pkg.build.as_ref(),
        Some(input_config),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(|layer| layer.get("preset"))
        .find_map(Preset::from_value)
        .unwrap_or(Preset::Auto)
}

pub fn resolve_preset(preset: &Preset, root_dir: &Path) -> Result<ResolvedPreset> {
    let (config, infer_entries) = match preset {
        Preset::Auto => (Value::Object(Map::new()), true),
        Preset::Path(path) => (load_preset_file(&root_dir.join(path))?, false),
        Preset::Inline(value) => (value.clone(), false),
        Preset::Factory(factory) => (factory()?, false),
    };

    if !matches!(config, Value::Object(_)) {
        return Err(ConfigError::InvalidValue(format!(
            "preset {preset:?} did not produce an object"
        )));
    }

    tracing::debug!(?preset, "resolved preset");
    Ok(ResolvedPreset {
        config: strip_preset_key(config),
        infer_entries,
    })
}

/// Presets do not chain; a `preset` key inside a preset is ignored.
fn strip_preset_key(mut config: Value) -> Value {
    if let Value::Object(map) = &mut config {
        map.remove("preset");
    }
    config
}

fn load_preset_file(path: &Path) -> Result<Value> {
    let path = locate(path).ok_or_else(|| ConfigError::PresetNotFound(path.to_path_buf()))?;
    let content = std::fs::read_to_string(&path)?;
    let load_error = |message: String| ConfigError::PresetLoad {
        path: path.clone(),
        message,
    };

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| load_error(e.to_string())),
        Some("toml") => toml::from_str::<Value>(&content).map_err(|e| load_error(e.to_string())),
        other => Err(ConfigError::UnsupportedFormat(format!(
            "{} (expected .json or .toml, got {})",
            path.display(),
            other.unwrap_or("no extension")
        ))),
    }
}

/// Tries the path as given, then with `.json` and `.toml` appended.
fn locate(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    ["json", "toml"].iter().find_map(|ext| {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);
        candidate.is_file().then_some(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn selection_prefers_build_config() {
        let pkg = PackageManifest {
            dler: Some(json!({ "preset": "./from-dler.json" })),
            ..Default::default()
        };
        let preset = select_preset(&json!({ "preset": "./cli.json" }), &pkg, &json!({}));
        assert!(matches!(preset, Preset::Path(p) if p == "./cli.json"));

        let preset = select_preset(&json!({}), &pkg, &json!({ "preset": "./input.json" }));
        assert!(matches!(preset, Preset::Path(p) if p == "./from-dler.json"));
    }

    #[test]
    fn selection_falls_back_to_auto() {
        let preset = select_preset(&json!({}), &PackageManifest::default(), &Value::Null);
        assert!(matches!(preset, Preset::Auto));
    }

    #[test]
    fn auto_preset_requests_inference() {
        let resolved = resolve_preset(&Preset::Auto, Path::new("/")).unwrap();
        assert!(resolved.infer_entries);
        assert_eq!(resolved.config, json!({}));
    }

    #[test]
    fn loads_json_and_toml_presets() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("base.json"), r#"{ "clean": true }"#).unwrap();
        std::fs::write(temp.path().join("lib.toml"), "outDir = \"lib\"\n").unwrap();

        let json = resolve_preset(&Preset::Path("./base".into()), temp.path()).unwrap();
        assert_eq!(json.config, json!({ "clean": true }));
        assert!(!json.infer_entries);

        let toml = resolve_preset(&Preset::Path("lib.toml".into()), temp.path()).unwrap();
        assert_eq!(toml.config["outDir"], "lib");
    }

    #[test]
    fn missing_preset_is_fatal() {
        let temp = TempDir::new().unwrap();
        let err = resolve_preset(&Preset::Path("./nope".into()), temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::PresetNotFound(_)));
    }

    #[test]
    fn malformed_preset_is_fatal() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("bad.json"), "{").unwrap();
        let err = resolve_preset(&Preset::Path("bad.json".into()), temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::PresetLoad { .. }));
    }

    #[test]
    fn factory_is_invoked() {
        let factory: PresetFactory = Arc::new(|| Ok(json!({ "parallel": true, "preset": "x" })));
        let resolved = resolve_preset(&Preset::Factory(factory), Path::new("/")).unwrap();
        assert_eq!(resolved.config, json!({ "parallel": true }));
    }

    #[test]
    fn factory_must_return_object() {
        let factory: PresetFactory = Arc::new(|| Ok(json!(42)));
        assert!(resolve_preset(&Preset::Factory(factory), Path::new("/")).is_err());
    }
}
