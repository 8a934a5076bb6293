//! `package.json` model.
//!
//! Only the fields the build pipeline reads are typed; everything else is
//! ignored on deserialization.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// Maximum allowed size for package.json files (10MB)
const MAX_MANIFEST_SIZE: u64 = 10 * 1024 * 1024;

pub const MANIFEST_FILE: &str = "package.json";

/// Parsed package manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub peer_dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: IndexMap<String, String>,
    #[serde(default)]
    pub optional_dependencies: IndexMap<String, String>,
    /// Subpath imports (`#internal/*`).
    pub imports: Option<Map<String, Value>>,
    /// Conditional exports; a string, an array, or a (possibly nested) map.
    pub exports: Option<Value>,
    pub main: Option<String>,
    pub module: Option<String>,
    pub types: Option<String>,
    pub typings: Option<String>,
    pub bin: Option<BinField>,
    /// Embedded build config.
    pub dler: Option<Value>,
    /// Legacy location of the embedded build config.
    pub build: Option<Value>,
}

/// The `bin` field is either a single path or a command-to-path map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinField {
    Single(String),
    Map(IndexMap<String, String>),
}

impl BinField {
    pub fn paths(&self) -> Vec<&str> {
        match self {
            BinField::Single(path) => vec![path.as_str()],
            BinField::Map(map) => map.values().map(String::as_str).collect(),
        }
    }
}

impl PackageManifest {
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::parse(path, e))
    }

    /// Loads the manifest at `path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)?;
        if metadata.len() > MAX_MANIFEST_SIZE {
            return Err(ConfigError::InvalidValue(format!(
                "{} exceeds maximum size of {}MB",
                path.display(),
                MAX_MANIFEST_SIZE / 1024 / 1024
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Loads `package.json` from `root_dir`, or an empty manifest when the
    /// directory has none.
    pub fn load_or_default(root_dir: &Path) -> Result<Self> {
        let path = manifest_path(root_dir);
        match Self::from_path(&path) {
            Ok(pkg) => Ok(pkg),
            Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(err) => Err(err),
        }
    }

    /// Build config embedded in the manifest: `dler` wins over `build`.
    pub fn build_config(&self) -> Value {
        self.dler
            .as_ref()
            .or(self.build.as_ref())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }

    /// Last path segment of the package name (`@scope/pkg` -> `pkg`).
    pub fn short_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .and_then(|name| name.rsplit('/').next())
            .filter(|name| !name.is_empty())
    }

    pub fn dependency_names(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }

    pub fn peer_dependency_names(&self) -> Vec<String> {
        self.peer_dependencies.keys().cloned().collect()
    }

    pub fn dev_dependency_names(&self) -> Vec<String> {
        self.dev_dependencies.keys().cloned().collect()
    }
}

pub fn manifest_path(root_dir: &Path) -> PathBuf {
    root_dir.join(MANIFEST_FILE)
}

/// Package portion of a bare specifier: `@scope/name` for scoped packages,
/// the first segment otherwise.
pub fn package_name(specifier: &str) -> &str {
    if specifier.starts_with('@') {
        if let Some(first_slash) = specifier.find('/') {
            if let Some(second_slash) = specifier[first_slash + 1..].find('/') {
                return &specifier[..first_slash + 1 + second_slash];
            }
        }
        return specifier;
    }

    match specifier.find('/') {
        Some(idx) => &specifier[..idx],
        None => specifier,
    }
}
