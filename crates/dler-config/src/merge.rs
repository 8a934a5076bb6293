//! Layered option merging.
//!
//! Layers are merged from lowest to highest precedence:
//! defaults < preset < input config < manifest config < build config.
//!
//! Per key, a higher layer replaces the lower value, with two exceptions:
//! object values merge one level deep, and `externals` arrays concatenate
//! (deduplication happens later, when the externals set is built).
//! `null` never overrides anything.

use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};
use crate::options::BuildOptions;
use crate::validation::validate_options;

/// Keys whose array values concatenate instead of replacing.
const CONCAT_KEYS: &[&str] = &["externals"];

/// Merges `update` (higher precedence) into `target`.
pub fn merge_layer(target: &mut Map<String, Value>, update: &Map<String, Value>) {
    for (key, value) in update {
        if value.is_null() {
            continue;
        }
        match (target.get_mut(key), value) {
            (Some(Value::Array(existing)), Value::Array(incoming))
                if CONCAT_KEYS.contains(&key.as_str()) =>
            {
                let mut merged = incoming.clone();
                merged.append(existing);
                *existing = merged;
            }
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                for (inner_key, inner_value) in incoming {
                    if !inner_value.is_null() {
                        existing.insert(inner_key.clone(), inner_value.clone());
                    }
                }
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Merges layers ordered lowest to highest precedence. `null` layers count
/// as empty.
pub fn merge_values(layers: &[(&str, &Value)]) -> Result<Map<String, Value>> {
    let mut merged = Map::new();
    for (label, layer) in layers {
        match layer {
            Value::Null => {}
            Value::Object(map) => merge_layer(&mut merged, map),
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "{label} config must be an object, got {}",
                    kind_of(other)
                )));
            }
        }
    }
    Ok(merged)
}

/// Produces the fully resolved [`BuildOptions`].
///
/// Precedence, highest first: `build_config` (per invocation), the
/// manifest's embedded config, `input_config` (caller defaults), the
/// resolved preset, then `defaults`.
pub fn merge_options(
    build_config: &Value,
    manifest_config: &Value,
    input_config: &Value,
    preset: &Value,
    defaults: &Value,
) -> Result<BuildOptions> {
    let mut merged = merge_values(&[
        ("defaults", defaults),
        ("preset", preset),
        ("input", input_config),
        ("manifest", manifest_config),
        ("build", build_config),
    ])?;

    resolve_mode_conflict(&mut merged);

    let mut options: BuildOptions = serde_json::from_value(Value::Object(merged))
        .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

    validate_options(&options)?;
    options.resolve_paths()?;

    tracing::debug!(
        name = %options.name,
        out_dir = %options.out_dir.display(),
        entries = options.entries.len(),
        externals = options.externals.len(),
        "merged build options"
    );

    Ok(options)
}

/// Watch and stub are mutually exclusive; watch wins.
fn resolve_mode_conflict(merged: &mut Map<String, Value>) {
    let enabled = |key: &str| merged.get(key).and_then(Value::as_bool).unwrap_or(false);
    if enabled("transpileWatch") && enabled("transpileStub") {
        tracing::debug!("watch mode requested together with stub mode; disabling stub");
        merged.insert("transpileStub".to_string(), Value::Bool(false));
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
