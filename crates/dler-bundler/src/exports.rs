//! File names referenced by a manifest's `exports` map.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Esm,
    Cjs,
}

/// One file referenced from `exports`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub file: String,
    pub kind: ModuleKind,
}

/// Walks a conditional exports value and returns every referenced file.
///
/// `.json` subpaths are skipped. Array fallbacks are flattened.
pub fn extract_export_filenames(exports: &Value) -> Vec<OutputDescriptor> {
    let mut out = Vec::new();
    collect(exports, &mut Vec::new(), &mut out);
    out
}

fn collect<'a>(value: &'a Value, conditions: &mut Vec<&'a str>, out: &mut Vec<OutputDescriptor>) {
    match value {
        Value::String(file) => out.push(OutputDescriptor {
            kind: infer_export_type(file, conditions),
            file: file.clone(),
        }),
        Value::Array(items) => {
            for item in items {
                collect(item, conditions, out);
            }
        }
        Value::Object(map) => {
            for (key, nested) in map {
                if key.ends_with(".json") {
                    continue;
                }
                conditions.push(key);
                collect(nested, conditions, out);
                conditions.pop();
            }
        }
        _ => {}
    }
}

/// Module type of an exported file.
///
/// The extension decides first (`.d.ts`/`.mjs` are ESM, `.cjs` is CJS).
/// Otherwise the nearest enclosing `import` or `require` condition decides,
/// defaulting to ESM.
pub fn infer_export_type(file: &str, conditions: &[&str]) -> ModuleKind {
    if file.ends_with(".d.ts") || file.ends_with(".mjs") {
        return ModuleKind::Esm;
    }
    if file.ends_with(".cjs") {
        return ModuleKind::Cjs;
    }

    conditions
        .iter()
        .rev()
        .find_map(|condition| match *condition {
            "import" => Some(ModuleKind::Esm),
            "require" => Some(ModuleKind::Cjs),
            _ => None,
        })
        .unwrap_or(ModuleKind::Esm)
}
