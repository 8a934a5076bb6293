//! Path helpers shared by the pipeline stages.

use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

static SCRIPT_EXTENSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(js|mjs|cjs|ts|mts|cts|json|jsx|tsx)$").expect("valid regex"));

/// Strips one trailing script or JSON extension.
pub fn remove_extension(path: &str) -> String {
    SCRIPT_EXTENSION_RE.replace(path, "").into_owned()
}

/// Logical entry name for `input`: relative to `root_dir`, without a
/// leading `./` or `src/`, without its extension.
pub fn derive_entry_name(input: &str, root_dir: &Path) -> String {
    let relative = if Path::new(input).is_absolute() {
        Path::new(input)
            .strip_prefix(root_dir)
            .map(to_slash)
            .unwrap_or_else(|_| input.to_string())
    } else {
        input.to_string()
    };

    let trimmed = relative.strip_prefix("./").unwrap_or(&relative);
    let trimmed = trimmed.strip_prefix("src/").unwrap_or(trimmed);
    remove_extension(trimmed)
}

/// Forward-slash rendering of a path, for names and manifest comparisons.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir | Component::Prefix(_) | Component::CurDir => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// `path` relative to `base`, with forward slashes; `None` when `path` is
/// not inside `base`.
pub fn relative_to(base: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(base).ok().map(to_slash)
}

/// All files under `dir`, sorted. A missing directory lists as empty.
pub fn list_recursively(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

pub fn is_declaration_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    name.ends_with(".d.ts") || name.ends_with(".d.mts") || name.ends_with(".d.cts")
}

pub fn is_typescript(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ts" | "mts" | "cts" | "tsx")
    ) && !is_declaration_file(path)
}

/// Declaration file name for a TypeScript source: `a.ts` -> `a.d.ts`,
/// `a.mts` -> `a.d.mts`, `a.cts` -> `a.d.cts`.
pub fn declaration_path(path: &Path) -> PathBuf {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some("mts") => "d.mts",
        Some("cts") => "d.cts",
        _ => "d.ts",
    };
    path.with_extension(ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn remove_extension_only_strips_known_extensions() {
        assert_eq!(remove_extension("utils/helper.ts"), "utils/helper");
        assert_eq!(remove_extension("data.json"), "data");
        assert_eq!(remove_extension("styles.css"), "styles.css");
        assert_eq!(remove_extension("index.d.ts"), "index.d");
    }

    #[test]
    fn entry_names_strip_src_and_extension() {
        let root = Path::new("/work/pkg");
        assert_eq!(derive_entry_name("src/utils/helper.ts", root), "utils/helper");
        assert_eq!(derive_entry_name("./src/index.mts", root), "index");
        assert_eq!(derive_entry_name("/work/pkg/src/cli.ts", root), "cli");
        assert_eq!(derive_entry_name("lib/mod.js", root), "lib/mod");
        assert_eq!(derive_entry_name("src/runtime/", root), "runtime/");
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let base = Path::new("/out");
        assert_eq!(relative_to(base, Path::new("/out/a/b.js")).as_deref(), Some("a/b.js"));
        assert_eq!(relative_to(base, Path::new("/elsewhere/b.js")), None);
    }

    #[test]
    fn lists_nested_files_sorted() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("b/c")).unwrap();
        std::fs::write(temp.path().join("b/c/z.js"), "").unwrap();
        std::fs::write(temp.path().join("a.js"), "").unwrap();

        let files = list_recursively(temp.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| relative_to(temp.path(), f).unwrap())
            .collect();
        assert_eq!(names, vec!["a.js", "b/c/z.js"]);
    }

    #[test]
    fn missing_directory_lists_empty() {
        let temp = TempDir::new().unwrap();
        assert!(list_recursively(&temp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn declaration_paths_follow_module_extension() {
        assert_eq!(declaration_path(Path::new("a/b.ts")), PathBuf::from("a/b.d.ts"));
        assert_eq!(declaration_path(Path::new("b.mts")), PathBuf::from("b.d.mts"));
        assert!(is_typescript(Path::new("x.tsx")));
        assert!(!is_typescript(Path::new("x.d.ts")));
    }
}
