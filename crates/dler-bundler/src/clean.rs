//! Output directory cleaning.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::Entry;
use crate::{Error, Result};

/// Directories already cleaned in this process run.
///
/// Shared between concurrently building packages so overlapping output
/// directories are only removed once.
#[derive(Debug, Clone, Default)]
pub struct CleanedDirs {
    dirs: Arc<Mutex<Vec<PathBuf>>>,
}

impl CleanedDirs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `dir` unless it equals or lies inside a recorded directory.
    fn claim(&self, dir: &Path) -> bool {
        let mut dirs = self.dirs.lock();
        if dirs.iter().any(|cleaned| dir.starts_with(cleaned)) {
            return false;
        }
        dirs.push(dir.to_path_buf());
        true
    }

    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.dirs.lock().clone()
    }
}

/// Removes and recreates every entry output directory.
///
/// A directory is skipped when it is the root, an ancestor of the root, or
/// inside a directory cleaned earlier in this run. Returns the directories
/// that were cleaned.
pub async fn clean_outputs(
    root_dir: &Path,
    entries: &[Entry],
    cleaned: &CleanedDirs,
) -> Result<Vec<PathBuf>> {
    let candidates: BTreeSet<&Path> = entries.iter().map(|e| e.out_dir.as_path()).collect();
    let mut removed = Vec::new();

    for dir in candidates {
        if dir == root_dir || root_dir.starts_with(dir) {
            tracing::warn!(dir = %dir.display(), "refusing to clean a directory that contains the package root");
            continue;
        }
        if !cleaned.claim(dir) {
            tracing::debug!(dir = %dir.display(), "already cleaned in this run");
            continue;
        }

        tracing::info!(dir = %dir.display(), "cleaning output directory");
        remove_dir_if_exists(dir).await?;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| Error::Clean {
                path: dir.to_path_buf(),
                source,
            })?;
        removed.push(dir.to_path_buf());
    }

    Ok(removed)
}

/// Recursively removes `dir`. A missing directory is not an error; any
/// other failure is.
pub async fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::Clean {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dler_config::BuilderKind;
    use tempfile::TempDir;

    fn entry(out_dir: PathBuf) -> Entry {
        Entry {
            name: "index".into(),
            input: out_dir.join("src/index.ts"),
            out_dir,
            builder: BuilderKind::Bundle,
            declaration: false,
        }
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn cleaning_twice_leaves_empty_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("pkg");
        let dist = root.join("dist");
        std::fs::create_dir_all(dist.join("nested")).unwrap();
        std::fs::write(dist.join("nested/old.js"), "x").unwrap();
        let entries = vec![entry(dist.clone())];

        clean_outputs(&root, &entries, &CleanedDirs::new()).await.unwrap();
        assert_eq!(file_count(&dist), 0);

        std::fs::write(dist.join("again.js"), "x").unwrap();
        clean_outputs(&root, &entries, &CleanedDirs::new()).await.unwrap();
        assert_eq!(file_count(&dist), 0);
    }

    #[tokio::test]
    async fn missing_directory_is_created() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("pkg");
        let dist = root.join("dist");

        let removed = clean_outputs(&root, &[entry(dist.clone())], &CleanedDirs::new())
            .await
            .unwrap();
        assert_eq!(removed, vec![dist.clone()]);
        assert!(dist.is_dir());
    }

    #[tokio::test]
    async fn refuses_root_and_ancestors() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("pkg");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("package.json"), "{}").unwrap();

        let entries = vec![entry(root.clone()), entry(temp.path().to_path_buf())];
        let removed = clean_outputs(&root, &entries, &CleanedDirs::new())
            .await
            .unwrap();

        assert!(removed.is_empty());
        assert!(root.join("package.json").exists());
    }

    #[tokio::test]
    async fn nested_directories_are_cleaned_once() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("pkg");
        let dist = root.join("dist");
        let nested = dist.join("runtime");
        std::fs::create_dir_all(&nested).unwrap();

        let cleaned = CleanedDirs::new();
        let removed = clean_outputs(&root, &[entry(nested.clone()), entry(dist.clone())], &cleaned)
            .await
            .unwrap();

        assert_eq!(removed, vec![dist.clone()]);
        assert_eq!(cleaned.snapshot(), vec![dist.clone()]);

        let again = clean_outputs(&root, &[entry(dist)], &cleaned).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn removing_a_missing_directory_succeeds() {
        let temp = TempDir::new().unwrap();
        remove_dir_if_exists(&temp.path().join("never-created"))
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_directory_removal_errors_propagate() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        let err = remove_dir_if_exists(&file).await.unwrap_err();
        assert!(matches!(err, Error::Clean { .. }));
    }
}
