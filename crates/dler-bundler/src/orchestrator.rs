//! Multi-package builds with bounded concurrency.

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::clean::CleanedDirs;
use crate::pipeline::{BuildOutcome, BuildRequest, build};
use crate::{Error, Result};

/// Upper bound on the default concurrency, whatever the CPU count.
pub const MAX_DEFAULT_PARALLEL: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Abort the remaining builds at the first failure.
    #[default]
    StopOnFirstError,
    /// Build every package and report each result.
    CollectAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    pub max_parallel: usize,
    pub policy: ErrorPolicy,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            policy: ErrorPolicy::default(),
        }
    }
}

/// `min(cpus, 8)`.
pub fn default_max_parallel() -> usize {
    num_cpus::get().clamp(1, MAX_DEFAULT_PARALLEL)
}

#[derive(Debug)]
pub struct PackageResult {
    pub root_dir: PathBuf,
    pub result: Result<BuildOutcome>,
}

/// Builds every request, at most `max_parallel` at a time.
///
/// All packages share one [`CleanedDirs`] registry. Results come back in
/// request order. Under [`ErrorPolicy::StopOnFirstError`] the first failure
/// aborts the outstanding builds and is returned as the error. A build task
/// that panics counts as that package's failure ([`Error::Join`]).
pub async fn build_packages(
    requests: Vec<BuildRequest>,
    options: OrchestratorOptions,
) -> Result<Vec<PackageResult>> {
    let total = requests.len();
    let semaphore = Arc::new(Semaphore::new(options.max_parallel.max(1)));
    let cleaned = CleanedDirs::new();
    let mut roots = Vec::with_capacity(total);
    let mut tasks = JoinSet::new();

    tracing::debug!(packages = total, max_parallel = options.max_parallel, "building packages");

    let mut indices = FxHashMap::default();
    for (index, request) in requests.into_iter().enumerate() {
        roots.push(request.root_dir.clone());
        let request = request.with_cleaned(cleaned.clone());
        let semaphore = Arc::clone(&semaphore);
        let handle = tasks.spawn(async move {
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => build(request).await,
                Err(err) => Err(Error::Join(err.to_string())),
            };
            (index, result)
        });
        indices.insert(handle.id(), index);
    }

    let mut results: Vec<Option<Result<BuildOutcome>>> = (0..total).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (index, result) = match joined {
            Ok(reported) => reported,
            Err(err) => match indices.get(&err.id()) {
                Some(&index) => (index, Err(Error::from(err))),
                None => return Err(err.into()),
            },
        };
        if let Err(err) = &result {
            tracing::warn!(root = %roots[index].display(), error = %err, "package build failed");
        }
        match result {
            Err(err) if options.policy == ErrorPolicy::StopOnFirstError => {
                tasks.abort_all();
                return Err(err);
            }
            result => results[index] = Some(result),
        }
    }

    Ok(roots
        .into_iter()
        .zip(results)
        .map(|(root_dir, result)| PackageResult {
            root_dir,
            result: result.unwrap_or_else(|| Err(Error::Join("build task did not report".into()))),
        })
        .collect())
}
