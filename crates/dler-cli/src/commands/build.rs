//! `dler build`.

use std::path::{Path, PathBuf};

use dler_bundler::orchestrator::default_max_parallel;
use dler_bundler::{
    BuildRequest, ErrorPolicy, OrchestratorOptions, PackageResult, build_packages,
};
use dler_config::{Preset, discover};
use path_clean::PathClean;

use crate::cli::BuildArgs;
use crate::error::{CliError, Result};
use crate::ui;

/// Builds ROOT and every `--lib` package.
///
/// Each package gets its own discovered config (`dler.toml`,
/// `dler.config.json`, `DLER_*`) as the input layer, while the flags form
/// the shared build layer. Reports are printed in argument order.
///
/// Without `--keep-going` the first failing package aborts the run and its
/// error is returned. With it, every package is built and the command fails
/// afterwards if any package did.
pub async fn execute(args: BuildArgs, quiet: bool) -> Result<()> {
    let root = resolve_root(&args.root)?;
    let dirs = args.package_dirs(&root);
    for dir in &dirs {
        if !dir.is_dir() {
            return Err(CliError::PackageNotFound(dir.clone()));
        }
    }

    let requests = build_requests(&args, &dirs)?;
    let options = OrchestratorOptions {
        max_parallel: args
            .max_parallel
            .map(usize::from)
            .unwrap_or_else(default_max_parallel),
        policy: if args.keep_going {
            ErrorPolicy::CollectAll
        } else {
            ErrorPolicy::StopOnFirstError
        },
    };

    tracing::debug!(packages = dirs.len(), ?options, "starting build");
    let results = build_packages(requests, options).await?;
    report_results(&root, results, quiet)
}

fn resolve_root(root: &Path) -> Result<PathBuf> {
    let root = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };
    Ok(root.clean())
}

fn build_requests(args: &BuildArgs, dirs: &[PathBuf]) -> Result<Vec<BuildRequest>> {
    let build_config = args.build_config();
    let preset = args.preset.clone().map(Preset::Path);

    dirs.iter()
        .map(|dir| -> Result<BuildRequest> {
            let mut request = BuildRequest::new(dir)
                .with_build_config(build_config.clone())
                .with_input_config(discover(dir)?);
            if let Some(preset) = &preset {
                request = request.with_preset(preset.clone());
            }
            Ok(request)
        })
        .collect()
}

fn report_results(root: &Path, results: Vec<PackageResult>, quiet: bool) -> Result<()> {
    let total = results.len();
    let mut failed = 0;

    for PackageResult { root_dir, result } in results {
        match result {
            Ok(outcome) => {
                if !quiet {
                    ui::print_report(&outcome.report)?;
                }
            }
            Err(err) => {
                failed += 1;
                ui::error(&format!("{}: {err}", display_dir(root, &root_dir)));
                if let dler_bundler::Error::WarningsAsErrors { warnings, .. } = &err {
                    for warning in warnings {
                        ui::warning(warning);
                    }
                }
            }
        }
    }

    if failed > 0 {
        return Err(CliError::PackagesFailed { failed, total });
    }
    if total > 1 && !quiet {
        ui::success(&format!("Built {total} packages"));
    }
    Ok(())
}

fn display_dir(root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
        Ok(relative) => relative.display().to_string(),
        Err(_) => dir.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn display_dir_is_relative_to_root() {
        let root = Path::new("/repo");
        assert_eq!(display_dir(root, Path::new("/repo")), ".");
        assert_eq!(display_dir(root, Path::new("/repo/packages/a")), "packages/a");
        assert_eq!(display_dir(root, Path::new("/elsewhere")), "/elsewhere");
    }

    #[tokio::test]
    async fn missing_lib_is_reported_before_building() {
        let temp = TempDir::new().unwrap();
        let args = BuildArgs {
            root: temp.path().to_path_buf(),
            libs: vec![PathBuf::from("packages/missing")],
            ..Default::default()
        };
        let err = execute(args, true).await.unwrap_err();
        assert!(
            matches!(err, CliError::PackageNotFound(ref dir) if dir.ends_with("packages/missing"))
        );
    }

    #[test]
    fn requests_carry_flags_and_discovered_config() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("dler.toml"), "declaration = true\n").unwrap();
        let args = BuildArgs {
            root: temp.path().to_path_buf(),
            minify: true,
            preset: Some("presets/lib.json".into()),
            ..Default::default()
        };

        let requests = build_requests(&args, &[temp.path().to_path_buf()]).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].build_config, serde_json::json!({ "minify": true }));
        assert_eq!(requests[0].input_config["declaration"], serde_json::json!(true));
        assert!(matches!(&requests[0].preset, Some(Preset::Path(path)) if path == "presets/lib.json"));
    }
}
