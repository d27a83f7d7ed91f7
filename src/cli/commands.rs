//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs;

use crate::config::HarnessConfig;
use crate::harness::{ConsoleReporter, Driver, selector};
use crate::registry::Registry;

use super::{CliError, CliResult, ExitCode, RunArgs, SelectionArgs};

/// Load the registry named on the command line (or the reference one) and
/// narrow it to `--only` subjects.
pub fn load_registry(selection: &SelectionArgs) -> CliResult<Registry> {
    let registry = match &selection.registry {
        Some(path) => Registry::load(path)?,
        None => Registry::reference(),
    };
    Ok(registry.retain_named(&selection.only)?)
}

/// Assemble the harness configuration from defaults and flags.
pub fn build_config(selection: &SelectionArgs, args: &RunArgs) -> CliResult<HarnessConfig> {
    let mut config = HarnessConfig::from_current_dir()
        .map_err(|e| CliError::failure(format!("Error: cannot determine working directory: {}", e)))?;

    if let Some(root) = &selection.root {
        if !root.is_dir() {
            return Err(CliError::failure(format!(
                "Error: root '{}' is not a directory",
                root.display()
            )));
        }
        config = config.with_root(root);
    }
    if let Some(timeout) = args.timeout {
        config = config.with_timeout(timeout);
    }
    if let Some(compiler) = &args.compiler {
        config = config.with_compiler(compiler);
    }
    if let Some(tool) = &args.render_tool {
        config = config.with_render_tool(tool);
    }
    Ok(config)
}

/// Build and capture every subject.
///
/// Always succeeds once the registry is loaded: the harness records outcomes,
/// it does not grade them.
pub fn run_harness(registry: &Registry, selection: &SelectionArgs, args: &RunArgs) -> CliResult<ExitCode> {
    let config = build_config(selection, args)?;
    tracing::debug!(
        root = %config.root.display(),
        timeout = ?config.timeout,
        subjects = registry.len(),
        "starting run"
    );

    let mut reporter = ConsoleReporter::new(args.verbose, &config.render_tool);
    Driver::new(&config).run(registry, &mut reporter);
    Ok(ExitCode::SUCCESS)
}

/// Print one line per subject.
pub fn list_subjects(registry: &Registry) -> CliResult<ExitCode> {
    let width = registry.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for spec in registry {
        let side = spec
            .side_artifact
            .as_deref()
            .map(|name| format!("  side artifact: {}", name))
            .unwrap_or_default();
        println!(
            "{:<width$}  {}  {}{}",
            spec.name,
            spec.fixture_dir.display(),
            spec.filter,
            side,
            width = width
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Delete generated siblings of every selected subject's fixtures.
pub fn clean_artifacts(registry: &Registry, selection: &SelectionArgs) -> CliResult<ExitCode> {
    let config = build_config(selection, &RunArgs::default())?;
    let mut removed = 0usize;
    let mut failed = 0usize;

    for spec in registry {
        let dir = config.resolve(&spec.fixture_dir);
        let artifacts = match selector::generated_artifacts(&dir, &spec.filter) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                eprintln!("{}: {}", spec.name, e);
                failed += 1;
                continue;
            }
        };
        for path in artifacts {
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!("removed {}", path.display());
                    removed += 1;
                }
                Err(e) => {
                    eprintln!("Failed to remove {}: {}", path.display(), e);
                    failed += 1;
                }
            }
        }
    }

    println!("Removed {} generated file(s)", removed);
    if failed > 0 {
        Err(CliError::failure(format!("{} file(s) could not be removed", failed)))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::{FixtureFilter, SubjectSpec};

    #[test]
    fn test_clean_removes_only_owned_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("dataset/parser");
        fs::create_dir_all(&data).unwrap();
        for name in ["ll_1.txt", "ll_1.txt.out", "ll_1.txt.dot", "lr_1.txt", "lr_1.txt.out"] {
            fs::write(data.join(name), "x").unwrap();
        }

        let registry = Registry::new(vec![SubjectSpec::new(
            "ll",
            "ll.cpp",
            ".",
            "ll",
            "dataset/parser",
            FixtureFilter::Contains("ll_".to_string()),
        )])
        .unwrap();
        let selection = SelectionArgs {
            root: Some(root.path().to_path_buf()),
            ..SelectionArgs::default()
        };

        assert_eq!(clean_artifacts(&registry, &selection).unwrap(), ExitCode::SUCCESS);
        assert!(data.join("ll_1.txt").exists());
        assert!(!data.join("ll_1.txt.out").exists());
        assert!(!data.join("ll_1.txt.dot").exists());
        assert!(data.join("lr_1.txt.out").exists());
    }

    #[test]
    fn test_build_config_applies_flags() {
        let root = tempfile::tempdir().unwrap();
        let selection = SelectionArgs {
            root: Some(root.path().to_path_buf()),
            ..SelectionArgs::default()
        };
        let args = RunArgs {
            timeout: Some(std::time::Duration::from_secs(1)),
            compiler: Some("clang++".into()),
            ..RunArgs::default()
        };
        let config = build_config(&selection, &args).unwrap();
        assert_eq!(config.root.as_path(), root.path());
        assert_eq!(config.timeout, std::time::Duration::from_secs(1));
        assert_eq!(config.compiler, std::path::PathBuf::from("clang++"));
        assert_eq!(config.render_tool, std::path::PathBuf::from("dot"));
    }

    #[test]
    fn test_build_config_rejects_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let selection = SelectionArgs {
            root: Some(root.path().join("nope")),
            ..SelectionArgs::default()
        };
        assert!(build_config(&selection, &RunArgs::default()).is_err());
    }
}
