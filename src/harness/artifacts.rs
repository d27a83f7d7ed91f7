//! Artifact management
//!
//! Every processed fixture gets a `<fixture>.out` capture. Subjects that draw
//! a graph write it under one fixed file name in their working directory; that
//! file is the only state shared between fixtures, so it is cleared before
//! each run and moved to `<fixture>.dot` right after. The fixture's own
//! `.dot`/`.png` from an earlier run are cleared at the same time, so a graph
//! next to a fixture was always drawn by the latest run.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::resolve_tool;

use super::error::{HarnessError, HarnessResult};
use super::executor::{ExecutionOutcome, ExitStatus};

/// Label separating stderr from stdout in a capture file.
pub const STDERR_LABEL: &str = "STDERR:";

/// Label for notes the harness adds itself (timeouts, spawn failures).
pub const HARNESS_LABEL: &str = "HARNESS:";

/// `<fixture><suffix>`, e.g. `a.c` + `.out` = `a.c.out`.
pub fn sibling(fixture: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(fixture.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Render the text of a capture file.
///
/// Stdout verbatim, then a labeled stderr section if stderr is non-empty, then
/// a labeled harness note for timeouts and spawn failures.
pub fn format_capture(outcome: &ExecutionOutcome) -> String {
    let mut text = outcome.stdout.clone();
    if !outcome.stderr.is_empty() {
        text.push('\n');
        text.push_str(STDERR_LABEL);
        text.push('\n');
        text.push_str(&outcome.stderr);
    }
    match &outcome.status {
        ExitStatus::TimedOut(_) | ExitStatus::SpawnFailed(_) => {
            text.push('\n');
            text.push_str(HARNESS_LABEL);
            text.push('\n');
            text.push_str(&outcome.status.to_string());
            text.push('\n');
        }
        ExitStatus::Exited(_) | ExitStatus::Signaled => {}
    }
    text
}

/// Write `<fixture>.out` and return its path.
pub fn write_capture(fixture: &Path, outcome: &ExecutionOutcome) -> HarnessResult<PathBuf> {
    let path = sibling(fixture, ".out");
    fs::write(&path, format_capture(outcome)).map_err(|source| HarnessError::ArtifactWriteFailure {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// The fixed-name file a subject writes into its working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideArtifactSlot {
    path: PathBuf,
}

impl SideArtifactSlot {
    pub fn new(working_dir: &Path, file_name: &str) -> Self {
        Self {
            path: working_dir.join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove whatever a previous fixture left behind.
    pub fn clear(&self) -> HarnessResult<()> {
        remove_if_present(&self.path).map_err(|source| HarnessError::SideArtifact {
            path: self.path.clone(),
            source,
        })
    }

    /// Clear the slot and the graph files an earlier run left next to `fixture`.
    pub fn prepare(&self, fixture: &Path) -> HarnessResult<()> {
        self.clear()?;
        for suffix in [".dot", ".png"] {
            let stale = sibling(fixture, suffix);
            remove_if_present(&stale).map_err(|source| HarnessError::SideArtifact { path: stale, source })?;
        }
        Ok(())
    }

    /// Move a freshly written artifact to `<fixture>.dot`.
    ///
    /// Returns `Ok(None)` when the subject produced nothing. An existing
    /// target is replaced.
    pub fn relocate(&self, fixture: &Path) -> HarnessResult<Option<PathBuf>> {
        if !self.path.is_file() {
            return Ok(None);
        }

        let target = sibling(fixture, ".dot");
        let side_error = |source| HarnessError::SideArtifact {
            path: self.path.clone(),
            source,
        };

        remove_if_present(&target).map_err(side_error)?;

        if let Err(e) = fs::rename(&self.path, &target) {
            // Working directory and fixtures may live on different filesystems
            tracing::debug!("rename failed ({}), falling back to copy", e);
            fs::copy(&self.path, &target).map_err(side_error)?;
            fs::remove_file(&self.path).map_err(side_error)?;
        }

        Ok(Some(target))
    }
}

/// Result of a render attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered(PathBuf),
    /// The render tool is not installed; not an error
    ToolAbsent,
    Failed(String),
}

/// Render `dot` to `<fixture>.png` via `<tool> -Tpng <dot> -o <png>`.
///
/// Any existing `png` is removed first; only a raster written by this call
/// counts as rendered.
pub fn render(tool: &Path, dot: &Path, png: &Path) -> RenderOutcome {
    if let Err(e) = remove_if_present(png) {
        return RenderOutcome::Failed(format!("cannot replace {}: {}", png.display(), e));
    }

    let tool = resolve_tool(tool);
    let output = Command::new(&tool)
        .arg("-Tpng")
        .arg(dot)
        .arg("-o")
        .arg(png)
        .stdin(Stdio::null())
        .output();

    match output {
        Err(e) if e.kind() == io::ErrorKind::NotFound => RenderOutcome::ToolAbsent,
        Err(e) => RenderOutcome::Failed(format!("failed to invoke '{}': {}", tool.display(), e)),
        Ok(output) if !output.status.success() => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            if detail.is_empty() {
                RenderOutcome::Failed(format!("'{}' exited with {}", tool.display(), output.status))
            } else {
                RenderOutcome::Failed(detail.to_string())
            }
        }
        Ok(_) if !png.is_file() => {
            RenderOutcome::Failed(format!("'{}' reported success but wrote no {}", tool.display(), png.display()))
        }
        Ok(_) => RenderOutcome::Rendered(png.to_path_buf()),
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
