//! Error taxonomy for the harness
//!
//! None of these ever aborts a whole run. Per-fixture errors stop at the
//! fixture boundary and per-subject errors stop at the subject boundary; the
//! driver reports them through the `RunReporter` and moves on.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to compile {subject}:\n{diagnostics}")]
    BuildFailure { subject: String, diagnostics: String },

    #[error("fixture directory {} does not exist", .0.display())]
    FixtureDirectoryMissing(PathBuf),

    #[error("command timed out after {} seconds", .0.as_secs_f64())]
    ExecutionTimeout(Duration),

    #[error("failed to run {}: {message}", binary.display())]
    ExecutionSpawnFailure { binary: PathBuf, message: String },

    #[error("failed to write {}: {source}", path.display())]
    ArtifactWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render {}: {message}", dot.display())]
    RenderFailure { dot: PathBuf, message: String },

    #[error("side artifact {}: {source}", path.display())]
    SideArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid registry: {0}")]
    Registry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
