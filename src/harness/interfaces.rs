//! Process boundary interfaces
//!
//! The harness talks to three external collaborators:
//! - the compiler that builds each subject
//! - the subject binaries themselves
//! - the graph renderer
//!
//! Each sits behind a trait so the driver can be exercised without spawning
//! anything. The default implementations spawn real processes.

use std::path::Path;

use crate::config::HarnessConfig;
use crate::registry::SubjectSpec;

use super::artifacts::{self, RenderOutcome};
use super::builder::{self, BuildResult};
use super::executor::{self, ExecutionOutcome};

// ============================================================================
// Toolchain Interface
// ============================================================================

/// Build a subject binary.
pub trait Toolchain {
    fn build(&self, spec: &SubjectSpec, config: &HarnessConfig) -> BuildResult;
}

// ============================================================================
// Subject Runner Interface
// ============================================================================

/// Run a built subject against one fixture.
///
/// Implementations must not fail: problems are reported inside the outcome.
pub trait SubjectRunner {
    fn execute(&self, binary: &Path, fixture: &Path, config: &HarnessConfig) -> ExecutionOutcome;
}

// ============================================================================
// Graph Renderer Interface
// ============================================================================

/// Rasterize a relocated graph description.
pub trait GraphRenderer {
    fn render(&self, dot: &Path, png: &Path, config: &HarnessConfig) -> RenderOutcome;
}

// ============================================================================
// Default Implementations
// ============================================================================

/// Invokes `config.compiler`.
pub struct ProcessToolchain;

impl Toolchain for ProcessToolchain {
    fn build(&self, spec: &SubjectSpec, config: &HarnessConfig) -> BuildResult {
        builder::build(spec, config)
    }
}

/// Spawns the subject in `config.working_dir` with `config.timeout`.
pub struct ProcessRunner;

impl SubjectRunner for ProcessRunner {
    fn execute(&self, binary: &Path, fixture: &Path, config: &HarnessConfig) -> ExecutionOutcome {
        executor::execute(binary, fixture, &config.working_dir, config.timeout)
    }
}

/// Invokes `config.render_tool`.
pub struct ProcessRenderer;

impl GraphRenderer for ProcessRenderer {
    fn render(&self, dot: &Path, png: &Path, config: &HarnessConfig) -> RenderOutcome {
        artifacts::render(&config.render_tool, dot, png)
    }
}
