//! Harness configuration
//!
//! Everything the harness needs besides the subject registry: which external
//! tools to call, how long a subject may run, and which directories relative
//! paths and side artifacts resolve against.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default compiler command used to build subjects.
pub const DEFAULT_COMPILER: &str = "g++";

/// Default graph rendering command.
pub const DEFAULT_RENDER_TOOL: &str = "dot";

/// Default wall-clock budget for a single subject invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Compiler invoked as `<compiler> <entry> -I <include> -o <binary>`
    pub compiler: PathBuf,
    /// Graph tool invoked as `<tool> -Tpng <dot> -o <png>`
    pub render_tool: PathBuf,
    /// Per-fixture execution budget
    pub timeout: Duration,
    /// Directory registry paths are relative to
    pub root: PathBuf,
    /// Working directory subjects run in; side artifacts appear here
    pub working_dir: PathBuf,
}

impl HarnessConfig {
    /// Reference configuration rooted at the process working directory.
    pub fn from_current_dir() -> io::Result<Self> {
        let cwd = std::env::current_dir()?;
        Ok(Self::rooted_at(cwd))
    }

    /// Reference configuration with both root and subject working directory at `dir`.
    pub fn rooted_at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            compiler: PathBuf::from(DEFAULT_COMPILER),
            render_tool: PathBuf::from(DEFAULT_RENDER_TOOL),
            timeout: DEFAULT_TIMEOUT,
            root: dir.clone(),
            working_dir: dir,
        }
    }

    pub fn with_compiler(mut self, compiler: impl Into<PathBuf>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn with_render_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.render_tool = tool.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Change the registry root. The subject working directory is left alone.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Resolve a registry-relative path to an absolute one.
    ///
    /// Absolute inputs are returned unchanged. The result is not canonicalized,
    /// so the path does not need to exist yet (binaries are created by the build).
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        std::path::absolute(&joined).unwrap_or(joined)
    }
}

/// Anchor a relative tool path such as `./tools/cc` to the process working
/// directory.
///
/// Subjects and the compiler run in other directories, so a relative path
/// with a separator would otherwise resolve against those. Bare names like
/// `g++` are left for `PATH` lookup.
pub fn resolve_tool(tool: &Path) -> PathBuf {
    if tool.is_absolute() || tool.components().count() < 2 {
        return tool.to_path_buf();
    }
    std::path::absolute(tool).unwrap_or_else(|_| tool.to_path_buf())
}
