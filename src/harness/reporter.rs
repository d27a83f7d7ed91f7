//! Run narration
//!
//! ## RunReporter Trait
//!
//! The driver narrates progress through `RunReporter` so the console output
//! can be swapped out (tests collect events instead of printing).
//!
//! The run summary is a tally of what was captured. It is deliberately not a
//! pass/fail verdict: subject exit codes are recorded, never judged.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::registry::SubjectSpec;

use super::artifacts::RenderOutcome;
use super::builder::BuildResult;
use super::error::HarnessError;
use super::executor::{ExecutionOutcome, ExitStatus};

/// Separator printed between subjects.
pub const SEPARATOR_WIDTH: usize = 50;

/// Receives progress events from the driver.
pub trait RunReporter {
    fn on_build_start(&mut self, _subject: &SubjectSpec) {}

    fn on_build_complete(&mut self, subject: &SubjectSpec, result: &BuildResult);

    fn on_fixtures_start(&mut self, _subject: &SubjectSpec, _dir: &Path) {}

    /// The subject built but its fixtures could not be enumerated.
    fn on_subject_skipped(&mut self, subject: &SubjectSpec, error: &HarnessError);

    fn on_fixture_start(&mut self, fixture: &Path);

    fn on_execution(&mut self, fixture: &Path, outcome: &ExecutionOutcome);

    fn on_capture_saved(&mut self, _fixture: &Path, _capture: &Path) {}

    fn on_side_artifact(&mut self, _fixture: &Path, _dot: &Path) {}

    fn on_render(&mut self, fixture: &Path, outcome: &RenderOutcome);

    /// A per-fixture error that was contained at the fixture boundary.
    fn on_fixture_error(&mut self, fixture: &Path, error: &HarnessError);

    fn on_subject_complete(&mut self, _tally: &SubjectTally) {}

    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// What happened to a subject as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectState {
    Built,
    BuildFailed,
    FixturesMissing,
    /// The fixture directory exists but could not be listed
    FixturesUnreadable,
}

impl SubjectState {
    /// State of a subject whose fixtures could not be enumerated.
    pub fn skipped_by(error: &HarnessError) -> Self {
        match error {
            HarnessError::FixtureDirectoryMissing(_) => SubjectState::FixturesMissing,
            _ => SubjectState::FixturesUnreadable,
        }
    }
}

/// Per-subject counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectTally {
    pub name: String,
    pub state: SubjectState,
    pub fixtures: usize,
    pub recorded: usize,
    pub timeouts: usize,
    pub spawn_failures: usize,
    pub write_failures: usize,
    pub side_artifacts: usize,
    pub rendered: usize,
}

impl SubjectTally {
    pub fn new(name: impl Into<String>, state: SubjectState) -> Self {
        Self {
            name: name.into(),
            state,
            fixtures: 0,
            recorded: 0,
            timeouts: 0,
            spawn_failures: 0,
            write_failures: 0,
            side_artifacts: 0,
            rendered: 0,
        }
    }
}

impl fmt::Display for SubjectTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            SubjectState::BuildFailed => return write!(f, "{}: build failed", self.name),
            SubjectState::FixturesMissing => return write!(f, "{}: skipped (no fixture directory)", self.name),
            SubjectState::FixturesUnreadable => {
                return write!(f, "{}: skipped (fixture directory unreadable)", self.name);
            }
            SubjectState::Built => {}
        }

        write!(f, "{}: {}/{} recorded", self.name, self.recorded, self.fixtures)?;
        let extras = [
            (self.timeouts, "timed out"),
            (self.spawn_failures, "failed to start"),
            (self.write_failures, "not written"),
            (self.side_artifacts, "graphs"),
            (self.rendered, "rendered"),
        ];
        for (count, label) in extras {
            if count > 0 {
                write!(f, ", {} {}", count, label)?;
            }
        }
        Ok(())
    }
}

/// Tally of a whole run, in registry order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub subjects: Vec<SubjectTally>,
}

impl RunSummary {
    pub fn get(&self, name: &str) -> Option<&SubjectTally> {
        self.subjects.iter().find(|t| t.name == name)
    }

    pub fn recorded(&self) -> usize {
        self.subjects.iter().map(|t| t.recorded).sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tally in &self.subjects {
            writeln!(f, "{}", tally)?;
        }
        Ok(())
    }
}

/// Default console narration
pub struct ConsoleReporter {
    pub verbose: bool,
    /// Named when the tool is missing
    pub render_tool: PathBuf,
}

impl ConsoleReporter {
    pub fn new(verbose: bool, render_tool: impl Into<PathBuf>) -> Self {
        Self {
            verbose,
            render_tool: render_tool.into(),
        }
    }

    fn tool_absent_message(&self) -> String {
        format!(
            "    ('{}' command not found, skipping PNG generation)",
            self.render_tool.display()
        )
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl RunReporter for ConsoleReporter {
    fn on_build_start(&mut self, subject: &SubjectSpec) {
        println!("Compiling {}...", subject.name);
    }

    fn on_build_complete(&mut self, subject: &SubjectSpec, result: &BuildResult) {
        if result.success {
            println!("Successfully compiled {}", subject.name);
            if self.verbose && !result.diagnostics.is_empty() {
                println!("{}", result.diagnostics.trim_end());
            }
        } else {
            println!("\x1b[31mError compiling {}:\x1b[0m", subject.name);
            println!("{}", result.diagnostics.trim_end());
        }
    }

    fn on_fixtures_start(&mut self, subject: &SubjectSpec, dir: &Path) {
        println!("Running tests for {}...", subject.name);
        if self.verbose {
            println!("  fixtures: {} ({})", dir.display(), subject.filter);
        }
    }

    fn on_subject_skipped(&mut self, _subject: &SubjectSpec, error: &HarnessError) {
        println!("\x1b[33m{}\x1b[0m", error);
    }

    fn on_fixture_start(&mut self, fixture: &Path) {
        println!("  Testing {}...", display_name(fixture));
    }

    fn on_execution(&mut self, _fixture: &Path, outcome: &ExecutionOutcome) {
        match &outcome.status {
            ExitStatus::Exited(code) => println!("    Return Code: {}", code),
            ExitStatus::Signaled => println!("    Return Code: (terminated by signal)"),
            ExitStatus::TimedOut(_) | ExitStatus::SpawnFailed(_) => {
                println!("    \x1b[31mError running test: {}\x1b[0m", outcome.status);
                if !outcome.stdout.is_empty() {
                    println!("    STDOUT: {}", outcome.stdout.trim_end());
                }
                if !outcome.stderr.is_empty() {
                    println!("    STDERR: {}", outcome.stderr.trim_end());
                }
            }
        }
    }

    fn on_capture_saved(&mut self, _fixture: &Path, capture: &Path) {
        println!("    Output saved to {}", capture.display());
    }

    fn on_side_artifact(&mut self, _fixture: &Path, dot: &Path) {
        println!("    DOT file generated: {}", dot.display());
    }

    fn on_render(&mut self, _fixture: &Path, outcome: &RenderOutcome) {
        match outcome {
            RenderOutcome::Rendered(png) => println!("    PNG image generated: {}", png.display()),
            RenderOutcome::ToolAbsent => println!("{}", self.tool_absent_message()),
            RenderOutcome::Failed(message) => println!("    \x1b[31mError converting DOT to PNG: {}\x1b[0m", message),
        }
    }

    fn on_fixture_error(&mut self, _fixture: &Path, error: &HarnessError) {
        println!("    \x1b[31m{}\x1b[0m", error);
    }

    fn on_subject_complete(&mut self, _tally: &SubjectTally) {
        println!("{}", "-".repeat(SEPARATOR_WIDTH));
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        if summary.subjects.is_empty() {
            return;
        }
        println!("\x1b[1m{}\x1b[0m", summary.to_string().trim_end());
    }
}
