//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use fixture_harness::harness::artifacts::RenderOutcome;
use fixture_harness::harness::builder::BuildResult;
use fixture_harness::harness::executor::ExecutionOutcome;
use fixture_harness::harness::reporter::{RunReporter, RunSummary, SubjectTally};
use fixture_harness::{HarnessError, SubjectSpec};

/// Reporter that keeps every event as a line of text.
#[derive(Default)]
pub struct CollectingReporter {
    pub events: Vec<String>,
}

impl CollectingReporter {
    pub fn contains(&self, needle: &str) -> bool {
        self.events.iter().any(|e| e.contains(needle))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events.iter().filter(|e| e.starts_with(prefix)).count()
    }
}

fn name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

impl RunReporter for CollectingReporter {
    fn on_build_start(&mut self, subject: &SubjectSpec) {
        self.events.push(format!("build {}", subject.name));
    }

    fn on_build_complete(&mut self, subject: &SubjectSpec, result: &BuildResult) {
        self.events
            .push(format!("built {} success={} {}", subject.name, result.success, result.diagnostics.trim()));
    }

    fn on_subject_skipped(&mut self, subject: &SubjectSpec, error: &HarnessError) {
        self.events.push(format!("skipped {}: {}", subject.name, error));
    }

    fn on_fixture_start(&mut self, fixture: &Path) {
        self.events.push(format!("fixture {}", name(fixture)));
    }

    fn on_execution(&mut self, fixture: &Path, outcome: &ExecutionOutcome) {
        self.events.push(format!("executed {} {}", name(fixture), outcome.status));
    }

    fn on_side_artifact(&mut self, fixture: &Path, dot: &Path) {
        self.events.push(format!("dot {} -> {}", name(fixture), name(dot)));
    }

    fn on_render(&mut self, fixture: &Path, outcome: &RenderOutcome) {
        self.events.push(format!("render {} {:?}", name(fixture), outcome));
    }

    fn on_fixture_error(&mut self, fixture: &Path, error: &HarnessError) {
        self.events.push(format!("error {}: {}", name(fixture), error));
    }

    fn on_subject_complete(&mut self, tally: &SubjectTally) {
        self.events.push(format!("done {}", tally));
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        self.events.push(format!("run complete {}", summary.subjects.len()));
    }
}

/// Sorted file names in `dir`.
pub fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Write an executable `/bin/sh` script.
#[cfg(unix)]
pub fn script(path: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_path_buf()
}

/// A "compiler" that installs the entry source (itself a shell script) as
/// the binary, or fails when the source contains `BROKEN`.
///
/// Invoked as `<cc> <entry> -I <include> -o <binary>`.
#[cfg(unix)]
pub fn fake_compiler(dir: &Path) -> PathBuf {
    script(
        &dir.join("tools/cc"),
        r#"entry="$1"
out="$5"
if grep -q BROKEN "$entry"; then
    echo "$entry:1:1: error: expected declaration" >&2
    exit 1
fi
cp "$entry" "$out" && chmod +x "$out""#,
    )
}

/// A "dot" that copies its input to the raster path.
///
/// Invoked as `<dot> -Tpng <in> -o <out>`.
#[cfg(unix)]
pub fn fake_dot(dir: &Path) -> PathBuf {
    script(&dir.join("tools/dot"), r#"cp "$2" "$4""#)
}
