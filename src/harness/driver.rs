//! Run driver
//!
//! Walks the registry in order: build a subject, and only if that succeeded,
//! select its fixtures and execute then record each one. Subjects and fixtures
//! are isolated from each other; every error is reported and contained.

use std::path::Path;

use crate::config::HarnessConfig;
use crate::registry::{Registry, SubjectSpec};

use super::artifacts::{self, RenderOutcome, SideArtifactSlot};
use super::error::HarnessError;
use super::executor::ExitStatus;
use super::interfaces::{
    GraphRenderer, ProcessRenderer, ProcessRunner, ProcessToolchain, SubjectRunner, Toolchain,
};
use super::reporter::{RunReporter, RunSummary, SubjectState, SubjectTally};
use super::selector;

/// Sequential build-and-capture driver.
pub struct Driver<'a> {
    config: &'a HarnessConfig,
    toolchain: &'a dyn Toolchain,
    runner: &'a dyn SubjectRunner,
    renderer: &'a dyn GraphRenderer,
}

impl<'a> Driver<'a> {
    /// Driver that spawns the real compiler, subjects and renderer.
    pub fn new(config: &'a HarnessConfig) -> Self {
        Self {
            config,
            toolchain: &ProcessToolchain,
            runner: &ProcessRunner,
            renderer: &ProcessRenderer,
        }
    }

    pub fn with_toolchain(mut self, toolchain: &'a dyn Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    pub fn with_runner(mut self, runner: &'a dyn SubjectRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_renderer(mut self, renderer: &'a dyn GraphRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Process every subject in registry order.
    pub fn run(&self, registry: &Registry, reporter: &mut dyn RunReporter) -> RunSummary {
        let mut summary = RunSummary::default();
        for spec in registry {
            let tally = self.run_subject(spec, reporter);
            reporter.on_subject_complete(&tally);
            summary.subjects.push(tally);
        }
        reporter.on_run_complete(&summary);
        summary
    }

    /// Build one subject and, on success, capture all of its fixtures.
    #[tracing::instrument(skip_all, fields(subject = %spec.name))]
    pub fn run_subject(&self, spec: &SubjectSpec, reporter: &mut dyn RunReporter) -> SubjectTally {
        reporter.on_build_start(spec);
        let build = self.toolchain.build(spec, self.config);
        reporter.on_build_complete(spec, &build);
        if let Some(error) = build.error(&spec.name) {
            tracing::debug!(%error, "skipping fixtures");
            return SubjectTally::new(&spec.name, SubjectState::BuildFailed);
        }

        let fixture_dir = self.config.resolve(&spec.fixture_dir);
        let fixtures = match selector::select(&fixture_dir, &spec.filter) {
            Ok(fixtures) => fixtures,
            Err(e) => {
                tracing::debug!(error = %e, "skipping subject");
                reporter.on_subject_skipped(spec, &e);
                return SubjectTally::new(&spec.name, SubjectState::skipped_by(&e));
            }
        };

        reporter.on_fixtures_start(spec, &fixture_dir);

        let binary = self.config.resolve(&spec.binary_output);
        let slot = spec
            .side_artifact
            .as_deref()
            .map(|name| SideArtifactSlot::new(&self.config.working_dir, name));

        let mut tally = SubjectTally::new(&spec.name, SubjectState::Built);
        for fixture in fixtures {
            tally.fixtures += 1;
            self.run_fixture(&binary, &fixture, slot.as_ref(), &mut tally, reporter);
        }
        tally
    }

    /// Execute and record one fixture. Never fails; problems go to the reporter.
    #[tracing::instrument(skip_all, fields(fixture = %fixture.display()))]
    fn run_fixture(
        &self,
        binary: &Path,
        fixture: &Path,
        slot: Option<&SideArtifactSlot>,
        tally: &mut SubjectTally,
        reporter: &mut dyn RunReporter,
    ) {
        reporter.on_fixture_start(fixture);

        // A slot we could not clear might hold a previous fixture's graph, so
        // nothing found there afterwards can be attributed to this fixture.
        let slot = match slot.map(|s| s.prepare(fixture).map(|()| s)) {
            Some(Ok(slot)) => Some(slot),
            Some(Err(e)) => {
                reporter.on_fixture_error(fixture, &e);
                None
            }
            None => None,
        };

        let outcome = self.runner.execute(binary, fixture, self.config);
        match &outcome.status {
            ExitStatus::TimedOut(_) => tally.timeouts += 1,
            ExitStatus::SpawnFailed(_) => tally.spawn_failures += 1,
            ExitStatus::Exited(_) | ExitStatus::Signaled => {}
        }
        if let Some(error) = outcome.error(binary) {
            tracing::debug!(%error, "subject did not run to completion");
        }
        reporter.on_execution(fixture, &outcome);

        match artifacts::write_capture(fixture, &outcome) {
            Ok(capture) => {
                tally.recorded += 1;
                reporter.on_capture_saved(fixture, &capture);
            }
            Err(e) => {
                tally.write_failures += 1;
                reporter.on_fixture_error(fixture, &e);
            }
        }

        let Some(slot) = slot else {
            return;
        };
        let dot = match slot.relocate(fixture) {
            Ok(Some(dot)) => dot,
            Ok(None) => return,
            Err(e) => {
                reporter.on_fixture_error(fixture, &e);
                return;
            }
        };
        tally.side_artifacts += 1;
        reporter.on_side_artifact(fixture, &dot);

        let png = artifacts::sibling(fixture, ".png");
        let rendered = self.renderer.render(&dot, &png, self.config);
        match &rendered {
            RenderOutcome::Rendered(_) => tally.rendered += 1,
            RenderOutcome::ToolAbsent => tracing::debug!("render tool not installed"),
            RenderOutcome::Failed(message) => {
                let error = HarnessError::RenderFailure {
                    dot: dot.clone(),
                    message: message.clone(),
                };
                tracing::debug!(%error);
            }
        }
        reporter.on_render(fixture, &rendered);
    }
}
