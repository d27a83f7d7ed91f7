//! End-to-end runs against real processes
//!
//! Subjects are shell scripts "compiled" by a fake compiler that copies the
//! entry source to the binary path, so these tests only run on Unix.

#![cfg(unix)]

mod common;

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use fixture_harness::harness::reporter::SubjectState;
use fixture_harness::{Driver, FixtureFilter, HarnessConfig, Registry, SubjectSpec};

use common::{CollectingReporter, fake_compiler, fake_dot, listing, script};

/// Scratch layout: `root/` holds sources and fixtures, `work/` is the
/// subjects' working directory.
struct Workspace {
    root: tempfile::TempDir,
    work: tempfile::TempDir,
    tools: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
            work: tempfile::tempdir().unwrap(),
            tools: tempfile::tempdir().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.root.path()
    }

    fn work(&self) -> &Path {
        self.work.path()
    }

    fn config(&self) -> HarnessConfig {
        HarnessConfig::rooted_at(self.root())
            .with_working_dir(self.work())
            .with_compiler(fake_compiler(self.tools.path()))
            .with_render_tool(self.tools.path().join("no-dot-installed"))
    }

    fn source(&self, rel: &str, body: &str) {
        script(&self.root().join(rel), body);
    }

    fn fixture(&self, rel: &str, content: &str) {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).unwrap()
    }
}

fn echo_subject(name: &str, dir: &str) -> SubjectSpec {
    SubjectSpec::new(
        name,
        format!("{name}/main.sh"),
        name,
        format!("{name}/output/{name}"),
        dir,
        FixtureFilter::Suffix(".c".to_string()),
    )
}

fn tree_subject() -> SubjectSpec {
    SubjectSpec::new(
        "ll",
        "ll/main.sh",
        "ll",
        "ll/output/ll",
        "dataset/parser",
        FixtureFilter::Contains("ll_".to_string()),
    )
    .with_side_artifact("tree.dot")
}

const ECHO_BODY: &str = r#"echo "tokens of $(basename "$1")"
cat "$1""#;

const TREE_BODY: &str = r#"if grep -q tree "$1"; then
    echo 'digraph { root -> leaf }' > tree.dot
fi
echo "parsed $(basename "$1")""#;

#[test]
fn captures_stdout_next_to_each_fixture() {
    let ws = Workspace::new();
    ws.source("lexical/main.sh", ECHO_BODY);
    ws.fixture("dataset/lexical/a.c", "int a;\n");
    ws.fixture("dataset/lexical/b.c", "int b;\n");
    ws.fixture("dataset/lexical/readme.md", "not a fixture\n");

    let registry = Registry::new(vec![echo_subject("lexical", "dataset/lexical")]).unwrap();
    let config = ws.config();
    let mut reporter = CollectingReporter::default();
    let summary = Driver::new(&config).run(&registry, &mut reporter);

    assert_eq!(ws.read("dataset/lexical/a.c.out"), "tokens of a.c\nint a;\n");
    assert_eq!(ws.read("dataset/lexical/b.c.out"), "tokens of b.c\nint b;\n");
    assert_eq!(
        listing(&ws.root().join("dataset/lexical")),
        ["a.c", "a.c.out", "b.c", "b.c.out", "readme.md"]
    );

    let tally = summary.get("lexical").unwrap();
    assert_eq!(tally.state, SubjectState::Built);
    assert_eq!((tally.fixtures, tally.recorded), (2, 2));
    assert_eq!(reporter.count("executed"), 2);
}

#[test]
fn stderr_is_appended_as_labeled_section() {
    let ws = Workspace::new();
    ws.source("lexical/main.sh", "echo token\necho 'unknown char' >&2\nexit 2");
    ws.fixture("dataset/lexical/a.c", "@");

    let registry = Registry::new(vec![echo_subject("lexical", "dataset/lexical")]).unwrap();
    let config = ws.config();
    let mut reporter = CollectingReporter::default();
    Driver::new(&config).run(&registry, &mut reporter);

    assert_eq!(ws.read("dataset/lexical/a.c.out"), "token\n\nSTDERR:\nunknown char\n");
    assert!(reporter.contains("executed a.c 2"));
}

#[test]
fn side_artifact_is_relocated_and_rendered() {
    let ws = Workspace::new();
    ws.source("ll/main.sh", TREE_BODY);
    ws.fixture("dataset/parser/ll_x.txt", "tree please\n");

    let registry = Registry::new(vec![tree_subject()]).unwrap();
    let config = ws.config().with_render_tool(fake_dot(ws.tools.path()));
    let mut reporter = CollectingReporter::default();
    let summary = Driver::new(&config).run(&registry, &mut reporter);

    assert_eq!(ws.read("dataset/parser/ll_x.txt.dot"), "digraph { root -> leaf }\n");
    assert!(ws.root().join("dataset/parser/ll_x.txt.png").is_file());
    assert!(!ws.work().join("tree.dot").exists());

    let tally = summary.get("ll").unwrap();
    assert_eq!((tally.side_artifacts, tally.rendered), (1, 1));
}

#[test]
fn missing_render_tool_is_not_an_error() {
    let ws = Workspace::new();
    ws.source("ll/main.sh", TREE_BODY);
    ws.fixture("dataset/parser/ll_x.txt", "tree\n");

    let registry = Registry::new(vec![tree_subject()]).unwrap();
    let config = ws.config();
    let mut reporter = CollectingReporter::default();
    let summary = Driver::new(&config).run(&registry, &mut reporter);

    assert!(ws.root().join("dataset/parser/ll_x.txt.dot").is_file());
    assert!(!ws.root().join("dataset/parser/ll_x.txt.png").exists());
    assert!(reporter.contains("render ll_x.txt ToolAbsent"));
    assert!(!reporter.contains("error "));
    assert_eq!(summary.get("ll").unwrap().rendered, 0);
}

#[test]
fn stale_side_artifact_is_never_attributed() {
    let ws = Workspace::new();
    ws.source("ll/main.sh", TREE_BODY);
    ws.fixture("dataset/parser/ll_1.txt", "tree\n");
    ws.fixture("dataset/parser/ll_2.txt", "flat\n");
    // Left over from some earlier run
    fs::write(ws.work().join("tree.dot"), "digraph { stale }").unwrap();

    let registry = Registry::new(vec![tree_subject()]).unwrap();
    let config = ws.config();
    let mut reporter = CollectingReporter::default();
    Driver::new(&config).run(&registry, &mut reporter);

    // Whatever the enumeration order, only the fixture that draws gets a graph
    assert_eq!(ws.read("dataset/parser/ll_1.txt.dot"), "digraph { root -> leaf }\n");
    assert!(!ws.root().join("dataset/parser/ll_2.txt.dot").exists());
    assert!(!ws.work().join("tree.dot").exists());
}

#[test]
fn failed_build_records_nothing() {
    let ws = Workspace::new();
    ws.source("lexical/main.sh", "# BROKEN\necho never");
    ws.fixture("dataset/lexical/a.c", "int a;\n");

    let registry = Registry::new(vec![echo_subject("lexical", "dataset/lexical")]).unwrap();
    let config = ws.config();
    let mut reporter = CollectingReporter::default();
    let summary = Driver::new(&config).run(&registry, &mut reporter);

    assert_eq!(summary.get("lexical").unwrap().state, SubjectState::BuildFailed);
    assert_eq!(listing(&ws.root().join("dataset/lexical")), ["a.c"]);
    assert!(reporter.contains("error: expected declaration"));
    assert_eq!(reporter.count("executed"), 0);
}

#[test]
fn missing_fixture_directory_is_reported_and_skipped() {
    let ws = Workspace::new();
    ws.source("semantic/main.sh", ECHO_BODY);

    let registry = Registry::new(vec![echo_subject("semantic", "dataset/semantic")]).unwrap();
    let config = ws.config();
    let mut reporter = CollectingReporter::default();
    let summary = Driver::new(&config).run(&registry, &mut reporter);

    assert_eq!(summary.get("semantic").unwrap().state, SubjectState::FixturesMissing);
    assert!(reporter.contains("dataset/semantic does not exist"));
}

#[test]
fn timeout_is_recorded_and_run_moves_on() {
    let ws = Workspace::new();
    ws.source("slow/main.sh", "echo started\nexec sleep 30");
    ws.fixture("dataset/slow/a.c", "");
    ws.fixture("dataset/slow/b.c", "");

    let registry = Registry::new(vec![echo_subject("slow", "dataset/slow")]).unwrap();
    let config = ws.config().with_timeout(Duration::from_millis(300));
    let mut reporter = CollectingReporter::default();

    let start = Instant::now();
    let summary = Driver::new(&config).run(&registry, &mut reporter);
    assert!(start.elapsed() < Duration::from_secs(15));

    let tally = summary.get("slow").unwrap();
    assert_eq!((tally.timeouts, tally.recorded), (2, 2));
    let capture = ws.read("dataset/slow/a.c.out");
    assert!(capture.starts_with("started\n"));
    assert!(capture.contains("HARNESS:\ntimed out after 0.3 seconds"));
}

#[test]
fn subjects_are_isolated_from_each_other() {
    let ws = Workspace::new();
    ws.source("broken/main.sh", "# BROKEN");
    ws.source("lexical/main.sh", ECHO_BODY);
    ws.fixture("dataset/lexical/a.c", "int a;\n");

    let registry = Registry::new(vec![
        echo_subject("broken", "dataset/lexical"),
        echo_subject("missing", "dataset/nowhere"),
        echo_subject("lexical", "dataset/lexical"),
    ])
    .unwrap();
    ws.source("missing/main.sh", ECHO_BODY);

    let config = ws.config();
    let mut reporter = CollectingReporter::default();
    let summary = Driver::new(&config).run(&registry, &mut reporter);

    let states: Vec<_> = summary.subjects.iter().map(|t| t.state).collect();
    assert_eq!(
        states,
        [SubjectState::BuildFailed, SubjectState::FixturesMissing, SubjectState::Built]
    );
    assert_eq!(ws.read("dataset/lexical/a.c.out"), "tokens of a.c\nint a;\n");
}

#[test]
fn rerun_is_idempotent() {
    let ws = Workspace::new();
    ws.source("ll/main.sh", TREE_BODY);
    ws.fixture("dataset/parser/ll_1.txt", "tree\n");
    ws.fixture("dataset/parser/ll_2.txt", "flat\n");

    let registry = Registry::new(vec![tree_subject()]).unwrap();
    let config = ws.config();

    let first = Driver::new(&config).run(&registry, &mut CollectingReporter::default());
    let captures_1 = (ws.read("dataset/parser/ll_1.txt.out"), ws.read("dataset/parser/ll_2.txt.out"));
    let listing_1 = listing(&ws.root().join("dataset/parser"));

    let second = Driver::new(&config).run(&registry, &mut CollectingReporter::default());
    let captures_2 = (ws.read("dataset/parser/ll_1.txt.out"), ws.read("dataset/parser/ll_2.txt.out"));

    assert_eq!(first.get("ll").unwrap().fixtures, 2);
    assert_eq!(second.get("ll").unwrap().fixtures, 2);
    assert_eq!(captures_1, captures_2);
    assert_eq!(listing_1, listing(&ws.root().join("dataset/parser")));
}

#[test]
fn graph_from_earlier_run_is_dropped_when_fixture_stops_drawing() {
    let ws = Workspace::new();
    ws.source("ll/main.sh", TREE_BODY);
    ws.fixture("dataset/parser/ll_2.txt", "tree\n");

    let registry = Registry::new(vec![tree_subject()]).unwrap();
    let config = ws.config().with_render_tool(fake_dot(ws.tools.path()));

    Driver::new(&config).run(&registry, &mut CollectingReporter::default());
    assert!(ws.root().join("dataset/parser/ll_2.txt.dot").is_file());
    assert!(ws.root().join("dataset/parser/ll_2.txt.png").is_file());

    ws.fixture("dataset/parser/ll_2.txt", "flat\n");
    let summary = Driver::new(&config).run(&registry, &mut CollectingReporter::default());

    assert_eq!(
        listing(&ws.root().join("dataset/parser")),
        ["ll_2.txt", "ll_2.txt.out"]
    );
    assert_eq!(ws.read("dataset/parser/ll_2.txt.out"), "parsed ll_2.txt\n");
    assert_eq!(summary.get("ll").unwrap().side_artifacts, 0);
}
