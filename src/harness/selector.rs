//! Fixture selection
//!
//! Enumerates a subject's fixture directory lazily. Each call to [`select`]
//! reads the directory afresh; nothing is cached between calls. Order follows
//! the filesystem and is not relied upon anywhere.

use std::ffi::OsStr;
use std::fs::{self, ReadDir};
use std::path::{Path, PathBuf};

use crate::registry::FixtureFilter;

use super::error::{HarnessError, HarnessResult};

/// Suffixes of files the harness writes next to fixtures.
pub const GENERATED_SUFFIXES: [&str; 3] = [".out", ".dot", ".png"];

/// True if `file_name` is one of the harness's own outputs.
pub fn is_generated_artifact(file_name: impl AsRef<OsStr>) -> bool {
    generated_bytes(file_name.as_ref().as_encoded_bytes())
}

/// Whether a file name is a fixture under `filter`.
///
/// Names need not be valid UTF-8; matching is done on the raw bytes.
pub fn is_candidate(file_name: impl AsRef<OsStr>, filter: &FixtureFilter) -> bool {
    candidate_bytes(file_name.as_ref().as_encoded_bytes(), filter)
}

fn generated_bytes(name: &[u8]) -> bool {
    GENERATED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix.as_bytes()))
}

fn candidate_bytes(name: &[u8], filter: &FixtureFilter) -> bool {
    filter.matches_bytes(name) && !generated_bytes(name)
}

/// Lazy sequence of fixture paths.
///
/// Yields absolute paths to regular files (symlinks are followed, so a link
/// to a file counts and a link to a directory does not). Unreadable entries
/// are skipped with a warning.
#[derive(Debug)]
pub struct Fixtures {
    entries: ReadDir,
    filter: FixtureFilter,
}

impl Iterator for Fixtures {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            if !is_candidate(entry.file_name(), &self.filter) {
                continue;
            }

            let path = entry.path();
            if path.is_file() {
                return Some(path);
            }
        }
        None
    }
}

/// Enumerate candidate fixtures in `dir`.
///
/// `dir` should already be absolute (see `HarnessConfig::resolve`); the yielded
/// paths are `dir` joined with each file name.
pub fn select(dir: &Path, filter: &FixtureFilter) -> HarnessResult<Fixtures> {
    if !dir.is_dir() {
        return Err(HarnessError::FixtureDirectoryMissing(dir.to_path_buf()));
    }
    let entries = fs::read_dir(dir)?;
    Ok(Fixtures {
        entries,
        filter: filter.clone(),
    })
}

/// Generated artifacts in `dir` that belong to fixtures matching `filter`.
///
/// `a.c.out` belongs to `a.c`; it is listed when `a.c` would be selected by
/// `filter`, whether or not `a.c` still exists. Missing directories yield
/// nothing.
pub fn generated_artifacts(dir: &Path, filter: &FixtureFilter) -> HarnessResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.as_encoded_bytes();
        let owner = GENERATED_SUFFIXES
            .iter()
            .find_map(|suffix| name.strip_suffix(suffix.as_bytes()));
        let Some(owner) = owner else {
            continue;
        };
        if candidate_bytes(owner, filter) && entry.path().is_file() {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}
