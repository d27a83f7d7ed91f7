//! Subject registry
//!
//! A registry is an ordered, immutable list of [`SubjectSpec`]s. It is built
//! once (from the built-in reference set or a TOML file) and handed to the
//! driver by reference.
//!
//! ## Registry files
//!
//! ```toml
//! [[subject]]
//! name = "ll"
//! entry = "LLparser/LLparserMain.cpp"
//! include = "LLparser"
//! binary = "LLparser/output/LLparser"
//! fixtures = "dataset/parser"
//! select = { contains = "ll_" }
//! side_artifact = "ll_tree.dot"
//! ```

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::harness::error::{HarnessError, HarnessResult};

/// Inclusion predicate for a subject's fixture directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureFilter {
    /// File name ends with the given suffix (e.g. `.c`)
    Suffix(String),
    /// File name contains the given marker (e.g. `ll_`)
    Contains(String),
    /// Every file in the directory
    Any,
}

impl FixtureFilter {
    pub fn matches(&self, file_name: &str) -> bool {
        self.matches_bytes(file_name.as_bytes())
    }

    /// Match on raw file name bytes, so names that are not valid UTF-8 are
    /// still considered.
    pub fn matches_bytes(&self, file_name: &[u8]) -> bool {
        match self {
            FixtureFilter::Suffix(suffix) => file_name.ends_with(suffix.as_bytes()),
            FixtureFilter::Contains(marker) => {
                let marker = marker.as_bytes();
                marker.is_empty() || file_name.windows(marker.len()).any(|w| w == marker)
            }
            FixtureFilter::Any => true,
        }
    }
}

impl fmt::Display for FixtureFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixtureFilter::Suffix(s) => write!(f, "*{}", s),
            FixtureFilter::Contains(s) => write!(f, "*{}*", s),
            FixtureFilter::Any => write!(f, "*"),
        }
    }
}

/// One independently built and exercised program.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectSpec {
    pub name: String,
    /// Entry translation unit handed to the compiler
    #[serde(rename = "entry")]
    pub entry_source: PathBuf,
    /// Passed to the compiler as `-I <include_root>`
    #[serde(rename = "include")]
    pub include_root: PathBuf,
    /// Where the compiler writes the binary
    #[serde(rename = "binary")]
    pub binary_output: PathBuf,
    #[serde(rename = "fixtures")]
    pub fixture_dir: PathBuf,
    #[serde(rename = "select")]
    pub filter: FixtureFilter,
    /// Fixed file name the subject leaves in its working directory, if any
    #[serde(default)]
    pub side_artifact: Option<String>,
}

impl SubjectSpec {
    pub fn new(
        name: impl Into<String>,
        entry_source: impl Into<PathBuf>,
        include_root: impl Into<PathBuf>,
        binary_output: impl Into<PathBuf>,
        fixture_dir: impl Into<PathBuf>,
        filter: FixtureFilter,
    ) -> Self {
        Self {
            name: name.into(),
            entry_source: entry_source.into(),
            include_root: include_root.into(),
            binary_output: binary_output.into(),
            fixture_dir: fixture_dir.into(),
            filter,
            side_artifact: None,
        }
    }

    pub fn with_side_artifact(mut self, file_name: impl Into<String>) -> Self {
        self.side_artifact = Some(file_name.into());
        self
    }
}

/// Ordered set of subjects with unique names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    subjects: Vec<SubjectSpec>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default, rename = "subject")]
    subjects: Vec<SubjectSpec>,
}

impl Registry {
    /// Build a registry, rejecting empty lists, duplicate names and side
    /// artifacts that are not bare file names.
    pub fn new(subjects: Vec<SubjectSpec>) -> HarnessResult<Self> {
        if subjects.is_empty() {
            return Err(HarnessError::Registry("no subjects defined".to_string()));
        }

        let mut seen = HashSet::new();
        for subject in &subjects {
            if subject.name.trim().is_empty() {
                return Err(HarnessError::Registry("subject with empty name".to_string()));
            }
            if !seen.insert(subject.name.as_str()) {
                return Err(HarnessError::Registry(format!("duplicate subject '{}'", subject.name)));
            }
            if let Some(side) = &subject.side_artifact {
                let bare = Path::new(side).file_name().is_some_and(|n| n == side.as_str());
                if !bare {
                    return Err(HarnessError::Registry(format!(
                        "side artifact '{}' of subject '{}' must be a plain file name",
                        side, subject.name
                    )));
                }
            }
        }

        Ok(Self { subjects })
    }

    /// The four reference subjects: a lexer, two parsers that draw their
    /// parse trees, and a semantic analyzer.
    pub fn reference() -> Self {
        let exe = std::env::consts::EXE_SUFFIX;
        let subjects = vec![
            SubjectSpec::new(
                "lexical",
                "LexicalAnalysis/main.cpp",
                "LexicalAnalysis",
                format!("LexicalAnalysis/output/main{exe}"),
                "dataset/lexical",
                FixtureFilter::Suffix(".c".to_string()),
            ),
            SubjectSpec::new(
                "ll",
                "LLparser/LLparserMain.cpp",
                "LLparser",
                format!("LLparser/output/LLparser{exe}"),
                "dataset/parser",
                FixtureFilter::Contains("ll_".to_string()),
            )
            .with_side_artifact("ll_tree.dot"),
            SubjectSpec::new(
                "lr",
                "LRparser/LRparserMain.cpp",
                "LRparser",
                format!("LRparser/output/LRparser{exe}"),
                "dataset/parser",
                FixtureFilter::Contains("lr_".to_string()),
            )
            .with_side_artifact("lr_tree.dot"),
            SubjectSpec::new(
                "semantic",
                "SemanticAnalysis/TranslationSchema.cpp",
                "SemanticAnalysis",
                format!("SemanticAnalysis/main{exe}"),
                "dataset/semantic",
                FixtureFilter::Suffix(".txt".to_string()),
            ),
        ];
        Self { subjects }
    }

    pub fn from_toml_str(source: &str) -> HarnessResult<Self> {
        let file: RegistryFile = toml::from_str(source).map_err(|e| HarnessError::Registry(e.to_string()))?;
        Self::new(file.subjects)
    }

    pub fn load(path: &Path) -> HarnessResult<Self> {
        let source = fs::read_to_string(path)
            .map_err(|e| HarnessError::Registry(format!("cannot read '{}': {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Keep only the named subjects, preserving registry order.
    ///
    /// Fails if a name does not exist so typos do not silently run nothing.
    pub fn retain_named(&self, names: &[String]) -> HarnessResult<Self> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        for name in names {
            if self.get(name).is_none() {
                return Err(HarnessError::Registry(format!("unknown subject '{}'", name)));
            }
        }
        let subjects = self
            .subjects
            .iter()
            .filter(|s| names.iter().any(|n| n == &s.name))
            .cloned()
            .collect();
        Ok(Self { subjects })
    }

    pub fn get(&self, name: &str) -> Option<&SubjectSpec> {
        self.subjects.iter().find(|s| s.name == name)
    }

    pub fn subjects(&self) -> &[SubjectSpec] {
        &self.subjects
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SubjectSpec> {
        self.subjects.iter()
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a SubjectSpec;
    type IntoIter = std::slice::Iter<'a, SubjectSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.subjects.iter()
    }
}
