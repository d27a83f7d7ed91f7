#![forbid(unsafe_code)]
//! Fixture Harness
//!
//! Builds a set of independently compiled subject programs, runs each one
//! against a directory of fixture inputs and records what it printed as a
//! golden capture next to every fixture. Subjects that draw a graph get it
//! relocated per fixture and, when Graphviz is around, rendered to PNG.
//!
//! The harness records; it never judges. There is no diffing and no verdict.
//!
//! ## Panic Policy
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `harness` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod harness;
pub mod registry;

pub use config::HarnessConfig;
pub use harness::{Driver, HarnessError, RunSummary};
pub use registry::{FixtureFilter, Registry, SubjectSpec};
