//! Build-and-capture engine
//!
//! ## Flow
//!
//! For each subject in the registry, in order:
//! 1. `builder` compiles the subject with the external toolchain
//! 2. `selector` enumerates its fixtures (only after a successful build)
//! 3. `executor` runs the binary on each fixture under a timeout
//! 4. `artifacts` writes `<fixture>.out`, relocates the side artifact to
//!    `<fixture>.dot` and renders `<fixture>.png`
//!
//! `driver` sequences these steps and `reporter` narrates them. Everything is
//! single-threaded; the only state shared between fixtures is the side
//! artifact slot in the subjects' working directory.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod artifacts;
pub mod builder;
pub mod driver;
pub mod error;
pub mod executor;
pub mod interfaces;
pub mod reporter;
pub mod selector;

pub use artifacts::{RenderOutcome, SideArtifactSlot};
pub use builder::BuildResult;
pub use driver::Driver;
pub use error::{HarnessError, HarnessResult};
pub use executor::{ExecutionOutcome, ExitStatus};
pub use interfaces::{GraphRenderer, SubjectRunner, Toolchain};
pub use reporter::{ConsoleReporter, RunReporter, RunSummary, SubjectState, SubjectTally};
