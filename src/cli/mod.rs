//! CLI module for the fixture harness
//!
//! ## Commands
//!
//! - `run` (default) - Build every subject and capture its fixtures
//! - `list` - Show the registry
//! - `clean` - Remove generated `.out`/`.dot`/`.png` files
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<crate::harness::HarnessError> for CliError {
    fn from(err: crate::harness::HarnessError) -> Self {
        CliError::failure(format!("Error: {}", err))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Build subject programs and capture their output on fixture inputs
#[derive(Parser, Debug)]
#[command(name = "fixture-harness")]
#[command(version = VERSION)]
#[command(about = "Build subject programs and capture their output on fixture inputs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Which registry and which of its subjects to use
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// TOML registry file (default: built-in reference subjects)
    #[arg(long, value_name = "FILE", global = true)]
    pub registry: Option<PathBuf>,

    /// Only process the named subject (repeatable)
    #[arg(long = "only", value_name = "NAME", global = true)]
    pub only: Vec<String>,

    /// Directory registry paths are relative to (default: current directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub root: Option<PathBuf>,
}

/// Tuning for a harness run
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Per-fixture time budget in seconds
    #[arg(long, value_name = "SECS", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Compiler used to build subjects
    #[arg(long, value_name = "CMD")]
    pub compiler: Option<PathBuf>,

    /// Graph rendering tool
    #[arg(long = "render-tool", value_name = "CMD")]
    pub render_tool: Option<PathBuf>,

    /// Show compiler output and fixture directories
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build every subject and capture its fixtures (default)
    Run(RunArgs),

    /// Show the registry
    List,

    /// Remove generated .out/.dot/.png files next to fixtures
    Clean,
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", value))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("timeout must be a positive number of seconds, got '{}'", value));
    }
    Ok(Duration::from_secs_f64(secs))
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    let registry = commands::load_registry(&cli.selection)?;

    match cli.command {
        None => commands::run_harness(&registry, &cli.selection, &RunArgs::default()),
        Some(Command::Run(args)) => commands::run_harness(&registry, &cli.selection, &args),
        Some(Command::List) => commands::list_subjects(&registry),
        Some(Command::Clean) => commands::clean_artifacts(&registry, &cli.selection),
    }
}

// ============================================================================
// Tests
// ============================================================================
