//! Subject builder
//!
//! Invokes the external compiler as `<compiler> <entry> -I <include> -o <binary>`.
//! Success is exit status zero; anything else hands the diagnostic text back to
//! the driver and the subject's test phase is skipped. No retries.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::config::{HarnessConfig, resolve_tool};
use crate::registry::SubjectSpec;

use super::error::HarnessError;

/// Result of building one subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub success: bool,
    /// Compiler stdout and stderr, decoded
    pub diagnostics: String,
}

impl BuildResult {
    /// The failure as a harness error, if the build failed.
    pub fn error(&self, subject: &str) -> Option<HarnessError> {
        if self.success {
            return None;
        }
        Some(HarnessError::BuildFailure {
            subject: subject.to_string(),
            diagnostics: self.diagnostics.clone(),
        })
    }

    fn failed(diagnostics: impl Into<String>) -> Self {
        Self {
            success: false,
            diagnostics: diagnostics.into(),
        }
    }
}

/// Compile `spec` with the configured compiler.
#[tracing::instrument(skip_all, fields(subject = %spec.name))]
pub fn build(spec: &SubjectSpec, config: &HarnessConfig) -> BuildResult {
    let entry = config.resolve(&spec.entry_source);
    let include = config.resolve(&spec.include_root);
    let binary = config.resolve(&spec.binary_output);

    if let Some(out_dir) = binary.parent() {
        if let Err(e) = fs::create_dir_all(out_dir) {
            return BuildResult::failed(format!(
                "cannot create output directory {}: {}",
                out_dir.display(),
                e
            ));
        }
    }

    tracing::debug!(compiler = %config.compiler.display(), entry = %entry.display(), "invoking compiler");

    let compiler = resolve_tool(&config.compiler);
    let output = Command::new(&compiler)
        .arg(&entry)
        .arg("-I")
        .arg(&include)
        .arg("-o")
        .arg(&binary)
        .current_dir(&config.root)
        .stdin(Stdio::null())
        .output();

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            return BuildResult::failed(format!(
                "failed to invoke compiler '{}': {}",
                compiler.display(),
                e
            ));
        }
    };

    let mut diagnostics = decode_diagnostics(output.stdout);
    let stderr = decode_diagnostics(output.stderr);
    if !stderr.is_empty() {
        if !diagnostics.is_empty() && !diagnostics.ends_with('\n') {
            diagnostics.push('\n');
        }
        diagnostics.push_str(&stderr);
    }

    let success = output.status.success() && binary_exists(&binary);
    if output.status.success() && !success {
        diagnostics.push_str(&format!(
            "compiler exited successfully but {} was not produced\n",
            binary.display()
        ));
    }

    BuildResult { success, diagnostics }
}

/// Decode compiler output: strict UTF-8 first, lossy replacement otherwise.
///
/// Never fails; invalid sequences become U+FFFD.
pub fn decode_diagnostics(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

fn binary_exists(path: &Path) -> bool {
    path.is_file()
}
