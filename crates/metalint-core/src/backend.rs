//! Analysis backends: where the raw diagnostic payload comes from
//!
//! The default backend re-invokes the current binary with an environment
//! sentinel set. The child process sees the sentinel, switches into raw mode,
//! runs the registered producers, and writes the JSON payload to stdout. The
//! parent captures that payload and feeds it to the pipeline. A file backend
//! exists for replaying captured payloads.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::process::Command;

use crate::diagnostics::{AnalyzerResult, Document};
use crate::error::MetalintError;
use crate::result::Result;

/// Environment variable that flips a re-invocation into raw mode
pub const RAW_MODE_ENV: &str = "METALINT_RAW_MODE";

/// Source of the raw diagnostic payload
pub trait AnalysisBackend {
    fn collect(&self) -> Result<Vec<u8>>;
}

/// Re-invokes the current executable in raw mode and captures its stdout.
///
/// Anything the child writes to stderr is treated as a hard failure: it is
/// copied through to our stderr and the run aborts with the child's exit
/// status, because a payload accompanied by complaints cannot be trusted.
pub struct SelfExecBackend {
    args: Vec<String>,
}

impl SelfExecBackend {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }
}

impl AnalysisBackend for SelfExecBackend {
    fn collect(&self) -> Result<Vec<u8>> {
        let exe = std::env::current_exe()
            .and_then(std::fs::canonicalize)
            .map_err(|e| MetalintError::backend_error(format!("resolving executable: {e}"), 1))?;

        tracing::debug!("re-invoking {} with {:?}", exe.display(), self.args);
        let output = Command::new(&exe)
            .args(&self.args)
            .env(RAW_MODE_ENV, "1")
            .output()
            .map_err(|e| {
                MetalintError::backend_error(format!("spawning '{}': {e}", exe.display()), 1)
            })?;

        if !output.stderr.is_empty() {
            let _ = std::io::stderr().write_all(&output.stderr);
            let code = output.status.code().unwrap_or(1);
            return Err(MetalintError::backend_error(
                "analysis produced errors",
                if code == 0 { 1 } else { code },
            ));
        }
        if !output.status.success() {
            return Err(MetalintError::backend_error(
                format!("analysis exited with {}", output.status),
                output.status.code().unwrap_or(1),
            ));
        }
        Ok(output.stdout)
    }
}

/// Reads a previously captured payload from disk. Used as the replay and
/// testing entry point behind `--raw-input`.
pub struct FileBackend {
    path: std::path::PathBuf,
}

impl FileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl AnalysisBackend for FileBackend {
    fn collect(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path).map_err(|e| MetalintError::io_error(&self.path, e))
    }
}

/// An empty-object payload means the analysis ran and found nothing; the
/// pipeline short-circuits to a clean exit without decoding.
pub fn is_raw_payload_clean(payload: &[u8]) -> bool {
    payload.trim_ascii() == b"{}"
}

/// One registered analyzer running inside the raw-mode child
pub trait Producer: Sync {
    fn name(&self) -> &str;
    fn analyze(&self, unit: &str) -> AnalyzerResult;
}

/// Run every producer over every unit and assemble the diagnostic document
/// the raw-mode child prints. With no producers registered the result is the
/// empty document, which encodes as `{}`.
pub fn run_producers(units: &[String], producers: &[Box<dyn Producer>]) -> Document {
    let mut doc = Document::default();
    for unit in units {
        let mut results = BTreeMap::new();
        for producer in producers {
            results.insert(producer.name().to_string(), producer.analyze(unit));
        }
        if !results.is_empty() {
            doc.0.insert(unit.clone(), results);
        }
    }
    doc
}
