//! Output strategies for the filtered diagnostic document
//!
//! All renderers consume the document read-only. Per-issue formatting work
//! runs on a rayon fan-out; each task assembles its own buffer and writes it
//! atomically, so output order across issues is not guaranteed.

pub mod console;
pub mod github;
pub mod json;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::SourceCache;
use crate::console::Console;
use crate::diagnostics::{Document, Severity};
use crate::error::MetalintError;
use crate::result::Result;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable, colorized console output
    #[default]
    Console,
    /// Machine-readable round-trip of the filtered document
    Json,
    /// GitHub workflow annotation directives
    Github,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Console => "console",
            OutputFormat::Json => "json",
            OutputFormat::Github => "github",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = MetalintError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "console" => Ok(OutputFormat::Console),
            "json" => Ok(OutputFormat::Json),
            "github" => Ok(OutputFormat::Github),
            other => Err(MetalintError::config_error(format!(
                "output must be one of: console, json, github (got '{other}')"
            ))),
        }
    }
}

/// Render the document in the selected format and report whether any
/// surviving issue sits at the fail severity. The caller derives the process
/// exit status from the returned flag.
pub fn render(
    doc: &Document,
    cache: &SourceCache,
    format: OutputFormat,
    console: &Console,
) -> Result<bool> {
    match format {
        OutputFormat::Console => Ok(console::print(doc, cache, console)),
        OutputFormat::Json => json::print(doc),
        OutputFormat::Github => Ok(github::print(doc, cache, console)),
    }
}

/// Shared by the console and GitHub renderers: whether the document still
/// carries anything at the fail level.
pub(crate) fn has_fail_severity(doc: &Document) -> bool {
    doc.has_severity(Severity::Error)
}
