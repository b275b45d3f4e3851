//! Canonical in-memory representation of analyzer output
//!
//! The wire shape is a JSON mapping from unit identifier (a package, module,
//! or other compilation grouping) to a mapping from analyzer name to either a
//! hard failure message or an ordered issue list:
//!
//! ```json
//! {
//!   "<unit>": {
//!     "<analyzer>": [
//!       {
//!         "posn": "/path/to/file:12:3",
//!         "message": "something is off",
//!         "suggested_fixes": [
//!           {
//!             "message": "",
//!             "edits": [
//!               { "filename": "/path/to/file", "start": 865, "end": 865, "new": "text" }
//!             ]
//!           }
//!         ]
//!       }
//!     ],
//!     "<failed analyzer>": { "error": "analyzer crashed" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MetalintError;
use crate::result::Result;

/// Severity level assigned to an issue by the rule engine.
///
/// Analyzers never supply this; the default applies until the severity
/// buckets have been evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Short tag used by the console renderer
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Error => "ERR",
            Severity::Warning => "WRN",
            Severity::Info => "INF",
        }
    }

    /// Keyword used by GitHub workflow annotation directives
    pub fn annotation_keyword(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "notice",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = MetalintError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "error" => Ok(Severity::Error),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            other => Err(MetalintError::config_error(format!(
                "unknown severity level '{other}', expected one of: error, warning, info"
            ))),
        }
    }
}

/// A source position parsed from the compact `file[:line[:column]]` encoding.
///
/// Line and column are 1-based; `-1` means absent. Filenames may themselves
/// contain colons (drive letters, embedded paths), so only the trailing one
/// or two numeric segments are ever treated as line/column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    pub file: String,
    pub line: i32,
    pub column: i32,
}

impl SourcePosition {
    pub fn parse(posn: &str) -> Self {
        let parts: Vec<&str> = posn.split(':').collect();
        let mut numeric = Vec::new();
        // Strip at most two numeric suffixes, never consuming the whole string
        let mut end = parts.len();
        while end > 1 && numeric.len() < 2 {
            match parts[end - 1].parse::<i32>() {
                Ok(n) => {
                    numeric.push(n);
                    end -= 1;
                }
                Err(_) => break,
            }
        }
        let (line, column) = match numeric.as_slice() {
            [col, line] => (*line, *col),
            [line] => (*line, -1),
            _ => (-1, -1),
        };
        Self {
            file: parts[..end].join(":"),
            line,
            column,
        }
    }

    pub fn has_line(&self) -> bool {
        self.line != -1
    }

    pub fn has_column(&self) -> bool {
        self.column != -1
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file)?;
        if self.has_line() {
            write!(f, ":{}", self.line)?;
            if self.has_column() {
                write!(f, ":{}", self.column)?;
            }
        }
        Ok(())
    }
}

/// A single byte-range replacement within one file.
///
/// Offsets are absolute byte positions into the original content at the time
/// the diagnostics were produced. `end < start` is a zero-width insertion at
/// `start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Edit {
    pub filename: String,
    pub new: String,
    pub start: usize,
    #[serde(default)]
    pub end: usize,
}

impl Edit {
    /// End offset with the zero-width-insertion rule applied
    pub fn effective_end(&self) -> usize {
        self.end.max(self.start)
    }
}

/// A named set of text edits proposed to resolve an issue.
///
/// All edits of one fix must target the same file; a fix referencing more
/// than one distinct file is invalid and is skipped rather than applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fix {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub edits: Vec<Edit>,
    /// Rendered unified diff, derived for display; never part of the wire format
    #[serde(skip)]
    pub diff: String,
}

impl Fix {
    /// The single file this fix targets, or None when the fix is empty or
    /// spans multiple distinct files.
    pub fn target_file(&self) -> Option<&str> {
        let first = self.edits.first()?.filename.as_str();
        if self.edits.iter().all(|e| e.filename == first) {
            Some(first)
        } else {
            None
        }
    }
}

/// One reported diagnostic with a source position and message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Issue {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub posn: String,
    #[serde(default)]
    pub severity_level: Severity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_fixes: Vec<Fix>,
}

impl Issue {
    pub fn position(&self) -> SourcePosition {
        SourcePosition::parse(&self.posn)
    }
}

/// Result of running one analyzer over one unit: either the analyzer itself
/// errored (no issues are trusted) or it produced an ordered issue list.
///
/// The two shapes are mutually exclusive on the wire and must stay
/// distinguishable; a failure is never treated as zero issues.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzerResult {
    Failure(String),
    Issues(Vec<Issue>),
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct FailureShape {
    error: String,
}

impl Serialize for AnalyzerResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            AnalyzerResult::Failure(message) => FailureShape {
                error: message.clone(),
            }
            .serialize(serializer),
            AnalyzerResult::Issues(issues) => issues.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for AnalyzerResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Probe the strict failure shape first, then fall back to the issue
        // sequence; anything else fails the whole decode.
        let value = serde_json::Value::deserialize(deserializer)?;
        if let Ok(failure) = FailureShape::deserialize(&value) {
            return Ok(AnalyzerResult::Failure(failure.error));
        }
        let issues = Vec::<Issue>::deserialize(&value).map_err(D::Error::custom)?;
        Ok(AnalyzerResult::Issues(issues))
    }
}

impl AnalyzerResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, AnalyzerResult::Failure(_))
    }
}

/// The diagnostic document: unit identifier → analyzer name → result.
///
/// Constructed once per run by decoding the raw backend payload, mutated in
/// place by the rule engine and patch engine, then handed read-only to the
/// renderers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(pub BTreeMap<String, BTreeMap<String, AnalyzerResult>>);

impl Document {
    /// Strict decode of the raw analyzer payload. Unknown fields or shapes
    /// fail the whole decode; no partial trust is placed in a payload the
    /// tool cannot fully interpret.
    pub fn decode(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| {
            MetalintError::decode_error(format!(
                "unmarshaling failed \"{e}\" for response:\n{}",
                String::from_utf8_lossy(data)
            ))
        })
    }

    /// Encode the document for the structured-output renderer, mirroring the
    /// decode shapes exactly.
    pub fn encode_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MetalintError::internal_error(format!("json encoding failed: {e}")))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any surviving issue sits at the given severity. Failure-shape
    /// entries always count as problems at the highest level.
    pub fn has_severity(&self, severity: Severity) -> bool {
        self.0.values().flat_map(|unit| unit.values()).any(|result| match result {
            AnalyzerResult::Failure(_) => severity == Severity::Error,
            AnalyzerResult::Issues(issues) => {
                issues.iter().any(|i| i.severity_level == severity)
            }
        })
    }

    /// Iterate over all (unit, analyzer, result) triples
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &AnalyzerResult)> {
        self.0.iter().flat_map(|(unit, analyzers)| {
            analyzers
                .iter()
                .map(move |(name, result)| (unit.as_str(), name.as_str(), result))
        })
    }
}
