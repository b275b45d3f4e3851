//! GitHub workflow annotation renderer
//!
//! Emits one annotation directive per issue. A collapsible group holding the
//! console rendering comes first so humans reading the log get the rich
//! version too.

use std::io::{self, Write};

use rayon::prelude::*;

use crate::cache::SourceCache;
use crate::console::Console;
use crate::diagnostics::{AnalyzerResult, Document, Issue};
use crate::result::ResultExt;

/// Newline token understood inside annotation messages
const INLINE_NEWLINE: &str = "%0A";

pub fn print(doc: &Document, cache: &SourceCache, console: &Console) -> bool {
    write_buffer("::group::console format\n");
    super::console::print(doc, cache, console);
    write_buffer("::endgroup::\n");

    let mut issues: Vec<(&str, &Issue)> = Vec::new();
    for (_, analyzer, result) in doc.entries() {
        match result {
            AnalyzerResult::Failure(message) => {
                write_buffer(&format!("::error:: {analyzer}: {message}\n"));
            }
            AnalyzerResult::Issues(list) => {
                issues.extend(list.iter().map(|issue| (analyzer, issue)));
            }
        }
    }

    issues.par_iter().for_each(|(analyzer, issue)| {
        write_buffer(&format_annotation(analyzer, issue, cache));
    });

    super::has_fail_severity(doc)
}

/// One `::error|::warning|::notice` directive with file/line/col properties
/// and an inline-escaped copy of the source line and any fix diffs.
pub fn format_annotation(analyzer: &str, issue: &Issue, cache: &SourceCache) -> String {
    let posn = issue.position();
    let source = cache.load(&posn.file).log_and_continue();

    let mut buf = String::new();
    buf.push_str("::");
    buf.push_str(issue.severity_level.annotation_keyword());
    buf.push_str(" file=");
    match &source {
        Some(file) => buf.push_str(&file.display_path),
        None => buf.push_str(&posn.file),
    }
    if posn.has_line() {
        buf.push_str(&format!(",line={}", posn.line));
        if posn.has_column() {
            buf.push_str(&format!(",col={}", posn.column));
        }
    }
    buf.push_str("::");
    if let Some(category) = &issue.category {
        buf.push_str(category);
        buf.push_str(": ");
    }
    buf.push_str(&issue.message);
    buf.push_str(&format!(" ({analyzer})"));

    if let Some(file) = &source
        && let Some(line) = file.line(posn.line)
    {
        buf.push_str(INLINE_NEWLINE);
        buf.push_str(&line.replace('\t', " "));
        if posn.has_column() {
            buf.push_str(INLINE_NEWLINE);
            for _ in 0..posn.column.max(1) - 1 {
                buf.push(' ');
            }
            buf.push('^');
        }
    }

    for fix in &issue.suggested_fixes {
        buf.push_str(INLINE_NEWLINE);
        buf.push_str("Suggested Fix:");
        if let Some(message) = &fix.message {
            buf.push(' ');
            buf.push_str(message);
        }
        buf.push_str(INLINE_NEWLINE);
        buf.push_str("```diff");
        buf.push_str(INLINE_NEWLINE);
        buf.push_str(&fix.diff.replace('\n', INLINE_NEWLINE));
        buf.push_str("```");
    }

    buf.push('\n');
    buf
}

fn write_buffer(buf: &str) {
    let mut out = io::stdout().lock();
    if let Err(e) = out.write_all(buf.as_bytes()) {
        tracing::warn!("writing to stdout failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Fix, Severity};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn annotation_carries_severity_keyword_and_location() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        fs::write(&path, "one\ntwo\n").unwrap();
        let name = path.to_str().unwrap();

        let cache = SourceCache::new();
        let issue = Issue {
            message: "bad thing".to_string(),
            category: Some("style".to_string()),
            posn: format!("{name}:2:1"),
            severity_level: Severity::Warning,
            suggested_fixes: Vec::new(),
        };
        let out = format_annotation("lintX", &issue, &cache);

        assert!(out.starts_with("::warning file="));
        assert!(out.contains(",line=2,col=1"));
        assert!(out.contains("::style: bad thing (lintX)"));
        assert!(out.contains("%0Atwo%0A^"));
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn info_maps_to_notice() {
        let cache = SourceCache::new();
        let issue = Issue {
            message: "fyi".to_string(),
            category: None,
            posn: "a.go".to_string(),
            severity_level: Severity::Info,
            suggested_fixes: Vec::new(),
        };
        let out = format_annotation("lintX", &issue, &cache);
        assert!(out.starts_with("::notice file=a.go::fyi (lintX)"));
    }

    #[test]
    fn diff_newlines_are_inline_escaped() {
        let cache = SourceCache::new();
        let issue = Issue {
            message: "m".to_string(),
            category: None,
            posn: "a.go".to_string(),
            severity_level: Severity::Error,
            suggested_fixes: vec![Fix {
                message: None,
                edits: Vec::new(),
                diff: "-old\n+new\n".to_string(),
            }],
        };
        let out = format_annotation("lintX", &issue, &cache);
        assert!(out.contains("%0A```diff%0A-old%0A+new%0A```"));
        // Only the terminating newline remains literal
        assert_eq!(out.matches('\n').count(), 1);
    }
}
