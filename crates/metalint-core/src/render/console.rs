//! Human-readable console renderer

use std::io::{self, Write};

use rayon::prelude::*;

use crate::cache::SourceCache;
use crate::console::{Color, Console};
use crate::diagnostics::{AnalyzerResult, Document, Issue, Severity};
use crate::result::ResultExt;

/// Print the document to stdout, one atomically-written buffer per issue,
/// and report whether anything at the fail severity survives.
pub fn print(doc: &Document, cache: &SourceCache, console: &Console) -> bool {
    let mut issues: Vec<(&str, &Issue)> = Vec::new();
    for (_, analyzer, result) in doc.entries() {
        match result {
            AnalyzerResult::Failure(message) => {
                write_buffer(&format_failure(analyzer, message, console));
            }
            AnalyzerResult::Issues(list) => {
                issues.extend(list.iter().map(|issue| (analyzer, issue)));
            }
        }
    }

    issues.par_iter().for_each(|(analyzer, issue)| {
        write_buffer(&format_issue(analyzer, issue, cache, console));
    });

    super::has_fail_severity(doc)
}

/// A failed analyzer renders as a distinguished error line
pub fn format_failure(analyzer: &str, message: &str, console: &Console) -> String {
    format!("{analyzer}: {}\n", console.colorize(message, Color::Red))
}

/// One issue: position, colorized severity tag, message and analyzer, then
/// the offending source line with a caret under the column, then any
/// suggested-fix diffs.
pub fn format_issue(analyzer: &str, issue: &Issue, cache: &SourceCache, console: &Console) -> String {
    let posn = issue.position();
    // A cache failure only loses the source-line decoration; the rest of the
    // message still renders.
    let source = cache.load(&posn.file).log_and_continue();

    let mut buf = String::new();
    match &source {
        Some(file) => buf.push_str(&file.display_path),
        None => buf.push_str(&posn.file),
    }
    if posn.has_line() {
        buf.push_str(&format!(":{}", posn.line));
        if posn.has_column() {
            buf.push_str(&format!(":{}", posn.column));
        }
    }

    let severity_color = match issue.severity_level {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Info => Color::Green,
    };
    let mut tagged = format!(": {}", issue.severity_level.tag());
    if let Some(category) = &issue.category {
        tagged.push_str(": ");
        tagged.push_str(category);
    }
    if !issue.message.is_empty() {
        tagged.push_str(": ");
        tagged.push_str(&issue.message);
    }
    buf.push_str(&console.colorize(&tagged, severity_color));
    buf.push_str(&format!(" ({analyzer})"));

    if let Some(file) = &source
        && let Some(line) = file.line(posn.line)
    {
        buf.push('\n');
        buf.push_str(&replace_tabs(line, posn.column));
        if posn.has_column() {
            buf.push('\n');
            for _ in 0..posn.column.max(1) - 1 {
                buf.push(' ');
            }
            buf.push_str(&console.colorize("^", Color::Yellow));
        }
    }
    buf.push('\n');

    for fix in &issue.suggested_fixes {
        buf.push_str("Suggested Fix:");
        if let Some(message) = &fix.message {
            buf.push(' ');
            buf.push_str(&console.colorize(message, Color::Red));
        }
        buf.push('\n');
        buf.push_str(&colorize_diff(&fix.diff, console));
    }

    buf
}

/// Replace leading tab occurrences with single spaces so the caret column
/// stays roughly aligned; `limit < 0` replaces all of them.
fn replace_tabs(line: &str, limit: i32) -> String {
    if limit < 0 {
        return line.replace('\t', " ");
    }
    let mut remaining = limit;
    let mut out = String::with_capacity(line.len());
    for ch in line.chars() {
        if ch == '\t' && remaining > 0 {
            out.push(' ');
            remaining -= 1;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Colorize a unified diff: hunk headers magenta, insertions green,
/// deletions red.
pub fn colorize_diff(diff: &str, console: &Console) -> String {
    let mut out = String::with_capacity(diff.len());
    for line in diff.split_inclusive('\n') {
        let body = line.strip_suffix('\n').unwrap_or(line);
        let colored = if body.starts_with("@@") {
            console.colorize(body, Color::Magenta)
        } else if body.starts_with('+') {
            console.colorize(body, Color::Green)
        } else if body.starts_with('-') {
            console.colorize(body, Color::Red)
        } else {
            body.to_string()
        };
        out.push_str(&colored);
        if line.ends_with('\n') {
            out.push('\n');
        }
    }
    out
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
    use crate::diagnostics::Fix;
    use std::fs;
    use tempfile::TempDir;

    fn issue_at(posn: &str, message: &str) -> Issue {
        Issue {
            message: message.to_string(),
            category: None,
            posn: posn.to_string(),
            severity_level: Severity::Error,
            suggested_fixes: Vec::new(),
        }
    }

    #[test]
    fn issue_header_contains_position_message_and_analyzer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.go");
        fs::write(&path, "l1\nl2\nl3\nl4\nxy := 1\n").unwrap();
        let name = path.to_str().unwrap();

        let cache = SourceCache::new();
        let console = Console::no_colors();
        let issue = issue_at(&format!("{name}:5:3"), "bad thing");
        let out = format_issue("lintX", &issue, &cache, &console);

        assert!(out.contains(":5:3"));
        assert!(out.contains("ERR: bad thing"));
        assert!(out.contains("(lintX)"));
        assert!(out.contains("xy := 1"));
        // Caret under column 3
        assert!(out.contains("\n  ^"));
    }

    #[test]
    fn unreadable_file_still_renders_message() {
        let cache = SourceCache::new();
        let console = Console::no_colors();
        let issue = issue_at("/missing/a.go:5:3", "bad thing");
        let out = format_issue("lintX", &issue, &cache, &console);

        assert!(out.contains("/missing/a.go:5:3"));
        assert!(out.contains("bad thing"));
        assert!(out.contains("(lintX)"));
    }

    #[test]
    fn position_without_line_omits_decoration() {
        let cache = SourceCache::new();
        let console = Console::no_colors();
        let issue = issue_at("a.go", "whole-file problem");
        let out = format_issue("lintX", &issue, &cache, &console);

        assert!(out.starts_with("a.go: ERR: whole-file problem (lintX)\n"));
        assert!(!out.contains('^'));
    }

    #[test]
    fn suggested_fix_diff_is_included() {
        let cache = SourceCache::new();
        let console = Console::no_colors();
        let mut issue = issue_at("a.go", "m");
        issue.suggested_fixes.push(Fix {
            message: Some("use X".to_string()),
            edits: Vec::new(),
            diff: "@@ -1,1 +1,1 @@\n-old\n+new\n".to_string(),
        });
        let out = format_issue("lintX", &issue, &cache, &console);

        assert!(out.contains("Suggested Fix: use X"));
        assert!(out.contains("-old"));
        assert!(out.contains("+new"));
    }

    #[test]
    fn failure_line_names_the_analyzer() {
        let console = Console::no_colors();
        let out = format_failure("lintX", "analyzer crashed", &console);
        assert_eq!(out, "lintX: analyzer crashed\n");
    }

    #[test]
    fn replace_tabs_honors_limit() {
        assert_eq!(replace_tabs("\t\t\tx", 2), "  \tx");
        assert_eq!(replace_tabs("\t\tx", -1), "  x");
    }
}
