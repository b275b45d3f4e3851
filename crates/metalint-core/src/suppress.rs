//! Inline suppression marker detection

use regex::Regex;

use crate::cache::SourceCache;
use crate::diagnostics::SourcePosition;
use crate::error::MetalintError;
use crate::result::{Result, ResultExt};

/// Default marker: a `// nolint` comment on the reported line
pub const DEFAULT_MARKER: &str = r"//\s*nolint";

/// Recognizes inline "suppress this diagnostic" markers adjacent to a
/// reported position. A pure predicate; its only side effect is populating
/// the source cache.
#[derive(Debug)]
pub struct SuppressionDetector {
    marker: Regex,
}

impl SuppressionDetector {
    pub fn new(pattern: &str) -> Result<Self> {
        let marker = Regex::new(pattern).map_err(|e| {
            MetalintError::config_error(format!("invalid suppression marker pattern: {e}"))
        })?;
        Ok(Self { marker })
    }

    /// Whether the line the position points at carries the marker.
    ///
    /// Positions with no resolvable line (no line number, or line beyond the
    /// file) are never suppressed. A cache read failure is logged and treated
    /// as "not suppressed" so the issue still renders.
    pub fn is_suppressed(&self, cache: &SourceCache, posn: &SourcePosition) -> bool {
        if !posn.has_line() {
            return false;
        }
        let Some(file) = cache.load(&posn.file).log_and_continue() else {
            return false;
        };
        file.line(posn.line)
            .is_some_and(|line| self.marker.is_match(line))
    }
}

impl Default for SuppressionDetector {
    fn default() -> Self {
        Self {
            marker: Regex::new(DEFAULT_MARKER).unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_source(dir: &TempDir, content: &str) -> String {
        let path = dir.path().join("a.go");
        fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn marked_line_is_suppressed() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, "fine\nbad := 1 // nolint\nfine\n");
        let cache = SourceCache::new();
        let detector = SuppressionDetector::default();

        let posn = SourcePosition::parse(&format!("{path}:2:1"));
        assert!(detector.is_suppressed(&cache, &posn));
    }

    #[test]
    fn unmarked_line_is_not_suppressed() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, "fine\nbad := 1 // nolint\nfine\n");
        let cache = SourceCache::new();
        let detector = SuppressionDetector::default();

        for line in [1, 3] {
            let posn = SourcePosition::parse(&format!("{path}:{line}"));
            assert!(!detector.is_suppressed(&cache, &posn));
        }
    }

    #[test]
    fn unresolvable_lines_never_suppress() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, "x // nolint\n");
        let cache = SourceCache::new();
        let detector = SuppressionDetector::default();

        // No line at all
        assert!(!detector.is_suppressed(&cache, &SourcePosition::parse(&path)));
        // Line beyond file length
        let posn = SourcePosition::parse(&format!("{path}:99"));
        assert!(!detector.is_suppressed(&cache, &posn));
    }

    #[test]
    fn unreadable_file_is_not_suppressed() {
        let cache = SourceCache::new();
        let detector = SuppressionDetector::default();
        let posn = SourcePosition::parse("/no/such/file.go:1:1");
        assert!(!detector.is_suppressed(&cache, &posn));
    }

    #[test]
    fn custom_marker_pattern() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, "bad = 1  # noqa\n");
        let cache = SourceCache::new();
        let detector = SuppressionDetector::new(r"#\s*noqa").unwrap();

        let posn = SourcePosition::parse(&format!("{path}:1"));
        assert!(detector.is_suppressed(&cache, &posn));
    }

    #[test]
    fn invalid_marker_pattern_is_config_error() {
        assert!(SuppressionDetector::new("[").is_err());
    }
}
