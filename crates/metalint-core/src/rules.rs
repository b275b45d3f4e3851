//! Rule engine: ordered exclusion rules and severity buckets
//!
//! Filtering runs single-threaded and fully mutates the document before any
//! renderer fans out; concurrent structural mutation alongside concurrent
//! iteration is unsafe by construction, so that ordering is load-bearing.

use regex::Regex;

use crate::cache::SourceCache;
use crate::diagnostics::{AnalyzerResult, Document, Issue, Severity};
use crate::patch::PendingEdits;
use crate::suppress::SuppressionDetector;

/// One exclusion or severity-selection rule with its matchers compiled.
///
/// The analyzer matcher is an exact string; unit, position, and message are
/// regexes. Empty matchers are wildcards, but a rule with every matcher empty
/// matches nothing, so a malformed empty rule can never exclude everything.
#[derive(Debug, Default)]
pub struct CompiledRule {
    pub analyzer: Option<String>,
    pub unit: Option<Regex>,
    pub path: Option<Regex>,
    pub message: Option<Regex>,
    pub severity: Option<Severity>,
}

impl CompiledRule {
    fn is_blanket(&self) -> bool {
        self.analyzer.is_none()
            && self.unit.is_none()
            && self.path.is_none()
            && self.message.is_none()
            && self.severity.is_none()
    }

    /// Whether every non-empty matcher matches the triple. `severity` is the
    /// level the severity matcher compares against: the assigned level for
    /// exclusion rules, the default level during severity assignment.
    pub fn matches(&self, unit: &str, analyzer: &str, issue: &Issue, severity: Severity) -> bool {
        if self.is_blanket() {
            return false;
        }
        if let Some(name) = &self.analyzer
            && name != analyzer
        {
            return false;
        }
        if let Some(re) = &self.unit
            && !re.is_match(unit)
        {
            return false;
        }
        if let Some(re) = &self.path
            && !re.is_match(&issue.posn)
        {
            return false;
        }
        if let Some(re) = &self.message
            && !re.is_match(&issue.message)
        {
            return false;
        }
        if let Some(level) = self.severity
            && level != severity
        {
            return false;
        }
        true
    }
}

/// An ordered group of rules sharing one output severity level
#[derive(Debug)]
pub struct SeverityBucket {
    pub level: Severity,
    pub rules: Vec<CompiledRule>,
}

/// Evaluates exclusion rules and severity buckets against
/// (unit, analyzer, issue) triples and drives the filtering pass.
#[derive(Debug)]
pub struct RuleEngine {
    exclude: Vec<CompiledRule>,
    severity: Vec<SeverityBucket>,
    detector: SuppressionDetector,
}

impl RuleEngine {
    pub fn new(
        exclude: Vec<CompiledRule>,
        severity: Vec<SeverityBucket>,
        detector: SuppressionDetector,
    ) -> Self {
        Self {
            exclude,
            severity,
            detector,
        }
    }

    /// True iff any rule in the ordered list fully matches; short-circuits on
    /// the first match.
    pub fn is_excluded(&self, unit: &str, analyzer: &str, issue: &Issue) -> bool {
        self.exclude
            .iter()
            .any(|rule| rule.matches(unit, analyzer, issue, issue.severity_level))
    }

    /// First matching bucket (in configured order) wins; no match yields the
    /// default level. Reads only immutable issue fields, never a previously
    /// assigned severity, so reapplication always yields the same result.
    pub fn assign_severity(&self, unit: &str, analyzer: &str, issue: &Issue) -> Severity {
        for bucket in &self.severity {
            for rule in &bucket.rules {
                if rule.matches(unit, analyzer, issue, Severity::default()) {
                    return bucket.level;
                }
            }
        }
        Severity::default()
    }

    /// The single-threaded filtering pass. Per issue, in order: severity
    /// assignment, suppression-comment check, exclusion check, then auto-fix
    /// consumption. Analyzer entries with zero surviving issues are removed,
    /// as are units with zero remaining analyzers; failure-shape entries
    /// always survive.
    ///
    /// Returns the edits queued for the patch engine; empty unless `fix_mode`
    /// is on.
    pub fn filter(&self, doc: &mut Document, fix_mode: bool, cache: &SourceCache) -> PendingEdits {
        let mut pending = PendingEdits::new();
        doc.0.retain(|unit, analyzers| {
            analyzers.retain(|analyzer, result| {
                let AnalyzerResult::Issues(issues) = result else {
                    return true;
                };
                issues.retain_mut(|issue| {
                    issue.severity_level = self.assign_severity(unit, analyzer, issue);
                    if self.detector.is_suppressed(cache, &issue.position()) {
                        return false;
                    }
                    if self.is_excluded(unit, analyzer, issue) {
                        return false;
                    }
                    if fix_mode && !issue.suggested_fixes.is_empty() {
                        let mut consumed = false;
                        for fix in &issue.suggested_fixes {
                            if fix.target_file().is_none() {
                                tracing::warn!(
                                    "suggested fix from '{analyzer}' modifies more than one file, skipping: {:?}",
                                    fix.message
                                );
                                continue;
                            }
                            for edit in &fix.edits {
                                pending
                                    .entry(edit.filename.clone())
                                    .or_default()
                                    .push(edit.clone());
                            }
                            consumed = true;
                        }
                        // Applied fixes resolve the issue; it is removed, not hidden
                        if consumed {
                            return false;
                        }
                    }
                    true
                });
                !issues.is_empty()
            });
            !analyzers.is_empty()
        });
        pending
    }
}
