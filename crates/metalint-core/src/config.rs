//! Run configuration: analyzer table, output selection, and the rule surface
//!
//! Loaded from a TOML or JSON file. Every regular expression and severity
//! level name is validated at load time, before any analysis work begins;
//! a bad pattern is a fatal startup error, never a silently dead rule.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Severity;
use crate::error::MetalintError;
use crate::render::OutputFormat;
use crate::result::Result;
use crate::rules::{CompiledRule, RuleEngine, SeverityBucket};
use crate::suppress::{DEFAULT_MARKER, SuppressionDetector};

/// One exclusion or severity rule as written in the config file.
///
/// `analyzer` matches exactly; `unit`, `path`, and `message` are regular
/// expressions; `severity` names an already-assigned level (only meaningful
/// on exclusion rules). Empty fields are wildcards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RuleConfig {
    pub analyzer: Option<String>,
    pub unit: Option<String>,
    pub path: Option<String>,
    pub message: Option<String>,
    pub severity: Option<String>,
}

impl RuleConfig {
    fn compile(&self, context: &str) -> Result<CompiledRule> {
        Ok(CompiledRule {
            analyzer: non_empty(&self.analyzer).map(str::to_string),
            unit: compile_matcher(&self.unit, context, "unit")?,
            path: compile_matcher(&self.path, context, "path")?,
            message: compile_matcher(&self.message, context, "message")?,
            severity: match non_empty(&self.severity) {
                Some(level) => Some(Severity::from_str(level)?),
                None => None,
            },
        })
    }
}

/// A severity bucket: one output level plus the ordered rules that select it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeverityBucketConfig {
    pub level: String,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Analyzer name → flag map, forwarded to the analysis backend
    pub analyzers: BTreeMap<String, BTreeMap<String, String>>,
    /// Output format; the CLI flag overrides this
    pub output: Option<OutputFormat>,
    /// Apply suggested fixes in place
    pub fix: bool,
    /// Reject rules that reference analyzer names absent from `analyzers`
    pub strict: bool,
    /// Regex for the inline suppression marker; defaults to `//\s*nolint`
    pub suppression_marker: Option<String>,
    /// Ordered exclusion rules; the first full match drops the issue
    pub exclude: Vec<RuleConfig>,
    /// Ordered severity buckets; the first bucket with a matching rule wins
    pub severity: Vec<SeverityBucketConfig>,
}

impl Config {
    /// Load configuration from a TOML or JSON file, chosen by extension
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| MetalintError::io_error(path, e))?;
        let config: Config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| {
                MetalintError::config_error(format!(
                    "failed to parse '{}': {e}",
                    path.display()
                ))
            })?,
            Some("json") => serde_json::from_str(&content).map_err(|e| {
                MetalintError::config_error(format!(
                    "failed to parse '{}': {e}",
                    path.display()
                ))
            })?,
            _ => {
                return Err(MetalintError::config_error(format!(
                    "unsupported config format for '{}': expected .toml or .json",
                    path.display()
                )));
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Startup validation beyond what compiling matchers covers
    fn validate(&self) -> Result<()> {
        if self.strict {
            let known = &self.analyzers;
            for rule in self.all_rules() {
                if let Some(name) = non_empty(&rule.analyzer)
                    && !known.contains_key(name)
                {
                    return Err(MetalintError::config_error(format!(
                        "rule references unknown analyzer '{name}'"
                    )));
                }
            }
        }
        Ok(())
    }

    fn all_rules(&self) -> impl Iterator<Item = &RuleConfig> {
        self.exclude
            .iter()
            .chain(self.severity.iter().flat_map(|b| b.rules.iter()))
    }

    /// Compile the rule surface into a ready rule engine. Fatal on invalid
    /// regexes or level names.
    pub fn rule_engine(&self) -> Result<RuleEngine> {
        let exclude = self
            .exclude
            .iter()
            .map(|rule| rule.compile("exclude"))
            .collect::<Result<Vec<_>>>()?;

        let mut buckets = Vec::with_capacity(self.severity.len());
        for bucket in &self.severity {
            let level = Severity::from_str(&bucket.level)?;
            let rules = bucket
                .rules
                .iter()
                .map(|rule| rule.compile("severity"))
                .collect::<Result<Vec<_>>>()?;
            buckets.push(SeverityBucket { level, rules });
        }

        let marker = self.suppression_marker.as_deref().unwrap_or(DEFAULT_MARKER);
        let detector = SuppressionDetector::new(marker)?;

        Ok(RuleEngine::new(exclude, buckets, detector))
    }

    /// Assemble the argument list forwarded to the raw-mode invocation:
    /// one flag per enabled analyzer, dotted flags for analyzer options,
    /// then any passthrough arguments.
    pub fn backend_args(&self, extra: &[String]) -> Vec<String> {
        let mut args = Vec::new();
        if self.fix {
            args.push("-fix".to_string());
        }
        for (name, flags) in &self.analyzers {
            args.push(format!("-{name}"));
            for (flag, value) in flags {
                if value.is_empty() {
                    continue;
                }
                match value.to_lowercase().as_str() {
                    "false" => continue,
                    "true" => args.push(format!("-{name}.{flag}")),
                    _ => {
                        args.push(format!("-{name}.{flag}"));
                        args.push(value.clone());
                    }
                }
            }
        }
        args.extend(extra.iter().cloned());
        args
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn compile_matcher(pattern: &Option<String>, context: &str, field: &str) -> Result<Option<Regex>> {
    match non_empty(pattern) {
        Some(pattern) => Regex::new(pattern).map(Some).map_err(|e| {
            MetalintError::config_error(format!(
                "invalid {context} rule {field} pattern '{pattern}': {e}"
            ))
        }),
        None => Ok(None),
    }
}
