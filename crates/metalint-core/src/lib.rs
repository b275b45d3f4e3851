//! Metalint Core
//!
//! Diagnostic-processing pipeline for a meta-linter: decode the raw analyzer
//! payload, filter it through exclusion and severity rules, apply or render
//! suggested fixes, and print the surviving issues.

pub mod backend;
pub mod cache;
pub mod config;
pub mod console; // Terminal console utilities for rich output
pub mod diagnostics;
pub mod error;
pub mod patch;
pub mod render;
pub mod result;
pub mod rules;
pub mod suppress;

// Re-export commonly used types
pub use backend::{
    AnalysisBackend, FileBackend, Producer, RAW_MODE_ENV, SelfExecBackend, is_raw_payload_clean,
    run_producers,
};
pub use cache::{SourceCache, SourceFile};
pub use config::{Config, RuleConfig, SeverityBucketConfig};
pub use console::{Color, Console};
pub use diagnostics::{
    AnalyzerResult, Document, Edit, Fix, Issue, Severity, SourcePosition,
};
pub use error::{ErrorKind, MetalintError};
pub use patch::{PatchEngine, PendingEdits, render_fix_diffs};
pub use render::{OutputFormat, render};
pub use result::{Result, ResultExt};
pub use rules::{CompiledRule, RuleEngine, SeverityBucket};
pub use suppress::{DEFAULT_MARKER, SuppressionDetector};

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("metalint=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
