//! Metalint CLI
//!
//! Orchestrates the diagnostic pipeline: collect the raw analyzer payload,
//! decode it, filter it through the configured rules, apply or render
//! suggested fixes, and print what survives.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::Result;
use clap::Parser;
use metalint_core::{
    AnalysisBackend, Config, Console, Document, FileBackend, MetalintError, OutputFormat,
    PatchEngine, Producer, RAW_MODE_ENV, SelfExecBackend, SourceCache, init_tracing,
    is_raw_payload_clean, render, run_producers,
};
use tracing::debug;

/// Exit status when issues at the fail severity survive filtering
const EXIT_ISSUES_FOUND: u8 = 3;

#[derive(Parser)]
#[command(name = "metalint")]
#[command(about = "Run configured analyzers and report the surviving diagnostics")]
#[command(version = metalint_core::VERSION)]
struct Cli {
    /// Path to configuration file (metalint.toml or metalint.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format: console, json, or github
    #[arg(short, long)]
    output: Option<String>,

    /// Apply suggested fixes in place
    #[arg(long)]
    fix: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Read the raw analyzer payload from a file instead of running analyzers
    #[arg(long, value_name = "FILE")]
    raw_input: Option<PathBuf>,

    /// Arguments passed through to the analysis invocation (e.g. ./...)
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

fn main() -> ExitCode {
    // A re-invocation with the sentinel set runs the analyzers and prints the
    // raw payload; the parent process captures it via stdout.
    if std::env::var_os(RAW_MODE_ENV).is_some() {
        return match raw_mode() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    init_tracing();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{e}");
            let code = e
                .downcast_ref::<MetalintError>()
                .map(MetalintError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code.clamp(1, 255) as u8)
        }
    }
}

/// The raw-mode child: run every registered producer over the requested
/// units and print the payload. With nothing registered this prints `{}`.
fn raw_mode() -> Result<()> {
    let units: Vec<String> = std::env::args()
        .skip(1)
        .filter(|a| !a.starts_with('-'))
        .collect();
    let doc = run_producers(&units, &producer_registry());
    println!("{}", doc.encode_pretty()?);
    Ok(())
}

/// Analyzers compiled into this binary. Empty by default; embedders register
/// their producers here.
fn producer_registry() -> Vec<Box<dyn Producer>> {
    Vec::new()
}

fn run(cli: &Cli) -> Result<u8> {
    let config = load_config(cli.config.as_deref())?;
    let engine = config.rule_engine()?;

    let fix_mode = cli.fix || config.fix;
    let format = match &cli.output {
        Some(s) => OutputFormat::from_str(s)?,
        None => config.output.unwrap_or_default(),
    };

    let backend: Box<dyn AnalysisBackend> = match &cli.raw_input {
        Some(path) => Box::new(FileBackend::new(path)),
        None => Box::new(SelfExecBackend::new(config.backend_args(&cli.args))),
    };

    let payload = backend.collect()?;
    if is_raw_payload_clean(&payload) {
        debug!("analysis reported no findings");
        return Ok(0);
    }

    let mut doc = Document::decode(&payload)?;
    let cache = SourceCache::new();
    let pending = engine.filter(&mut doc, fix_mode, &cache);

    if fix_mode {
        PatchEngine::new(&cache).apply(pending)?;
    } else {
        metalint_core::render_fix_diffs(&mut doc, &cache);
    }

    if doc.is_empty() {
        return Ok(0);
    }

    let console = if cli.no_color {
        Console::no_colors()
    } else {
        Console::new()
    };
    let failing = render(&doc, &cache, format, &console)?;
    Ok(if failing { EXIT_ISSUES_FOUND } else { 0 })
}

/// Resolve configuration: an explicit path is required to exist; otherwise
/// the default file names are probed and absence means default settings.
fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Ok(Config::load(path)?);
    }
    for candidate in ["metalint.toml", "metalint.json"] {
        let candidate = Path::new(candidate);
        if candidate.exists() {
            debug!("using configuration from '{}'", candidate.display());
            return Ok(Config::load(candidate)?);
        }
    }
    Ok(Config::default())
}
