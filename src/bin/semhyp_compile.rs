//! SemHyP compiler CLI.
//!
//! Reads an annotation table and prints the compiled document as JSON:
//!
//! ```text
//! semhyp-compile document.tsv > document.json
//! cat document.tsv | semhyp-compile - > document.json
//! ```
//!
//! ## Environment Variables
//!
//! - `SEMHYP_LABELS`: atom labels from "surface", "lemma" or "sense" (default: surface)
//! - `SEMHYP_DISABLE_LAYERS`: comma-separated layers to ignore: entities, srl, coreference
//! - `SEMHYP_KEEP_PUNCT`: "1" to keep punctuation leaves
//! - `SEMHYP_STRICT`: "1" to exit with status 2 when any sentence was skipped
//! - `SEMHYP_CACHE_ENTRIES`: document cache capacity (default: 256, 0 disables)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//! - `RUST_LOG`: log filter (default: semhyp_compile=info,semhyp_kernel=info)
//!
//! Logs go to stderr; stdout carries only the document.

use std::io::{self, Read, Write};
use std::process::ExitCode;

use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use semhyp_kernel::{
    CacheConfig, CompilePolicy, DocumentHypergraph, DocumentReport, HypergraphCompiler, LabelSource,
};

/// Exit status when strict mode finds a skipped sentence.
const STRICT_FAILURE: u8 = 2;

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "semhyp_compile=info,semhyp_kernel=info".into());

    if log_format == "pretty" {
        // Pretty format for local development
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .init();
    }
}

/// Build the compile policy from the environment.
fn policy_from_env() -> CompilePolicy {
    let mut policy = CompilePolicy::default();

    if let Ok(labels) = std::env::var("SEMHYP_LABELS") {
        match labels.parse::<LabelSource>() {
            Ok(source) => policy.label_source = source,
            Err(e) => warn!(error = %e, "Invalid SEMHYP_LABELS, using surface forms"),
        }
    }

    if let Ok(layers) = std::env::var("SEMHYP_DISABLE_LAYERS") {
        for layer in layers.split(',').map(str::trim).filter(|l| !l.is_empty()) {
            match layer.to_lowercase().as_str() {
                "entities" | "ner" => policy.use_entities = false,
                "srl" => policy.use_srl = false,
                "coreference" | "coref" => policy.use_coreference = false,
                other => warn!(layer = %other, "Unknown layer in SEMHYP_DISABLE_LAYERS"),
            }
        }
    }

    policy.keep_punctuation = env_flag("SEMHYP_KEEP_PUNCT");
    policy
}

fn cache_from_env() -> CacheConfig {
    match std::env::var("SEMHYP_CACHE_ENTRIES").map(|v| v.parse::<usize>()) {
        Ok(Ok(0)) => CacheConfig::disabled(),
        Ok(Ok(max_entries)) => CacheConfig {
            max_entries,
            enabled: true,
        },
        Ok(Err(_)) => {
            warn!("Invalid SEMHYP_CACHE_ENTRIES, using default");
            CacheConfig::default()
        }
        Err(_) => CacheConfig::default(),
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn read_source(path: Option<&str>) -> io::Result<String> {
    match path {
        None | Some("-") => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
        Some(path) => std::fs::read_to_string(path),
    }
}

#[derive(Serialize)]
struct Output<'a> {
    hypergraph: &'a DocumentHypergraph,
    report: &'a DocumentReport,
}

fn run(path: Option<&str>, strict: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let source = read_source(path)?;

    let policy = policy_from_env();
    info!(
        policy_id = %policy.policy_id(),
        params_hash = %policy.params_hash(),
        labels = %policy.label_source,
        "Compiling document"
    );

    let compiler = HypergraphCompiler::with_cache(policy, cache_from_env());
    let document = compiler.compile_cached(&source);

    let output = Output {
        hypergraph: &document.hypergraph,
        report: &document.report,
    };
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &output)?;
    writeln!(stdout)?;

    if strict && document.has_skipped() {
        warn!(
            skipped = document.report.skipped().len(),
            "Strict mode: sentences were skipped"
        );
        return Ok(ExitCode::from(STRICT_FAILURE));
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_tracing();

    let path = std::env::args().nth(1);
    let strict = env_flag("SEMHYP_STRICT");

    match run(path.as_deref(), strict) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Compilation failed");
            ExitCode::FAILURE
        }
    }
}
