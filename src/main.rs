use std::path::PathBuf;
use std::time::Duration;

use bizdoc::config::Config;
use bizdoc::extract::extract_file;
use bizdoc::{DocumentInput, Engine, Language, LlmRefiner, PassthroughRefiner, Refiner};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bizdoc", version, about = "Rule-based business document analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a .txt/.md/.pdf document and print the analysis as JSON
    Analyze {
        file: PathBuf,

        /// TOML config with [engine] and [llm] sections
        #[arg(long)]
        config: Option<PathBuf>,

        /// Declared document type; "auto" lets the engine guess
        #[arg(long)]
        doc_type: Option<String>,

        /// Narrative language: eng or ara
        #[arg(long)]
        language_out: Option<String>,

        /// Run the configured LLM refiner over the draft
        #[arg(long)]
        refine: bool,

        /// Refiner timeout, overriding the config
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print only the evidence excerpt
        #[arg(long)]
        evidence_only: bool,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the JSON, logs go to stderr
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let Command::Analyze {
        file,
        config,
        doc_type,
        language_out,
        refine,
        timeout_secs,
        evidence_only,
        compact,
    } = cli.command;

    let cfg = match config {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let engine = Engine::new(cfg.engine.clone())?;

    let extracted = extract_file(&file)?;
    info!(
        path = %file.display(),
        source = ?extracted.meta.source_type,
        chars = extracted.text.chars().count(),
        "Loaded document"
    );

    if evidence_only {
        println!("{}", engine.evidence(&extracted.text));
        return Ok(());
    }

    let mut input = DocumentInput::new(extracted.text);
    if let Some(hint) = doc_type.as_deref() {
        input = input.with_doc_type(hint);
    }
    if let Some(code) = language_out.as_deref() {
        let lang = Language::from_code(code).ok_or_else(|| format!("unknown language: {code}"))?;
        input = input.with_language_out(lang);
    }

    let analysis = if refine {
        let timeout = timeout_secs.map_or_else(|| cfg.refiner.timeout(), Duration::from_secs);
        info!(
            backend = ?cfg.refiner.backend,
            model = ?cfg.refiner.active_model(),
            timeout_secs = timeout.as_secs(),
            "Refinement requested"
        );
        let refiner: Box<dyn Refiner> = match LlmRefiner::from_config(&cfg.refiner) {
            Ok(r) => Box::new(r),
            Err(e) => {
                warn!(error = %e, "LLM refiner unavailable, using draft as is");
                Box::new(PassthroughRefiner)
            }
        };
        engine
            .analyze_and_refine(&input, refiner.as_ref(), timeout)
            .await?
    } else {
        engine.analyze(&input)?
    };

    info!(
        doc_type = %analysis.doc_type,
        amounts = analysis.amounts.len(),
        kpis = analysis.kpis.len(),
        risks = analysis.risk_matrix.len(),
        confidence = analysis.confidence,
        "Analysis complete"
    );

    let json = if compact {
        serde_json::to_string(&analysis)?
    } else {
        serde_json::to_string_pretty(&analysis)?
    };
    println!("{json}");
    Ok(())
}
