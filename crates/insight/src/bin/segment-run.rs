//! segment-run: one-shot segmentation over a JSON file of customer profiles.
//!
//! Reads a JSON array of `CustomerProfile`s, clusters them, discovers
//! patterns, generates ranked segment suggestions and prints the report as
//! JSON on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use cohort_core::config::{load_dotenv, AlgorithmChoice, Config};
use cohort_core::CustomerProfile;
use cohort_insight::{LlmSuggestionWriter, SegmentationEngine, SuggestionWriter, TemplateWriter};

// ── CLI ─────────────────────────────────────────────────────────────

/// Segment customers and suggest actionable segments.
#[derive(Parser, Debug)]
#[command(name = "segment-run", version, about)]
struct Cli {
    /// JSON file holding an array of customer profiles.
    input: PathBuf,

    /// Clustering algorithm: kmeans, dbscan or auto.
    #[arg(long)]
    algorithm: Option<AlgorithmChoice>,

    /// K-Means cluster count.
    #[arg(long)]
    k: Option<usize>,

    /// Seed for K-Means initialization.
    #[arg(long)]
    seed: Option<u64>,

    /// DBSCAN neighbourhood radius.
    #[arg(long)]
    eps: Option<f64>,

    /// DBSCAN density threshold.
    #[arg(long)]
    min_pts: Option<usize>,

    /// Business goal passed to the copy writer (repeatable).
    #[arg(long = "goal")]
    goals: Vec<String>,

    /// Use templated copy instead of calling the LLM.
    #[arg(long, env = "SEGMENT_NO_LLM")]
    no_llm: bool,

    /// Pretty-print the report.
    #[arg(long)]
    pretty: bool,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    load_dotenv();
    let mut config = Config::from_env();
    apply_overrides(&cli, &mut config);
    config.log_summary();

    let raw = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let customers: Vec<CustomerProfile> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing customer profiles from {}", cli.input.display()))?;
    info!(path = %cli.input.display(), customers = customers.len(), "loaded customers");

    let writer = build_writer(&config, cli.no_llm);
    let engine = SegmentationEngine::from_config(&config.segmentation, writer);
    let report = engine.run(&customers).await?;

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    if report.degraded_copy_count > 0 {
        warn!(
            degraded = report.degraded_copy_count,
            "some suggestions use templated copy"
        );
    }
    Ok(())
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    let seg = &mut config.segmentation;
    if let Some(algorithm) = cli.algorithm {
        seg.algorithm = algorithm;
    }
    if let Some(k) = cli.k {
        seg.k = k;
    }
    if let Some(seed) = cli.seed {
        seg.seed = Some(seed);
    }
    if let Some(eps) = cli.eps {
        seg.eps = eps;
    }
    if let Some(min_pts) = cli.min_pts {
        seg.min_pts = min_pts;
    }
    if !cli.goals.is_empty() {
        seg.business_goals = cli.goals.clone();
    }
}

/// LLM-backed writer when a provider is configured, templates otherwise.
fn build_writer(config: &Config, no_llm: bool) -> Arc<dyn SuggestionWriter> {
    if no_llm {
        info!("LLM disabled, using templated copy");
        return Arc::new(TemplateWriter);
    }
    match cohort_llm::create_provider(&config.llm, &config.ollama) {
        Ok(provider) => {
            info!(provider = %config.llm.provider, "LLM copy writer ready");
            Arc::new(LlmSuggestionWriter::new(
                provider,
                config.llm.temperature,
                config.llm.max_tokens,
            ))
        }
        Err(e) => {
            warn!(error = %e, "LLM provider unavailable, using templated copy");
            Arc::new(TemplateWriter)
        }
    }
}
