//! RQA Analysis (rqa-analysis) - Main entry point
//!
//! Loads the traced message and individual datasets written by
//! `rqa-pipeline` and writes the summary CSVs to an output directory.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rqa_analysis::write_report;
use rqa_common::traced_io::read_jsonl_file;
use rqa_common::{CodeSchemeRegistry, CodingPlans};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for rqa-analysis
#[derive(Parser, Debug)]
#[command(name = "rqa-analysis")]
#[command(about = "Computes engagement, participation and demographic summaries")]
#[command(version)]
struct Args {
    /// Coding plans TOML (the same file the pipeline ran with)
    #[arg(long, env = "RQA_CODING_PLANS")]
    coding_plans: PathBuf,

    /// Directory of code scheme JSON files
    #[arg(long, env = "RQA_CODE_SCHEMES_DIR")]
    code_schemes_dir: PathBuf,

    #[arg(long, env = "RQA_MESSAGES_JSON_INPUT")]
    messages_json_input: PathBuf,

    #[arg(long, env = "RQA_INDIVIDUALS_JSON_INPUT")]
    individuals_json_input: PathBuf,

    /// Directory that receives the summary CSVs
    #[arg(long, env = "RQA_ANALYSIS_OUTPUT_DIR")]
    output_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    info!("Starting RQA analysis");

    let registry = CodeSchemeRegistry::load_dir(&args.code_schemes_dir)
        .context("Failed to load code schemes")?;
    let plans = CodingPlans::load(&args.coding_plans, &registry).context("Failed to load coding plans")?;

    let messages = read_jsonl_file(&args.messages_json_input)
        .with_context(|| format!("Failed to load messages from {}", args.messages_json_input.display()))?;
    let individuals = read_jsonl_file(&args.individuals_json_input).with_context(|| {
        format!("Failed to load individuals from {}", args.individuals_json_input.display())
    })?;
    info!("Loaded {} messages and {} individuals", messages.len(), individuals.len());

    write_report(&args.output_dir, &messages, &individuals, &plans).context("Failed to compute analysis")?;

    info!("Analysis written to {}", args.output_dir.display());
    Ok(())
}
