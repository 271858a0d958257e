//! Recovered data converter (convert-recovered-data)
//!
//! Converts the de-identified recovery CSVs named by the pipeline
//! configuration into traced data JSONL in the raw data directory, where
//! `rqa-pipeline` loads them alongside the raw exports.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rqa_common::traced_io::write_jsonl_file;
use rqa_common::PipelineConfiguration;
use rqa_pipeline::recovery::{convert_recovery_csv, output_stem};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for convert-recovered-data
#[derive(Parser, Debug)]
#[command(name = "convert-recovered-data")]
#[command(about = "Converts de-identified recovery CSVs to traced data")]
#[command(version)]
struct Args {
    /// Identifier of the person running the conversion, recorded in provenance
    #[arg(long, env = "RQA_USER")]
    user: String,

    /// Pipeline configuration JSON
    #[arg(long, env = "RQA_PIPELINE_CONFIGURATION")]
    pipeline_configuration: PathBuf,

    /// Directory holding local copies of the recovery CSVs
    #[arg(long, env = "RQA_RECOVERY_CSV_DIR")]
    recovery_csv_dir: PathBuf,

    /// Directory to write the converted JSONL to
    #[arg(long, env = "RQA_RAW_DATA_DIR")]
    raw_data_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = PipelineConfiguration::load(&args.pipeline_configuration)
        .context("Failed to load pipeline configuration")?;
    let Some(urls) = &config.recovery_csv_urls else {
        bail!("Pipeline configuration has no RecoveryCSVURLs");
    };

    for url in urls {
        let file_name = url.rsplit('/').next().unwrap_or(url);
        let csv_path = args.recovery_csv_dir.join(file_name);
        let file = File::open(&csv_path).with_context(|| format!("Failed to open {}", csv_path.display()))?;

        let data = convert_recovery_csv(&args.user, file, file_name)
            .with_context(|| format!("Failed to convert {}", csv_path.display()))?;

        let output_path = args.raw_data_dir.join(format!("{}.jsonl", output_stem(url)));
        write_jsonl_file(&output_path, &data)?;
    }

    info!("Converted {} recovery CSVs", urls.len());
    Ok(())
}
