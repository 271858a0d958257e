//! RQA Pipeline (rqa-pipeline) - Main entry point
//!
//! Runs one project's coding pipeline over raw exports already fetched to a
//! local directory: combine, translate, filter, apply manual and default
//! labels, impute, fold, redact, then write the analysis CSVs and traced
//! data.
//!
//! Raw exports are read from `{raw_data_dir}/{flow name}.jsonl`. Recovered
//! messages converted by `convert-recovered-data` are picked up from the same
//! directory and treated as activation messages.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rqa_common::traced_data::TracedData;
use rqa_common::traced_io::{read_jsonl_file, write_jsonl_file};
use rqa_common::{CodeSchemeRegistry, CodingPlans, PipelineConfiguration};
use rqa_pipeline::analysis_file::{self, production_keys, write_csv};
use rqa_pipeline::combine::{coalesce_traced_runs_by_key, combine_raw_datasets, RAW_UID_KEY};
use rqa_pipeline::filter::{filter_project_window, filter_test_messages};
use rqa_pipeline::imputation::impute_codes;
use rqa_pipeline::labelling::apply_default_labels;
use rqa_pipeline::manual_labels::{apply_manual_labels, assign_message_ids};
use rqa_pipeline::recovery::output_stem;
use rqa_pipeline::sink::{publish_outputs, LocalDirectorySink, RunOutputs};
use rqa_pipeline::translate_keys::translate_rapid_pro_keys;
use rqa_pipeline::LocationTable;
use tracing::{info, info_span, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for rqa-pipeline
#[derive(Parser, Debug)]
#[command(name = "rqa-pipeline")]
#[command(about = "Codes, folds and exports radio show and survey responses")]
#[command(version)]
struct Args {
    /// Identifier of the person running the pipeline, recorded in provenance
    #[arg(long, env = "RQA_USER")]
    user: String,

    /// Pipeline configuration JSON
    #[arg(long, env = "RQA_PIPELINE_CONFIGURATION")]
    pipeline_configuration: PathBuf,

    /// Coding plans TOML
    #[arg(long, env = "RQA_CODING_PLANS")]
    coding_plans: PathBuf,

    /// Directory of code scheme JSON files
    #[arg(long, env = "RQA_CODE_SCHEMES_DIR")]
    code_schemes_dir: PathBuf,

    /// Location hierarchy table JSON
    #[arg(long, env = "RQA_LOCATION_TABLE")]
    location_table: PathBuf,

    /// Directory holding the raw exports as JSONL
    #[arg(long, env = "RQA_RAW_DATA_DIR")]
    raw_data_dir: PathBuf,

    /// Directory of Coda datasets holding the manual labels
    #[arg(long, env = "RQA_CODED_DIR")]
    coded_dir: Option<PathBuf>,

    /// Output path for the raw messages CSV
    #[arg(long, env = "RQA_PRODUCTION_CSV_OUTPUT")]
    production_csv_output: Option<PathBuf>,

    #[arg(long, env = "RQA_MESSAGES_JSON_OUTPUT")]
    messages_json_output: PathBuf,

    #[arg(long, env = "RQA_INDIVIDUALS_JSON_OUTPUT")]
    individuals_json_output: PathBuf,

    #[arg(long, env = "RQA_CSV_BY_MESSAGE_OUTPUT")]
    csv_by_message_output: PathBuf,

    #[arg(long, env = "RQA_CSV_BY_INDIVIDUAL_OUTPUT")]
    csv_by_individual_output: PathBuf,

    /// Directory that receives copies of the outputs at the configured upload paths
    #[arg(long, env = "RQA_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,
}

fn load_flows(raw_data_dir: &Path, names: &[String]) -> Result<Vec<Vec<TracedData>>> {
    names
        .iter()
        .map(|name| {
            let path = raw_data_dir.join(format!("{}.jsonl", name));
            read_jsonl_file(&path).with_context(|| format!("Failed to load raw flow {}", path.display()))
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let run_id = uuid::Uuid::new_v4();
    let _span = info_span!("pipeline", %run_id).entered();
    info!("Starting RQA pipeline as user '{}'", args.user);

    // Configuration
    let config = PipelineConfiguration::load(&args.pipeline_configuration)
        .context("Failed to load pipeline configuration")?;
    let registry = CodeSchemeRegistry::load_dir(&args.code_schemes_dir)
        .context("Failed to load code schemes")?;
    let plans = CodingPlans::load(&args.coding_plans, &registry).context("Failed to load coding plans")?;
    let locations = LocationTable::load(&args.location_table).context("Failed to load location table")?;

    // Raw data
    let mut activation_flow_names = Vec::new();
    let mut survey_flow_names = Vec::new();
    for source in &config.raw_data_sources {
        activation_flow_names.extend(source.activation_flow_names().iter().cloned());
        survey_flow_names.extend(source.survey_flow_names().iter().cloned());
    }

    let mut activation_datasets = load_flows(&args.raw_data_dir, &activation_flow_names)?;
    for url in config.recovery_csv_urls.iter().flatten() {
        let path = args.raw_data_dir.join(format!("{}.jsonl", output_stem(url)));
        if !path.exists() {
            warn!("Recovered data {} has not been converted yet, skipping", path.display());
            continue;
        }
        activation_datasets.push(read_jsonl_file(&path).context("Failed to load recovered data")?);
    }

    let mut coalesced_surveys = Vec::new();
    for dataset in load_flows(&args.raw_data_dir, &survey_flow_names)? {
        coalesced_surveys.push(coalesce_traced_runs_by_key(&args.user, dataset, RAW_UID_KEY)?);
    }

    let mut data = combine_raw_datasets(&args.user, activation_datasets, &coalesced_surveys, RAW_UID_KEY)
        .context("Failed to combine raw datasets")?;

    translate_rapid_pro_keys(&args.user, &mut data, &config.rapid_pro_key_remappings)?;

    let mut data = filter_project_window(data, &plans.rqa, config.project_start_date, config.project_end_date)
        .context("Failed to filter messages to the project window")?;
    if config.filter_test_messages {
        data = filter_test_messages(data, &config.rapid_pro_test_contact_uuids);
    } else {
        info!("Not filtering test messages (FilterTestMessages is false)");
    }

    if let Some(path) = &args.production_csv_output {
        write_csv(&data, path, &production_keys(&plans)).context("Failed to write production CSV")?;
    }

    // Coding
    assign_message_ids(&args.user, &mut data, &plans)?;
    match &args.coded_dir {
        Some(coded_dir) => apply_manual_labels(&args.user, &mut data, &plans, coded_dir)
            .context("Failed to apply manual labels")?,
        None => warn!("No coded directory given, every response stays NOT_REVIEWED"),
    }
    apply_default_labels(&args.user, &mut data, &plans).context("Failed to apply default labels")?;
    impute_codes(&args.user, &mut data, &plans, &locations).context("Failed to impute codes")?;

    let (messages, individuals) = analysis_file::generate(
        &args.user,
        data,
        &plans,
        &args.csv_by_message_output,
        &args.csv_by_individual_output,
    )
    .context("Failed to generate analysis files")?;

    write_jsonl_file(&args.messages_json_output, &messages)?;
    write_jsonl_file(&args.individuals_json_output, &individuals)?;

    match (&config.drive_upload, &args.upload_dir) {
        (Some(paths), Some(upload_dir)) => {
            let sink = LocalDirectorySink::new(upload_dir);
            let outputs = RunOutputs {
                production_csv: args.production_csv_output.as_deref(),
                messages_csv: &args.csv_by_message_output,
                individuals_csv: &args.csv_by_individual_output,
                messages_traced_data: &args.messages_json_output,
                individuals_traced_data: &args.individuals_json_output,
            };
            publish_outputs(&sink, paths, &outputs).context("Failed to publish outputs")?;
        }
        (None, Some(_)) => warn!("Upload directory given but DriveUpload is not configured, skipping"),
        _ => info!("Skipping output upload"),
    }

    info!(
        "Pipeline complete: {} messages, {} individuals",
        messages.len(),
        individuals.len()
    );
    Ok(())
}
