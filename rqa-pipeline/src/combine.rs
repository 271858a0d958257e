//! Combining raw activation and survey datasets
//!
//! Each activation dataset holds one record per radio show message. Survey
//! datasets hold one or more runs per respondent; they are first coalesced
//! into one record per respondent, then appended to every message from that
//! respondent. Respondents who only answered surveys produce no messages.

use rqa_common::traced_data::{Metadata, TracedData};
use rqa_common::Result;
use std::collections::HashMap;
use tracing::info;

/// Respondent key of raw exported runs, before key translation
pub const RAW_UID_KEY: &str = "avf_phone_id";

/// Merge runs sharing `key` into one record, later runs overwriting earlier values
pub fn coalesce_traced_runs_by_key(user: &str, runs: Vec<TracedData>, key: &str) -> Result<Vec<TracedData>> {
    let run_count = runs.len();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut coalesced: Vec<TracedData> = Vec::new();

    for run in runs {
        let respondent = run.text(key)?.to_string();
        match index.get(&respondent) {
            Some(&i) => coalesced[i].append_data(run.values().clone(), Metadata::new(user)),
            None => {
                index.insert(respondent, coalesced.len());
                coalesced.push(run);
            }
        }
    }

    info!("Coalesced {} runs into {} respondents", run_count, coalesced.len());
    Ok(coalesced)
}

/// Messages from every activation dataset, each with its respondent's survey data appended
pub fn combine_raw_datasets(
    user: &str,
    activation_datasets: Vec<Vec<TracedData>>,
    coalesced_survey_datasets: &[Vec<TracedData>],
    key: &str,
) -> Result<Vec<TracedData>> {
    let mut survey_indexes: Vec<HashMap<&str, &TracedData>> = Vec::with_capacity(coalesced_survey_datasets.len());
    for dataset in coalesced_survey_datasets {
        let mut index = HashMap::with_capacity(dataset.len());
        for td in dataset {
            index.insert(td.text(key)?, td);
        }
        survey_indexes.push(index);
    }

    let mut messages: Vec<TracedData> = activation_datasets.into_iter().flatten().collect();
    let mut with_survey = 0usize;
    for td in messages.iter_mut() {
        let respondent = td.text(key)?.to_string();
        let mut matched = false;
        for survey in &survey_indexes {
            if let Some(survey_td) = survey.get(respondent.as_str()) {
                td.append_data(survey_td.values().clone(), Metadata::new(user));
                matched = true;
            }
        }
        if matched {
            with_survey += 1;
        }
    }

    info!(
        "Combined {} messages with {} survey datasets ({} messages have survey data)",
        messages.len(),
        coalesced_survey_datasets.len(),
        with_survey
    );
    Ok(messages)
}
