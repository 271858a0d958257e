//! Analysis file generation
//!
//! Produces the two analysis CSVs: one row per message, and one row per
//! respondent after folding. Columns are `uid`, the consent flag, then for
//! every plan its configurations' analysis columns followed by the raw field.

use crate::consent::{determine_consent_withdrawn, set_stopped};
use crate::folding::{fold_by_uid, FoldPlan, FoldStrategy, Unlisted};
use rqa_common::codes::{CONSENT_WITHDRAWN_KEY, MATRIX_0, MATRIX_1};
use rqa_common::traced_data::{FieldValue, Metadata, TracedData, UID_KEY};
use rqa_common::{CodingMode, CodingPlans, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Output columns, in order
pub fn export_keys(plans: &CodingPlans) -> Vec<String> {
    let mut keys = vec![UID_KEY.to_string(), CONSENT_WITHDRAWN_KEY.to_string()];
    for plan in plans.all() {
        for cc in &plan.coding_configurations {
            keys.extend(cc.analysis_columns());
        }
        keys.push(plan.raw_field.clone());
    }
    keys
}

/// Columns of the production file: raw messages with their send times, then raw survey answers
pub fn production_keys(plans: &CodingPlans) -> Vec<String> {
    let mut keys = vec![UID_KEY.to_string()];
    for plan in &plans.rqa {
        keys.push(plan.raw_field.clone());
        if let Some(time_field) = &plan.time_field {
            if !keys.contains(time_field) {
                keys.push(time_field.clone());
            }
        }
    }
    keys.extend(plans.survey.iter().map(|plan| plan.raw_field.clone()));
    keys
}

/// Fold strategies for every exported field; everything else is discarded
pub fn fold_plan(plans: &CodingPlans) -> FoldPlan {
    let mut plan = FoldPlan::new(Unlisted::Discard)
        .with(UID_KEY, FoldStrategy::AssertEqual)
        .with(CONSENT_WITHDRAWN_KEY, FoldStrategy::BooleanOr);

    for coding_plan in plans.all() {
        for cc in &coding_plan.coding_configurations {
            if cc.analysis_file_key.is_some() {
                plan.insert(cc.coded_field.clone(), FoldStrategy::for_configuration(cc));
            }
        }
        plan.insert(
            coding_plan.raw_field.clone(),
            FoldStrategy::for_raw_field(coding_plan.raw_field_folding_mode),
        );
    }
    plan
}

/// Convert codes into their analysis column values.
///
/// SINGLE configurations write the code's string value under the analysis
/// key; MULTIPLE configurations write `1`/`0` under one column per code.
/// Records without the coded field get no columns.
pub fn derive_analysis_values(user: &str, data: &mut [TracedData], plans: &CodingPlans) -> Result<()> {
    for td in data.iter_mut() {
        let mut analysis_dict = BTreeMap::new();

        for cc in plans.configurations() {
            let Some(key) = &cc.analysis_file_key else {
                continue;
            };
            if !td.contains_key(&cc.coded_field) {
                continue;
            }

            match cc.coding_mode {
                CodingMode::Single => {
                    let label = td.label(&cc.coded_field)?;
                    let code = cc.code_scheme.code_with_id(&label.code_id)?;
                    analysis_dict.insert(key.clone(), FieldValue::text(code.string_value.as_str()));
                }
                CodingMode::Multiple => {
                    for code in cc.code_scheme.codes() {
                        analysis_dict.insert(format!("{}{}", key, code.string_value), FieldValue::text(MATRIX_0));
                    }
                    for label in td.labels(&cc.coded_field)? {
                        let code = cc.code_scheme.code_with_id(&label.code_id)?;
                        analysis_dict.insert(format!("{}{}", key, code.string_value), FieldValue::text(MATRIX_1));
                    }
                }
            }
        }

        td.append_data(analysis_dict, Metadata::new(user));
    }
    Ok(())
}

/// Write `headers` columns of every record; absent fields are empty cells
pub fn write_csv(data: &[TracedData], path: &Path, headers: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for td in data {
        writer.write_record(
            headers
                .iter()
                .map(|key| td.get(key).map(FieldValue::to_cell).unwrap_or_default()),
        )?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {}", data.len(), path.display());
    Ok(())
}

fn export_to_csv(
    user: &str,
    data: &mut [TracedData],
    plans: &CodingPlans,
    path: &Path,
    export_keys: &[String],
) -> Result<()> {
    derive_analysis_values(user, data, plans)?;
    set_stopped(user, data, export_keys)?;
    write_csv(data, path, export_keys)
}

/// Build the by-message and by-individual analysis files.
///
/// Returns the message records and the folded respondent records, both
/// carrying analysis values and redaction.
pub fn generate(
    user: &str,
    mut data: Vec<TracedData>,
    plans: &CodingPlans,
    csv_by_message_output_path: &Path,
    csv_by_individual_output_path: &Path,
) -> Result<(Vec<TracedData>, Vec<TracedData>)> {
    determine_consent_withdrawn(user, &mut data, plans)?;

    let export_keys = export_keys(plans);
    let mut individuals = fold_by_uid(user, &data, &fold_plan(plans))?;

    export_to_csv(user, &mut data, plans, csv_by_message_output_path, &export_keys)?;
    export_to_csv(user, &mut individuals, plans, csv_by_individual_output_path, &export_keys)?;

    Ok((data, individuals))
}
