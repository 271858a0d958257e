//! Season-wide code distribution per exported coding configuration
//!
//! Reads the analysis values written by the pipeline, so every code of
//! every scheme gets a row, controls included. Withdrawn respondents are
//! counted under the scheme's STOP code.

use crate::dataset::opted_in;
use crate::report::Table;
use rqa_common::codes::{ControlCode, MATRIX_1};
use rqa_common::traced_data::{FieldValue, TracedData};
use rqa_common::{CodingConfiguration, CodingMode, CodingPlans, Error, Result};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionRow {
    #[serde(rename = "Analysis Key")]
    pub analysis_key: String,
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Number of Individuals")]
    pub individuals: usize,
}

impl Table for DistributionRow {
    const HEADERS: &'static [&'static str] = &["Analysis Key", "Code", "Number of Individuals"];
}

fn configuration_distribution(
    individuals: &[TracedData],
    cc: &CodingConfiguration,
    key: &str,
) -> Result<Vec<DistributionRow>> {
    let scheme = &cc.code_scheme;
    let mut counts = vec![0usize; scheme.codes().len()];
    let stop_position = scheme
        .code_with_control_code(ControlCode::Stop)
        .ok()
        .and_then(|code| scheme.position(&code.code_id));

    for ind in individuals {
        if !opted_in(ind)? {
            match stop_position {
                Some(i) => counts[i] += 1,
                None => {
                    return Err(Error::inconsistency(
                        &cc.coded_field,
                        ind.uid(),
                        format!("withdrawn respondent but scheme {} has no STOP code", scheme.scheme_id()),
                    ))
                }
            }
            continue;
        }

        match cc.coding_mode {
            CodingMode::Single => {
                let Some(value) = ind.get(key) else {
                    continue;
                };
                let FieldValue::Text(value) = value else {
                    return Err(Error::UnexpectedValue {
                        field: key.to_string(),
                        expected: format!("text, found {}", value.kind()),
                    });
                };
                let position = scheme
                    .codes()
                    .iter()
                    .position(|code| &code.string_value == value)
                    .ok_or_else(|| Error::UnknownCode {
                        scheme_id: scheme.scheme_id().to_string(),
                        lookup: format!("string value '{}'", value),
                    })?;
                counts[position] += 1;
            }
            CodingMode::Multiple => {
                for (i, code) in scheme.codes().iter().enumerate() {
                    let column = format!("{}{}", key, code.string_value);
                    if matches!(ind.get(&column), Some(FieldValue::Text(v)) if v == MATRIX_1) {
                        counts[i] += 1;
                    }
                }
            }
        }
    }

    Ok(scheme
        .codes()
        .iter()
        .zip(counts)
        .map(|(code, individuals)| DistributionRow {
            analysis_key: key.to_string(),
            code: code.string_value.clone(),
            individuals,
        })
        .collect())
}

pub fn season_distribution(individuals: &[TracedData], plans: &CodingPlans) -> Result<Vec<DistributionRow>> {
    let mut rows = Vec::new();
    for cc in plans.configurations() {
        let Some(key) = cc.analysis_file_key.as_deref() else {
            continue;
        };
        rows.extend(configuration_distribution(individuals, cc, key)?);
    }
    info!("Computed season distribution over {} individuals", individuals.len());
    Ok(rows)
}
