//! Demographic distributions of opted-in respondents
//!
//! One row per normal code of every exported single-coded survey question.
//! Respondents coded STOP for a question are left out of that question
//! entirely, including its denominator.

use crate::dataset::{codes, demographic_configurations, opted_in};
use crate::percentage::Percentage;
use crate::report::Table;
use rqa_common::codes::ControlCode;
use rqa_common::traced_data::TracedData;
use rqa_common::{CodingConfiguration, CodingPlans, Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemographicRow {
    #[serde(rename = "Demographic")]
    pub demographic: String,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "Number of Individuals")]
    pub individuals: usize,
    #[serde(rename = "% of Individuals")]
    pub individuals_percent: Option<Percentage>,
}

impl Table for DemographicRow {
    const HEADERS: &'static [&'static str] =
        &["Demographic", "Value", "Number of Individuals", "% of Individuals"];
}

fn distribution(individuals: &[TracedData], cc: &CodingConfiguration) -> Result<Vec<DemographicRow>> {
    let demographic = cc.analysis_file_key.clone().unwrap_or_else(|| cc.coded_field.clone());
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut denominator = 0usize;

    for ind in individuals {
        if !opted_in(ind)? {
            continue;
        }
        let found = codes(ind, cc)?;
        let [code] = found.as_slice() else {
            return Err(Error::inconsistency(
                &cc.coded_field,
                ind.uid(),
                format!("expected exactly one code, found {}", found.len()),
            ));
        };
        if code.is_control(ControlCode::Stop) {
            continue;
        }
        denominator += 1;
        if code.is_normal() {
            *counts.entry(code.code_id.as_str()).or_default() += 1;
        }
    }

    Ok(cc
        .code_scheme
        .codes()
        .iter()
        .filter(|code| code.is_normal())
        .map(|code| {
            let count = counts.get(code.code_id.as_str()).copied().unwrap_or(0);
            DemographicRow {
                demographic: demographic.clone(),
                value: code.string_value.clone(),
                individuals: count,
                individuals_percent: Percentage::of(count, denominator),
            }
        })
        .collect())
}

pub fn demographic_distributions(individuals: &[TracedData], plans: &CodingPlans) -> Result<Vec<DemographicRow>> {
    let mut rows = Vec::new();
    let configurations = demographic_configurations(plans);
    for cc in &configurations {
        rows.extend(distribution(individuals, cc)?);
    }
    info!("Computed distributions for {} demographics", configurations.len());
    Ok(rows)
}
