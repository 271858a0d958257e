//! Default labels for coded fields that upstream review has not filled
//!
//! A coded field missing from a record gets TRUE_MISSING (NA) when the
//! record has no response in the plan's raw field, and NOT_REVIEWED (NR)
//! when it has one that nobody has labelled yet. Existing labels are kept.
//!
//! Configurations with a cleaner are auto-coded first: if the cleaned raw
//! text matches a code of the scheme, that code is assigned instead of NR.

use rqa_common::codes::ControlCode;
use rqa_common::traced_data::{FieldValue, Label, Metadata, TracedData};
use rqa_common::{Code, CodingConfiguration, CodingMode, CodingPlans, Result};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Code for the cleaned raw text, if the configuration has a cleaner that accepts it
fn cleaned_code<'a>(td: &TracedData, raw_field: &str, cc: &'a CodingConfiguration) -> Result<Option<&'a Code>> {
    let Some(cleaner) = cc.cleaner else {
        return Ok(None);
    };
    if !td.contains_key(raw_field) {
        return Ok(None);
    }
    let Some(value) = cleaner.clean(td.text(raw_field)?) else {
        debug!(uid = td.uid(), field = %cc.coded_field, "Cleaner rejected raw value");
        return Ok(None);
    };
    cc.code_scheme.code_with_match_value(&value).map(Some)
}

pub fn apply_default_labels(user: &str, data: &mut [TracedData], plans: &CodingPlans) -> Result<()> {
    let mut labelled = 0usize;

    for td in data.iter_mut() {
        let mut delta = BTreeMap::new();
        for plan in plans.all() {
            let control_code = if td.contains_key(&plan.raw_field) {
                ControlCode::NotReviewed
            } else {
                ControlCode::TrueMissing
            };

            for cc in &plan.coding_configurations {
                if td.contains_key(&cc.coded_field) {
                    continue;
                }
                let code = match cleaned_code(td, &plan.raw_field, cc)? {
                    Some(code) => code,
                    None => cc.code_scheme.code_with_control_code(control_code)?,
                };
                let label = Label::automatic(&cc.code_scheme, code);
                let value = match cc.coding_mode {
                    CodingMode::Single => FieldValue::Label(label),
                    CodingMode::Multiple => FieldValue::Labels(vec![label]),
                };
                delta.insert(cc.coded_field.clone(), value);
            }
        }

        if !delta.is_empty() {
            labelled += delta.len();
            td.append_data(delta, Metadata::new(user));
        }
    }

    info!("Applied {} default labels across {} records", labelled, data.len());
    Ok(())
}
