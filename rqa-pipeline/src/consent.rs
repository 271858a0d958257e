//! Consent determination and redaction
//!
//! A respondent withdraws consent by having any coded field labelled with
//! the STOP control code. Their records are flagged, and once flagged every
//! field except the identity and the flag is overwritten with `STOP`.

use rqa_common::codes::{ControlCode, CONSENT_WITHDRAWN_KEY, STOP};
use rqa_common::traced_data::{FieldValue, Label, Metadata, TracedData, UID_KEY};
use rqa_common::{CodingConfiguration, CodingPlans, Result};
use std::collections::BTreeMap;
use tracing::info;

/// True if any configured coded field of `td` carries a STOP label
pub fn has_stop_code(td: &TracedData, plans: &CodingPlans) -> Result<bool> {
    for cc in plans.configurations() {
        for label in coded_labels(td, cc)? {
            if cc
                .code_scheme
                .code_with_id(&label.code_id)?
                .is_control(ControlCode::Stop)
            {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn coded_labels<'a>(td: &'a TracedData, cc: &CodingConfiguration) -> Result<&'a [Label]> {
    let labels: &[Label] = match td.get(&cc.coded_field) {
        None => &[],
        Some(FieldValue::Label(label)) => std::slice::from_ref(label),
        Some(FieldValue::Labels(labels)) => labels,
        Some(_) => return td.labels(&cc.coded_field),
    };
    Ok(labels)
}

/// Set the consent flag on every record
pub fn determine_consent_withdrawn(user: &str, data: &mut [TracedData], plans: &CodingPlans) -> Result<()> {
    let mut withdrawn = 0usize;
    for td in data.iter_mut() {
        let stopped = has_stop_code(td, plans)?;
        if stopped {
            withdrawn += 1;
        }
        td.append_field(CONSENT_WITHDRAWN_KEY, FieldValue::Bool(stopped), Metadata::new(user));
    }
    info!(
        "Determined consent for {} records ({} withdrawn)",
        data.len(),
        withdrawn
    );
    Ok(())
}

/// Overwrite every field of withdrawn records with `STOP`.
///
/// `additional_keys` are redacted even when absent, so exported columns of a
/// withdrawn respondent never come out empty.
pub fn set_stopped(user: &str, data: &mut [TracedData], additional_keys: &[String]) -> Result<()> {
    let mut redacted = 0usize;
    for td in data.iter_mut() {
        if !td.flag(CONSENT_WITHDRAWN_KEY)? {
            continue;
        }

        let stop_dict: BTreeMap<String, FieldValue> = td
            .keys()
            .chain(additional_keys.iter().map(String::as_str))
            .filter(|key| *key != UID_KEY && *key != CONSENT_WITHDRAWN_KEY)
            .map(|key| (key.to_string(), FieldValue::text(STOP)))
            .collect();
        td.append_data(stop_dict, Metadata::new(user));
        redacted += 1;
    }
    info!("Redacted {} withdrawn records", redacted);
    Ok(())
}
