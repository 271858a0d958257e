//! Manual labels from the coding tool
//!
//! Each plan's responses are reviewed in a Coda dataset stored as
//! `{coded_dir}/{coda_filename}`: a JSON array of messages, each with a
//! `MessageID`, its `Text` and its `Labels`, newest label first. Records are
//! matched to Coda messages through the plan's id field, which holds the
//! SHA-256 of the raw text.
//!
//! Only checked labels are applied. A response whose newest label for a
//! scheme is unchecked stays unlabelled and is marked NOT_REVIEWED by the
//! default labelling stage.

use rqa_common::traced_data::{FieldValue, Label, Metadata, TracedData};
use rqa_common::{CodingConfiguration, CodingMode, CodingPlan, CodingPlans, Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

/// One message of a Coda dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodaMessage {
    #[serde(rename = "MessageID")]
    pub message_id: String,
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "Labels", default)]
    pub labels: Vec<Label>,
}

/// Message id of a raw response
pub fn message_id(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Give every response a message id under its plan's id field.
///
/// Ids already present are kept.
pub fn assign_message_ids(user: &str, data: &mut [TracedData], plans: &CodingPlans) -> Result<()> {
    let mut assigned = 0usize;
    for td in data.iter_mut() {
        let mut delta = BTreeMap::new();
        for plan in plans.all() {
            if !td.contains_key(&plan.raw_field) || td.contains_key(&plan.id_field) {
                continue;
            }
            let id = message_id(td.text(&plan.raw_field)?);
            delta.insert(plan.id_field.clone(), FieldValue::Text(id));
        }
        if !delta.is_empty() {
            assigned += delta.len();
            td.append_data(delta, Metadata::new(user));
        }
    }
    info!("Assigned {} message ids", assigned);
    Ok(())
}

/// Read a Coda dataset, keyed by message id
pub fn load_coda_messages(path: &Path) -> Result<HashMap<String, CodaMessage>> {
    let content = std::fs::read_to_string(path)?;
    let messages: Vec<CodaMessage> = serde_json::from_str(&content)?;
    debug!("Read {} Coda messages from {}", messages.len(), path.display());
    Ok(messages
        .into_iter()
        .map(|message| (message.message_id.clone(), message))
        .collect())
}

/// Value for `cc`'s coded field, if the message holds checked labels for its scheme
fn coded_value(message: &CodaMessage, cc: &CodingConfiguration) -> Result<Option<FieldValue>> {
    let scheme = &cc.code_scheme;
    let labels: Vec<&Label> = message
        .labels
        .iter()
        .filter(|label| label.scheme_id == scheme.scheme_id())
        .collect();
    let Some(newest) = labels.first() else {
        return Ok(None);
    };
    if !newest.checked {
        return Ok(None);
    }
    for label in &labels {
        scheme.code_with_id(&label.code_id)?;
    }

    match cc.coding_mode {
        CodingMode::Single => Ok(Some(FieldValue::Label((*newest).clone()))),
        CodingMode::Multiple => {
            let mut applied: Vec<Label> = Vec::new();
            for label in labels {
                if !applied.iter().any(|l| l.code_id == label.code_id) {
                    applied.push(label.clone());
                }
            }
            Ok(Some(FieldValue::Labels(applied)))
        }
    }
}

fn apply_plan(
    user: &str,
    data: &mut [TracedData],
    plan: &CodingPlan,
    messages: &HashMap<String, CodaMessage>,
) -> Result<usize> {
    let mut labelled = 0usize;
    for td in data.iter_mut() {
        if !td.contains_key(&plan.raw_field) {
            continue;
        }
        let id = td.text(&plan.id_field)?;
        let Some(message) = messages.get(id) else {
            continue;
        };
        if message.text != td.text(&plan.raw_field)? {
            return Err(Error::inconsistency(
                &plan.id_field,
                td.uid(),
                format!("Coda message {} has different text", id),
            ));
        }

        let mut delta = BTreeMap::new();
        for cc in &plan.coding_configurations {
            if let Some(value) = coded_value(message, cc)? {
                delta.insert(cc.coded_field.clone(), value);
            }
        }
        if !delta.is_empty() {
            labelled += 1;
            td.append_data(delta, Metadata::new(user));
        }
    }
    Ok(labelled)
}

/// Apply the checked labels of every plan's Coda dataset under `coded_dir`.
///
/// Plans without a Coda file are skipped with a warning.
pub fn apply_manual_labels(user: &str, data: &mut [TracedData], plans: &CodingPlans, coded_dir: &Path) -> Result<()> {
    for plan in plans.all() {
        let path = coded_dir.join(&plan.coda_filename);
        if !path.exists() {
            warn!("No Coda file for {} at {}, skipping", plan.raw_field, path.display());
            continue;
        }
        let messages = load_coda_messages(&path)?;
        let labelled = apply_plan(user, data, plan, &messages)?;
        info!("Applied manual labels to {} {} responses", labelled, plan.raw_field);
    }
    Ok(())
}
