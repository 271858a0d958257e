//! Accessors shared by the analyses

use rqa_common::codes::CONSENT_WITHDRAWN_KEY;
use rqa_common::traced_data::{FieldValue, TracedData};
use rqa_common::{Code, CodingConfiguration, CodingMode, CodingPlan, CodingPlans, Error, Result};

/// True unless the respondent withdrew consent
pub fn opted_in(td: &TracedData) -> Result<bool> {
    Ok(!td.flag(CONSENT_WITHDRAWN_KEY)?)
}

/// True if the record holds a response to the plan's question.
///
/// Redacted records also hold one; callers filter on [`opted_in`] first.
pub fn participated(td: &TracedData, plan: &CodingPlan) -> bool {
    td.contains_key(&plan.raw_field)
}

/// Codes assigned under one configuration; none if the field is absent
pub fn codes<'a>(td: &TracedData, cc: &'a CodingConfiguration) -> Result<Vec<&'a Code>> {
    let code_ids: Vec<&str> = match td.get(&cc.coded_field) {
        None => Vec::new(),
        Some(FieldValue::Label(label)) => vec![label.code_id.as_str()],
        Some(FieldValue::Labels(labels)) => labels.iter().map(|l| l.code_id.as_str()).collect(),
        Some(other) => {
            return Err(Error::UnexpectedValue {
                field: cc.coded_field.clone(),
                expected: format!("label or labels, found {}", other.kind()),
            })
        }
    };
    code_ids
        .into_iter()
        .map(|id| cc.code_scheme.code_with_id(id))
        .collect()
}

/// Codes assigned under every configuration of a plan
pub fn plan_codes<'a>(td: &TracedData, plan: &'a CodingPlan) -> Result<Vec<&'a Code>> {
    let mut all = Vec::new();
    for cc in &plan.coding_configurations {
        all.extend(codes(td, cc)?);
    }
    Ok(all)
}

/// Exported single-coded survey configurations, in plan order
pub fn demographic_configurations(plans: &CodingPlans) -> Vec<&CodingConfiguration> {
    plans
        .survey
        .iter()
        .flat_map(|plan| plan.coding_configurations.iter())
        .filter(|cc| cc.coding_mode == CodingMode::Single && cc.analysis_file_key.is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{label, plans, record};

    #[test]
    fn test_stop_text_answer_is_participation() {
        let plans = plans();
        let plan = &plans.rqa[0];
        assert!(participated(&record(&[("rqa_s04e01_raw", FieldValue::text("hi"))]), plan));
        // Someone who literally wrote "STOP" but was not coded STOP still answered
        assert!(participated(&record(&[("rqa_s04e01_raw", FieldValue::text("STOP"))]), plan));
        assert!(!participated(&record(&[]), plan));
    }

    #[test]
    fn test_codes_of_redacted_field_is_error() {
        let plans = plans();
        let cc = &plans.survey[0].coding_configurations[0];
        let redacted = record(&[("gender_coded", FieldValue::text("STOP"))]);
        assert!(codes(&redacted, cc).is_err());

        let coded = record(&[("gender_coded", FieldValue::Label(label("Scheme-gender", "gender-F")))]);
        let found = codes(&coded, cc).unwrap();
        assert_eq!(found[0].string_value, "female");
    }

    #[test]
    fn test_demographic_configurations_skip_unexported() {
        let plans = plans();
        let keys: Vec<&str> = demographic_configurations(&plans)
            .iter()
            .filter_map(|cc| cc.analysis_file_key.as_deref())
            .collect();
        assert_eq!(keys, vec!["gender", "location"]);
    }
}
