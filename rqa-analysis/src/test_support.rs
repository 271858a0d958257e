//! Shared fixtures for unit tests

use rqa_common::codes::{ControlCode, CONSENT_WITHDRAWN_KEY};
use rqa_common::traced_data::{FieldValue, Label, Metadata, Origin, TracedData};
use rqa_common::{Code, CodeScheme, CodeSchemeRegistry, CodeType, CodingPlans};

fn code(id: &str, value: &str, code_type: CodeType, control_code: Option<ControlCode>) -> Code {
    Code {
        code_id: id.to_string(),
        code_type,
        control_code,
        meta_code: None,
        display_text: value.to_string(),
        string_value: value.to_string(),
        numeric_value: None,
        match_values: Vec::new(),
    }
}

fn scheme(scheme_id: &str, prefix: &str, normals: &[(&str, &str)]) -> CodeScheme {
    let mut codes: Vec<Code> = normals
        .iter()
        .map(|(id, value)| code(id, value, CodeType::Normal, None))
        .collect();
    for control_code in [ControlCode::NotReviewed, ControlCode::TrueMissing, ControlCode::Stop] {
        codes.push(code(
            &format!("{}-{}", prefix, control_code),
            control_code.as_str(),
            CodeType::Control,
            Some(control_code),
        ));
    }
    CodeScheme::new(scheme_id, prefix, "1", codes).unwrap()
}

pub fn registry() -> CodeSchemeRegistry {
    let mut registry = CodeSchemeRegistry::new();
    registry
        .insert("reasons", scheme("Scheme-reasons", "reasons", &[("A", "a"), ("B", "b")]))
        .unwrap();
    registry
        .insert(
            "gender",
            scheme("Scheme-gender", "gender", &[("gender-M", "male"), ("gender-F", "female")]),
        )
        .unwrap();
    registry
        .insert(
            "location",
            scheme("Scheme-location", "location", &[("loc-mog", "mogadishu"), ("loc-har", "hargeisa")]),
        )
        .unwrap();
    registry
}

pub const PLANS: &str = r#"
    [[rqa_coding_plans]]
    raw_field = "rqa_s04e01_raw"
    coda_filename = "s04e01.json"
    raw_field_folding_mode = "CONCATENATE"

    [[rqa_coding_plans.coding_configurations]]
    coding_mode = "MULTIPLE"
    code_scheme = "reasons"
    coded_field = "rqa_s04e01_coded"
    analysis_file_key = "rqa_s04e01_"
    folding_mode = "MATRIX"

    [[rqa_coding_plans]]
    raw_field = "rqa_s04e02_raw"
    coda_filename = "s04e02.json"
    raw_field_folding_mode = "CONCATENATE"

    [[rqa_coding_plans.coding_configurations]]
    coding_mode = "MULTIPLE"
    code_scheme = "reasons"
    coded_field = "rqa_s04e02_coded"
    analysis_file_key = "rqa_s04e02_"
    folding_mode = "MATRIX"

    [[survey_coding_plans]]
    raw_field = "gender_raw"
    coda_filename = "gender.json"
    raw_field_folding_mode = "ASSERT_EQUAL"

    [[survey_coding_plans.coding_configurations]]
    coding_mode = "SINGLE"
    code_scheme = "gender"
    coded_field = "gender_coded"
    analysis_file_key = "gender"
    folding_mode = "ASSERT_EQUAL"

    [[survey_coding_plans]]
    raw_field = "location_raw"
    coda_filename = "location.json"
    raw_field_folding_mode = "ASSERT_EQUAL"

    [[survey_coding_plans.coding_configurations]]
    coding_mode = "SINGLE"
    code_scheme = "location"
    coded_field = "location_coded"
    analysis_file_key = "location"
    folding_mode = "ASSERT_EQUAL"

    [[survey_coding_plans]]
    raw_field = "notes_raw"
    coda_filename = "notes.json"
    raw_field_folding_mode = "ASSERT_EQUAL"

    [[survey_coding_plans.coding_configurations]]
    coding_mode = "SINGLE"
    code_scheme = "gender"
    coded_field = "notes_coded"
    folding_mode = "ASSERT_EQUAL"
"#;

pub fn plans() -> CodingPlans {
    CodingPlans::from_toml_str(PLANS, &registry()).unwrap()
}

pub fn record(fields: &[(&str, FieldValue)]) -> TracedData {
    let values = fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    TracedData::new(values, Metadata::new("test"))
}

pub fn label(scheme_id: &str, code_id: &str) -> Label {
    Label {
        scheme_id: scheme_id.to_string(),
        code_id: code_id.to_string(),
        date_time_utc: "2019-11-01T00:00:00.000000+00:00".to_string(),
        origin: Origin {
            origin_id: "coder-1".to_string(),
            name: "Coder".to_string(),
            origin_type: "Manual".to_string(),
        },
        checked: true,
    }
}

pub fn reasons(code_ids: &[&str]) -> FieldValue {
    FieldValue::Labels(code_ids.iter().map(|id| label("Scheme-reasons", id)).collect())
}

/// Opted-in record with a uid and the given fields
pub fn respondent(uid: &str, fields: &[(&str, FieldValue)]) -> TracedData {
    let mut all = vec![
        ("uid", FieldValue::text(uid)),
        (CONSENT_WITHDRAWN_KEY, FieldValue::Bool(false)),
    ];
    all.extend(fields.iter().cloned());
    record(&all)
}

pub fn withdrawn(uid: &str) -> TracedData {
    record(&[
        ("uid", FieldValue::text(uid)),
        (CONSENT_WITHDRAWN_KEY, FieldValue::Bool(true)),
    ])
}
