//! Shared fixtures for unit tests

use rqa_common::codes::ControlCode;
use rqa_common::traced_data::{FieldValue, Label, Metadata, Origin, TracedData};
use rqa_common::{Code, CodeScheme, CodeSchemeRegistry, CodeType, CodingPlans};

pub fn normal(id: &str, value: &str) -> Code {
    Code {
        code_id: id.to_string(),
        code_type: CodeType::Normal,
        control_code: None,
        meta_code: None,
        display_text: value.to_string(),
        string_value: value.to_string(),
        numeric_value: None,
        match_values: vec![value.to_string()],
    }
}

pub fn control(id: &str, control_code: ControlCode) -> Code {
    Code {
        code_id: id.to_string(),
        code_type: CodeType::Control,
        control_code: Some(control_code),
        meta_code: None,
        display_text: control_code.to_string(),
        string_value: control_code.to_string(),
        numeric_value: None,
        match_values: Vec::new(),
    }
}

/// Scheme with the given normal codes followed by NR, NA, NC, STOP and CE
pub fn scheme_with_controls(scheme_id: &str, prefix: &str, normals: Vec<Code>) -> CodeScheme {
    let mut codes = normals;
    for control_code in [
        ControlCode::NotReviewed,
        ControlCode::TrueMissing,
        ControlCode::NotCoded,
        ControlCode::Stop,
        ControlCode::CodingError,
    ] {
        codes.push(control(&format!("{}-{}", prefix, control_code), control_code));
    }
    CodeScheme::new(scheme_id, prefix, "1", codes).unwrap()
}

pub fn registry() -> CodeSchemeRegistry {
    let mut registry = CodeSchemeRegistry::new();
    registry
        .insert(
            "reasons",
            scheme_with_controls("Scheme-reasons", "reasons", vec![normal("A", "a"), normal("B", "b")]),
        )
        .unwrap();
    registry
        .insert(
            "gender",
            scheme_with_controls(
                "Scheme-gender",
                "gender",
                vec![normal("gender-M", "male"), normal("gender-F", "female")],
            ),
        )
        .unwrap();
    registry
        .insert(
            "have_voice",
            scheme_with_controls(
                "Scheme-have-voice",
                "have_voice",
                vec![
                    normal("hv-yes", "yes"),
                    normal("hv-no", "no"),
                    normal("hv-amb", "ambivalent"),
                ],
            ),
        )
        .unwrap();
    registry
}

pub const PLANS: &str = r#"
    [[rqa_coding_plans]]
    raw_field = "rqa_s04e01_raw"
    time_field = "sent_on"
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
    time_field = "sent_on"
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
    raw_field = "have_voice_raw"
    coda_filename = "have_voice.json"
    raw_field_folding_mode = "ASSERT_EQUAL"

    [[survey_coding_plans.coding_configurations]]
    coding_mode = "SINGLE"
    code_scheme = "have_voice"
    coded_field = "have_voice_coded"
    analysis_file_key = "have_voice"
    folding_mode = "YES_NO_AMB"
"#;

pub fn plans() -> CodingPlans {
    CodingPlans::from_toml_str(PLANS, &registry()).unwrap()
}

pub fn record(fields: &[(&str, FieldValue)]) -> TracedData {
    let values = fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    TracedData::new(values, Metadata::new("test"))
}

/// Manually checked label with a fixed timestamp
pub fn scheme_label(scheme_id: &str, code_id: &str) -> Label {
    label_at(scheme_id, code_id, "2019-11-01T00:00:00.000000+00:00")
}

pub fn label_at(scheme_id: &str, code_id: &str, date_time_utc: &str) -> Label {
    Label {
        scheme_id: scheme_id.to_string(),
        code_id: code_id.to_string(),
        date_time_utc: date_time_utc.to_string(),
        origin: Origin {
            origin_id: "coder-1".to_string(),
            name: "Coder".to_string(),
            origin_type: "Manual".to_string(),
        },
        checked: true,
    }
}
