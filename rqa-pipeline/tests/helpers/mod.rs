//! Shared fixtures for rqa-pipeline integration tests
//!
//! A small project with two radio shows, a gender question, the five-level
//! location question with operator fallback, and an age question with age
//! category imputation.

#![allow(dead_code)]

use rqa_common::traced_data::{FieldValue, Label, Metadata, Origin, TracedData};
use rqa_common::{Code, CodeScheme, CodeSchemeRegistry, CodeType, CodingPlans, ControlCode};
use rqa_pipeline::LocationTable;

pub const USER: &str = "test-user";

const CONTROLS: [(&str, ControlCode); 5] = [
    ("NR", ControlCode::NotReviewed),
    ("NA", ControlCode::TrueMissing),
    ("NC", ControlCode::NotCoded),
    ("STOP", ControlCode::Stop),
    ("CE", ControlCode::CodingError),
];

pub fn normal(id: &str, value: &str, match_values: &[&str]) -> Code {
    Code {
        code_id: id.to_string(),
        code_type: CodeType::Normal,
        control_code: None,
        meta_code: None,
        display_text: value.to_string(),
        string_value: value.to_string(),
        numeric_value: None,
        match_values: match_values.iter().map(|v| v.to_string()).collect(),
    }
}

fn numeric(id: &str, age: i64) -> Code {
    let value = age.to_string();
    Code {
        numeric_value: Some(age),
        ..normal(id, &value, &[value.as_str()])
    }
}

fn meta(id: &str, meta_code: &str) -> Code {
    Code {
        code_id: id.to_string(),
        code_type: CodeType::Meta,
        control_code: None,
        meta_code: Some(meta_code.to_string()),
        display_text: meta_code.to_string(),
        string_value: meta_code.to_string(),
        numeric_value: None,
        match_values: Vec::new(),
    }
}

/// Scheme with the given normal codes followed by the standard control codes
pub fn scheme(scheme_id: &str, prefix: &str, mut codes: Vec<Code>) -> CodeScheme {
    for (suffix, control_code) in CONTROLS {
        codes.push(Code {
            code_id: format!("{}-{}", prefix, suffix),
            code_type: CodeType::Control,
            control_code: Some(control_code),
            meta_code: None,
            display_text: suffix.to_string(),
            string_value: suffix.to_string(),
            numeric_value: None,
            match_values: Vec::new(),
        });
    }
    CodeScheme::new(scheme_id, prefix, "0.0.1", codes).unwrap()
}

fn location_scheme(level: &str, places: &[&str]) -> CodeScheme {
    let mut codes: Vec<Code> = places
        .iter()
        .map(|place| normal(&format!("{}-{}", level, place), place, &[*place]))
        .collect();
    codes.push(meta(&format!("{}-push-back", level), "push_back"));
    scheme(&format!("Scheme-{}", level), level, codes)
}

pub fn registry() -> CodeSchemeRegistry {
    let mut registry = CodeSchemeRegistry::new();
    registry
        .insert(
            "reasons",
            scheme(
                "Scheme-reasons",
                "reasons",
                vec![normal("reasons-health", "health", &[]), normal("reasons-water", "water", &[])],
            ),
        )
        .unwrap();
    registry
        .insert(
            "gender",
            scheme(
                "Scheme-gender",
                "gender",
                vec![normal("gender-M", "male", &["male"]), normal("gender-F", "female", &["female"])],
            ),
        )
        .unwrap();
    registry
        .insert("mogadishu_sub_district", location_scheme("msd", &["hodan", "wadajir"]))
        .unwrap();
    registry
        .insert("district", location_scheme("district", &["mogadishu", "hargeisa"]))
        .unwrap();
    registry
        .insert("region", location_scheme("region", &["banadir", "woqooyi galbeed"]))
        .unwrap();
    registry
        .insert("state", location_scheme("state", &["banadir", "somaliland"]))
        .unwrap();
    registry
        .insert("zone", location_scheme("zone", &["scz", "nwz"]))
        .unwrap();
    registry
        .insert(
            "operator",
            scheme(
                "Scheme-operator",
                "operator",
                vec![normal("op-hormuud", "hormuud", &[]), normal("op-telesom", "telesom", &[])],
            ),
        )
        .unwrap();
    registry
        .insert(
            "age",
            scheme(
                "Scheme-age",
                "age",
                [12, 16, 23, 40, 60].iter().map(|age| numeric(&format!("age-{}", age), *age)).collect(),
            ),
        )
        .unwrap();
    registry
        .insert(
            "age_category",
            scheme(
                "Scheme-age-category",
                "age_category",
                ["0 to 13", "14 to 17", "18 to 34", "35 to 53", "54 to 99"]
                    .iter()
                    .map(|category| normal(&format!("ac-{}", category), category, &[*category]))
                    .collect(),
            ),
        )
        .unwrap();
    registry
}

pub const PLANS: &str = r#"
[[rqa_coding_plans]]
raw_field = "rqa_s01e01_raw"
time_field = "sent_on"
coda_filename = "s01e01.json"
raw_field_folding_mode = "CONCATENATE"

[[rqa_coding_plans.coding_configurations]]
coding_mode = "MULTIPLE"
code_scheme = "reasons"
coded_field = "rqa_s01e01_coded"
analysis_file_key = "rqa_s01e01_"
folding_mode = "MATRIX"

[[rqa_coding_plans]]
raw_field = "rqa_s01e02_raw"
time_field = "sent_on"
coda_filename = "s01e02.json"
raw_field_folding_mode = "CONCATENATE"

[[rqa_coding_plans.coding_configurations]]
coding_mode = "MULTIPLE"
code_scheme = "reasons"
coded_field = "rqa_s01e02_coded"
analysis_file_key = "rqa_s01e02_"
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
raw_field = "operator_raw"
coda_filename = "operator.json"
raw_field_folding_mode = "ASSERT_EQUAL"

[[survey_coding_plans.coding_configurations]]
coding_mode = "SINGLE"
code_scheme = "operator"
coded_field = "operator_coded"
analysis_file_key = "operator"
folding_mode = "ASSERT_EQUAL"

[[survey_coding_plans]]
raw_field = "location_raw"
coda_filename = "location.json"
raw_field_folding_mode = "ASSERT_EQUAL"
code_imputation = { kind = "somalia_location", operator_coded_field = "operator_coded" }

[[survey_coding_plans.coding_configurations]]
coding_mode = "SINGLE"
code_scheme = "mogadishu_sub_district"
coded_field = "mogadishu_sub_district_coded"
analysis_file_key = "mogadishu_sub_district"
folding_mode = "ASSERT_EQUAL"

[[survey_coding_plans.coding_configurations]]
coding_mode = "SINGLE"
code_scheme = "district"
coded_field = "district_coded"
analysis_file_key = "district"
folding_mode = "ASSERT_EQUAL"

[[survey_coding_plans.coding_configurations]]
coding_mode = "SINGLE"
code_scheme = "region"
coded_field = "region_coded"
analysis_file_key = "region"
folding_mode = "ASSERT_EQUAL"

[[survey_coding_plans.coding_configurations]]
coding_mode = "SINGLE"
code_scheme = "state"
coded_field = "state_coded"
analysis_file_key = "state"
folding_mode = "ASSERT_EQUAL"

[[survey_coding_plans.coding_configurations]]
coding_mode = "SINGLE"
code_scheme = "zone"
coded_field = "zone_coded"
analysis_file_key = "zone"
folding_mode = "ASSERT_EQUAL"

[[survey_coding_plans]]
raw_field = "age_raw"
coda_filename = "age.json"
raw_field_folding_mode = "ASSERT_EQUAL"
code_imputation = { kind = "age_category" }

[[survey_coding_plans.coding_configurations]]
coding_mode = "SINGLE"
code_scheme = "age"
coded_field = "age_coded"
analysis_file_key = "age"
folding_mode = "ASSERT_EQUAL"
cleaner = "age_with_range_filter"

[[survey_coding_plans.coding_configurations]]
coding_mode = "SINGLE"
code_scheme = "age_category"
coded_field = "age_category_coded"
analysis_file_key = "age_category"
folding_mode = "ASSERT_EQUAL"
"#;

pub const LOCATION_TABLE: &str = r#"{
    "Locations": {
        "hodan": {"MogadishuSubDistrict": "hodan", "District": "mogadishu",
                  "Region": "banadir", "State": "banadir", "Zone": "scz"},
        "wadajir": {"MogadishuSubDistrict": "wadajir", "District": "mogadishu",
                    "Region": "banadir", "State": "banadir", "Zone": "scz"},
        "mogadishu": {"MogadishuSubDistrict": "NC", "District": "mogadishu",
                      "Region": "banadir", "State": "banadir", "Zone": "scz"},
        "hargeisa": {"MogadishuSubDistrict": "NC", "District": "hargeisa",
                     "Region": "woqooyi galbeed", "State": "somaliland", "Zone": "nwz"}
    },
    "OperatorZones": {"hormuud": "scz", "telesom": "nwz"}
}"#;

/// Location coded fields, finest level first
pub const LOCATION_FIELDS: [&str; 5] = [
    "mogadishu_sub_district_coded",
    "district_coded",
    "region_coded",
    "state_coded",
    "zone_coded",
];

pub fn plans() -> CodingPlans {
    CodingPlans::from_toml_str(PLANS, &registry()).unwrap()
}

pub fn locations() -> LocationTable {
    LocationTable::from_json_str(LOCATION_TABLE).unwrap()
}

pub fn record(fields: &[(&str, FieldValue)]) -> TracedData {
    let values = fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
    TracedData::new(values, Metadata::new(USER))
}

/// Manually assigned label
pub fn label(scheme_id: &str, code_id: &str) -> Label {
    label_at(scheme_id, code_id, "2019-11-02T09:00:00.000000+00:00")
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

pub fn text(value: &str) -> FieldValue {
    FieldValue::text(value)
}

pub fn labels(scheme_id: &str, code_ids: &[&str]) -> FieldValue {
    FieldValue::Labels(code_ids.iter().map(|id| label(scheme_id, id)).collect())
}

pub fn single(scheme_id: &str, code_id: &str) -> FieldValue {
    FieldValue::Label(label(scheme_id, code_id))
}

/// One radio show message
pub fn message(uid: &str, show: &str, raw: &str, sent_on: &str, code_ids: &[&str]) -> TracedData {
    let raw_field = format!("rqa_{}_raw", show);
    let coded_field = format!("rqa_{}_coded", show);
    record(&[
        ("uid", text(uid)),
        (raw_field.as_str(), text(raw)),
        ("sent_on", text(sent_on)),
        (coded_field.as_str(), labels("Scheme-reasons", code_ids)),
    ])
}
