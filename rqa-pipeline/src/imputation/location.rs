//! Location hierarchy imputation
//!
//! Upstream review assigns at most one meaningful location code per record,
//! in whichever level of the hierarchy the respondent's answer matched. This
//! fills every other level from it.

use crate::locations::{LocationLevel, LocationTable};
use rqa_common::codes::ControlCode;
use rqa_common::traced_data::{FieldValue, Label, Metadata, TracedData};
use rqa_common::{Code, CodeScheme, CodeType, CodingConfiguration, Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Value in the location table meaning "no value at this level"
const NOT_CODED_LOCATION: &str = "NC";

/// Single location code found across the hierarchy, or why there isn't one
#[derive(Debug, Clone)]
enum Found {
    Code(Code),
    Conflict,
    Nothing,
}

pub fn impute_somalia_location_codes(
    user: &str,
    data: &mut [TracedData],
    location_raw_field: &str,
    configurations: &[CodingConfiguration],
    operator: Option<&CodingConfiguration>,
    locations: &LocationTable,
) -> Result<()> {
    if configurations.len() != LocationLevel::ALL.len() {
        return Err(Error::Config(format!(
            "location imputation for '{}' needs {} configurations, found {}",
            location_raw_field,
            LocationLevel::ALL.len(),
            configurations.len()
        )));
    }

    let mut from_operator = 0;
    for td in data.iter_mut() {
        let found = find_location_code(td, configurations)?;
        let delta = match found {
            Found::Nothing => propagate_control(configurations, ControlCode::NotReviewed)?,
            Found::Conflict => {
                debug!(uid = td.uid(), "Conflicting location codes; marking hierarchy as coding error");
                propagate_control(configurations, ControlCode::CodingError)?
            }
            Found::Code(code) => match code.code_type {
                CodeType::Control => match code.control_code {
                    Some(control_code) => propagate_control(configurations, control_code)?,
                    None => unreachable_code(&code, td)?,
                },
                CodeType::Meta => match &code.meta_code {
                    Some(meta_code) => propagate_meta(configurations, meta_code)?,
                    None => unreachable_code(&code, td)?,
                },
                CodeType::Normal => derive_hierarchy(configurations, &code, locations)?,
            },
        };
        td.append_data(delta, Metadata::new(user));

        if !td.contains_key(location_raw_field) {
            if let Some(operator) = operator {
                if impute_zone_from_operator(user, td, operator, &configurations[4], locations)? {
                    from_operator += 1;
                }
            }
        }
    }

    info!(
        "Imputed location hierarchy for {} records ({} zones from operator)",
        data.len(),
        from_operator
    );
    Ok(())
}

fn find_location_code(td: &TracedData, configurations: &[CodingConfiguration]) -> Result<Found> {
    let mut found = Found::Nothing;

    for cc in configurations {
        let label = td.label(&cc.coded_field)?;
        let code = cc.code_scheme.code_with_id(&label.code_id)?;
        if code.is_control(ControlCode::NotReviewed) {
            continue;
        }
        found = match found {
            Found::Nothing => Found::Code(code.clone()),
            Found::Code(existing) if existing.same_meaning(code) => Found::Code(existing),
            _ => Found::Conflict,
        };
    }
    Ok(found)
}

fn propagate_control(
    configurations: &[CodingConfiguration],
    control_code: ControlCode,
) -> Result<BTreeMap<String, FieldValue>> {
    configurations
        .iter()
        .map(|cc| -> Result<(String, FieldValue)> {
            let code = cc.code_scheme.code_with_control_code(control_code)?;
            Ok((cc.coded_field.clone(), label(&cc.code_scheme, code)))
        })
        .collect()
}

fn propagate_meta(
    configurations: &[CodingConfiguration],
    meta_code: &str,
) -> Result<BTreeMap<String, FieldValue>> {
    configurations
        .iter()
        .map(|cc| -> Result<(String, FieldValue)> {
            let code = cc.code_scheme.code_with_meta_code(meta_code)?;
            Ok((cc.coded_field.clone(), label(&cc.code_scheme, code)))
        })
        .collect()
}

fn derive_hierarchy(
    configurations: &[CodingConfiguration],
    code: &Code,
    locations: &LocationTable,
) -> Result<BTreeMap<String, FieldValue>> {
    let location = code.match_values.first().ok_or_else(|| {
        Error::Config(format!("location code '{}' has no match values", code.code_id))
    })?;

    configurations
        .iter()
        .zip(LocationLevel::ALL)
        .map(|(cc, level)| -> Result<(String, FieldValue)> {
            let value = locations.value_at(location, level)?;
            let level_code = location_code(&cc.code_scheme, value)?;
            Ok((cc.coded_field.clone(), label(&cc.code_scheme, level_code)))
        })
        .collect()
}

fn impute_zone_from_operator(
    user: &str,
    td: &mut TracedData,
    operator_cc: &CodingConfiguration,
    zone_configuration: &CodingConfiguration,
    locations: &LocationTable,
) -> Result<bool> {
    let operator_label = td.label(&operator_cc.coded_field)?;
    let operator = operator_cc.code_scheme.code_with_id(&operator_label.code_id)?;
    if !operator.is_normal() {
        return Ok(false);
    }

    let zone = locations.zone_for_operator(&operator.string_value)?;
    let zone_code = location_code(&zone_configuration.code_scheme, zone)?;
    let value = label(&zone_configuration.code_scheme, zone_code);
    td.append_field(&zone_configuration.coded_field, value, Metadata::new(user));
    Ok(true)
}

fn location_code<'a>(scheme: &'a CodeScheme, value: &str) -> Result<&'a Code> {
    if value == NOT_CODED_LOCATION {
        scheme.code_with_control_code(ControlCode::NotCoded)
    } else {
        scheme.code_with_match_value(value)
    }
}

#[track_caller]
fn label(scheme: &CodeScheme, code: &Code) -> FieldValue {
    FieldValue::Label(Label::automatic(scheme, code))
}

fn unreachable_code<T>(code: &Code, td: &TracedData) -> Result<T> {
    Err(Error::inconsistency(
        "location",
        td.uid(),
        format!("code '{}' has no {:?} value", code.code_id, code.code_type),
    ))
}
