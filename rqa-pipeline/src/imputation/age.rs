//! Age category imputation

use rqa_common::traced_data::{FieldValue, Label, Metadata, TracedData};
use rqa_common::{CodeType, CodingConfiguration, Error, Result};
use tracing::info;

/// Inclusive age ranges and the match value of their age category code
pub const AGE_CATEGORIES: [(i64, i64, &str); 5] = [
    (0, 13, "0 to 13"),
    (14, 17, "14 to 17"),
    (18, 34, "18 to 34"),
    (35, 53, "35 to 53"),
    (54, 99, "54 to 99"),
];

/// Category match value for an age, if any range claims it
pub fn age_category(age: i64) -> Option<&'static str> {
    AGE_CATEGORIES
        .iter()
        .find(|(low, high, _)| (*low..=*high).contains(&age))
        .map(|(_, _, category)| *category)
}

/// Derive `age_category_coded` from `age_coded`.
///
/// Normal ages are bucketed by numeric value; control and meta codes are
/// copied across to the category scheme unchanged.
pub fn impute_age_category(
    user: &str,
    data: &mut [TracedData],
    age_cc: &CodingConfiguration,
    age_category_cc: &CodingConfiguration,
) -> Result<()> {
    for td in data.iter_mut() {
        let age_label = td.label(&age_cc.coded_field)?;
        let age_code = age_cc.code_scheme.code_with_id(&age_label.code_id)?;
        let category_scheme = &age_category_cc.code_scheme;

        let category_code = match age_code.code_type {
            CodeType::Normal => {
                let age = age_code.numeric_value.ok_or_else(|| {
                    Error::inconsistency(
                        &age_cc.coded_field,
                        td.uid(),
                        format!("normal age code '{}' has no numeric value", age_code.code_id),
                    )
                })?;
                let category = age_category(age).ok_or_else(|| {
                    Error::inconsistency(
                        &age_cc.coded_field,
                        td.uid(),
                        format!("age {} is outside every age category", age),
                    )
                })?;
                category_scheme.code_with_match_value(category)?
            }
            CodeType::Meta => {
                let meta_code = age_code.meta_code.as_deref().unwrap_or_default();
                category_scheme.code_with_meta_code(meta_code)?
            }
            CodeType::Control => match age_code.control_code {
                Some(control_code) => category_scheme.code_with_control_code(control_code)?,
                None => {
                    return Err(Error::inconsistency(
                        &age_cc.coded_field,
                        td.uid(),
                        format!("control code '{}' has no control value", age_code.code_id),
                    ))
                }
            },
        };

        let label = FieldValue::Label(Label::automatic(category_scheme, category_code));
        td.append_field(&age_category_cc.coded_field, label, Metadata::new(user));
    }

    info!("Imputed age categories for {} records", data.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_age_has_exactly_one_category() {
        for age in 0..=99 {
            let claims = AGE_CATEGORIES
                .iter()
                .filter(|(low, high, _)| (*low..=*high).contains(&age))
                .count();
            assert_eq!(claims, 1, "age {} claimed by {} categories", age, claims);
        }
    }

    #[test]
    fn test_out_of_range_ages_have_no_category() {
        assert_eq!(age_category(-1), None);
        assert_eq!(age_category(100), None);
        assert_eq!(age_category(13), Some("0 to 13"));
        assert_eq!(age_category(54), Some("54 to 99"));
    }
}
