//! Code imputation: derived codes that are never labelled directly
//!
//! Runs after labels are present and before consent is determined, so a STOP
//! reached through imputation still withdraws the respondent.

pub mod age;
pub mod location;

pub use age::impute_age_category;
pub use location::impute_somalia_location_codes;

use crate::locations::LocationTable;
use rqa_common::traced_data::TracedData;
use rqa_common::{CodeImputation, CodingPlans, Error, Result};
use tracing::info;

/// Run every plan's imputation step over `data`
pub fn impute_codes(
    user: &str,
    data: &mut [TracedData],
    plans: &CodingPlans,
    locations: &LocationTable,
) -> Result<()> {
    for plan in plans.all() {
        let Some(imputation) = &plan.code_imputation else {
            continue;
        };
        info!("Imputing codes for {} ({:?})", plan.raw_field, imputation);

        match imputation {
            CodeImputation::SomaliaLocation {
                operator_coded_field,
            } => {
                let operator = match operator_coded_field {
                    Some(field) => Some(plans.configuration_for(field).ok_or_else(|| {
                        Error::Config(format!("operator coded field '{}' is not configured", field))
                    })?),
                    None => None,
                };
                impute_somalia_location_codes(
                    user,
                    data,
                    &plan.raw_field,
                    &plan.coding_configurations,
                    operator,
                    locations,
                )?;
            }
            CodeImputation::AgeCategory => match plan.coding_configurations.as_slice() {
                [age_cc, age_category_cc] => impute_age_category(user, data, age_cc, age_category_cc)?,
                _ => {
                    return Err(Error::Config(format!(
                        "plan '{}': age category imputation needs [age, age_category] configurations",
                        plan.raw_field
                    )))
                }
            },
        }
    }
    Ok(())
}
