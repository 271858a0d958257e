//! Theme cross-tabulation: theme label occurrences per show, split by demographic
//!
//! Counted over opted-in messages. Every NORMAL theme label counts once, so
//! a message with two themes adds to both. The "Total" group counts every
//! occurrence; the demographic groups count occurrences from messages whose
//! sender holds that NORMAL demographic code. Messages with no demographic
//! label for a question only count towards "Total".

use crate::dataset::{codes, demographic_configurations, opted_in, participated, plan_codes};
use crate::engagement::TOTAL;
use crate::report::Table;
use rqa_common::traced_data::TracedData;
use rqa_common::{CodingPlan, CodingPlans, Result};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeRow {
    #[serde(rename = "Episode")]
    pub episode: String,
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Theme")]
    pub theme: String,
    #[serde(rename = "Count")]
    pub count: usize,
}

impl Table for ThemeRow {
    const HEADERS: &'static [&'static str] = &["Episode", "Group", "Theme", "Count"];
}

/// (group, theme code id) -> occurrences
type Counts = HashMap<(String, String), usize>;

fn count_show(messages: &[TracedData], plan: &CodingPlan, plans: &CodingPlans) -> Result<Counts> {
    let demographics = demographic_configurations(plans);
    let mut counts = Counts::new();

    for msg in messages {
        if !opted_in(msg)? || !participated(msg, plan) {
            continue;
        }

        let mut groups = vec![TOTAL.to_string()];
        for cc in &demographics {
            let key = cc.analysis_file_key.as_deref().unwrap_or(&cc.coded_field);
            for code in codes(msg, cc)? {
                if code.is_normal() {
                    groups.push(format!("{}: {}", key, code.string_value));
                }
            }
        }

        for theme in plan_codes(msg, plan)?.into_iter().filter(|c| c.is_normal()) {
            for group in &groups {
                *counts.entry((group.clone(), theme.code_id.clone())).or_default() += 1;
            }
        }
    }

    Ok(counts)
}

/// One row per (show, group, theme), groups and themes in scheme order
pub fn theme_distributions(messages: &[TracedData], plans: &CodingPlans) -> Result<Vec<ThemeRow>> {
    let mut groups = vec![TOTAL.to_string()];
    for cc in demographic_configurations(plans) {
        let key = cc.analysis_file_key.as_deref().unwrap_or(&cc.coded_field);
        groups.extend(
            cc.code_scheme
                .codes()
                .iter()
                .filter(|code| code.is_normal())
                .map(|code| format!("{}: {}", key, code.string_value)),
        );
    }

    let mut rows = Vec::new();
    for plan in &plans.rqa {
        let counts = count_show(messages, plan, plans)?;
        for group in &groups {
            for cc in &plan.coding_configurations {
                for theme in cc.code_scheme.codes().iter().filter(|code| code.is_normal()) {
                    rows.push(ThemeRow {
                        episode: plan.raw_field.clone(),
                        group: group.clone(),
                        theme: theme.string_value.clone(),
                        count: counts
                            .get(&(group.clone(), theme.code_id.clone()))
                            .copied()
                            .unwrap_or(0),
                    });
                }
            }
        }
    }

    info!("Computed {} theme cross-tabulation rows", rows.len());
    Ok(rows)
}
