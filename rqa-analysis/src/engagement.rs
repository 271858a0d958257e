//! Engagement counts per radio show and for the whole season
//!
//! Messages are counted from the message-level dataset and participants
//! from the folded individual-level dataset. Only opted-in records count.
//!
//! - A message is *labelled* once none of its codes is NOT_REVIEWED.
//! - A message is *relevant* when every code it carries is NORMAL. Codes of
//!   one message must all share a code type; a mixture means the labelling
//!   is inconsistent and stops the analysis.
//! - A participant is relevant to a show when any of their folded codes for
//!   it is NORMAL.

use crate::dataset::{opted_in, participated, plan_codes};
use crate::percentage::Percentage;
use crate::report::Table;
use rqa_common::codes::ControlCode;
use rqa_common::traced_data::TracedData;
use rqa_common::{CodeType, CodingPlan, CodingPlans, Error, Result};
use serde::Serialize;
use tracing::{debug, info};

pub const TOTAL: &str = "Total";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagementRow {
    #[serde(rename = "Episode")]
    pub episode: String,
    #[serde(rename = "Total Messages")]
    pub total_messages: usize,
    #[serde(rename = "Labelled Messages")]
    pub labelled_messages: usize,
    #[serde(rename = "Relevant Messages")]
    pub relevant_messages: usize,
    #[serde(rename = "% Relevant Messages")]
    pub relevant_messages_percent: Option<Percentage>,
    #[serde(rename = "Total Participants")]
    pub total_participants: usize,
    #[serde(rename = "Relevant Participants")]
    pub relevant_participants: usize,
    #[serde(rename = "% Relevant Participants")]
    pub relevant_participants_percent: Option<Percentage>,
}

impl Table for EngagementRow {
    const HEADERS: &'static [&'static str] = &[
        "Episode",
        "Total Messages",
        "Labelled Messages",
        "Relevant Messages",
        "% Relevant Messages",
        "Total Participants",
        "Relevant Participants",
        "% Relevant Participants",
    ];
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    total_messages: usize,
    labelled_messages: usize,
    relevant_messages: usize,
    total_participants: usize,
    relevant_participants: usize,
}

impl Tally {
    fn into_row(self, episode: &str) -> EngagementRow {
        EngagementRow {
            episode: episode.to_string(),
            total_messages: self.total_messages,
            labelled_messages: self.labelled_messages,
            relevant_messages: self.relevant_messages,
            relevant_messages_percent: Percentage::of(self.relevant_messages, self.total_messages),
            total_participants: self.total_participants,
            relevant_participants: self.relevant_participants,
            relevant_participants_percent: Percentage::of(self.relevant_participants, self.total_participants),
        }
    }
}

/// Whether a message is labelled and whether it is relevant
fn classify_message(td: &TracedData, plan: &CodingPlan) -> Result<(bool, bool)> {
    let codes = plan_codes(td, plan)?;
    let Some(first) = codes.first() else {
        return Err(Error::inconsistency(
            &plan.raw_field,
            td.uid(),
            "message has no codes under any configuration",
        ));
    };

    let code_type = first.code_type;
    if let Some(other) = codes.iter().find(|c| c.code_type != code_type) {
        return Err(Error::inconsistency(
            &plan.raw_field,
            td.uid(),
            format!(
                "message has codes of mixed types ({} is {:?}, {} is {:?})",
                first.code_id, code_type, other.code_id, other.code_type
            ),
        ));
    }

    let labelled = !codes.iter().any(|c| c.is_control(ControlCode::NotReviewed));
    Ok((labelled, code_type == CodeType::Normal))
}

fn relevant_participant(td: &TracedData, plan: &CodingPlan) -> Result<bool> {
    Ok(plan_codes(td, plan)?.iter().any(|c| c.is_normal()))
}

/// One row per radio show, then the season total
pub fn engagement_counts(
    messages: &[TracedData],
    individuals: &[TracedData],
    plans: &CodingPlans,
) -> Result<Vec<EngagementRow>> {
    let mut tallies = vec![Tally::default(); plans.rqa.len()];
    let mut total = Tally::default();

    for msg in messages {
        if !opted_in(msg)? {
            continue;
        }
        for (plan, tally) in plans.rqa.iter().zip(tallies.iter_mut()) {
            if !participated(msg, plan) {
                continue;
            }
            let (labelled, relevant) = classify_message(msg, plan)?;
            tally.total_messages += 1;
            total.total_messages += 1;
            if labelled {
                tally.labelled_messages += 1;
                total.labelled_messages += 1;
            }
            if relevant {
                tally.relevant_messages += 1;
                total.relevant_messages += 1;
            }
        }
    }

    for ind in individuals {
        if !opted_in(ind)? {
            continue;
        }
        let mut participated_any = false;
        let mut relevant_any = false;
        for (plan, tally) in plans.rqa.iter().zip(tallies.iter_mut()) {
            if !participated(ind, plan) {
                continue;
            }
            participated_any = true;
            tally.total_participants += 1;
            if relevant_participant(ind, plan)? {
                relevant_any = true;
                tally.relevant_participants += 1;
            }
        }
        if participated_any {
            total.total_participants += 1;
        }
        if relevant_any {
            total.relevant_participants += 1;
        }
    }

    let mut rows: Vec<EngagementRow> = plans
        .rqa
        .iter()
        .zip(tallies)
        .map(|(plan, tally)| {
            debug!(episode = %plan.raw_field, ?tally, "Engagement");
            tally.into_row(&plan.raw_field)
        })
        .collect();
    rows.push(total.into_row(TOTAL));

    info!(
        "Computed engagement: {} messages ({} relevant), {} participants",
        total.total_messages, total.relevant_messages, total.total_participants
    );
    Ok(rows)
}
