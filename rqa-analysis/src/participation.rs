//! Repeat participation: how many shows each opted-in respondent took part in

use crate::dataset::{opted_in, participated};
use crate::percentage::Percentage;
use crate::report::Table;
use rqa_common::traced_data::TracedData;
use rqa_common::{CodingPlans, Error, Result};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipationRow {
    #[serde(rename = "Shows Participated In")]
    pub shows: usize,
    #[serde(rename = "Number of Individuals")]
    pub individuals: usize,
    #[serde(rename = "% of Individuals")]
    pub individuals_percent: Option<Percentage>,
}

impl Table for ParticipationRow {
    const HEADERS: &'static [&'static str] =
        &["Shows Participated In", "Number of Individuals", "% of Individuals"];
}

/// Histogram over 1..=K shows, where K is the number of radio show plans.
///
/// Every opted-in respondent must have taken part in at least one show.
pub fn repeat_participation(individuals: &[TracedData], plans: &CodingPlans) -> Result<Vec<ParticipationRow>> {
    let mut buckets = vec![0usize; plans.rqa.len()];
    let mut opted_in_count = 0usize;

    for ind in individuals {
        if !opted_in(ind)? {
            continue;
        }
        opted_in_count += 1;

        let shows = plans.rqa.iter().filter(|plan| participated(ind, plan)).count();
        if shows == 0 {
            return Err(Error::inconsistency(
                "rqa",
                ind.uid(),
                "opted-in respondent participated in no show",
            ));
        }
        buckets[shows - 1] += 1;
    }

    info!("Computed repeat participation for {} opted-in individuals", opted_in_count);
    Ok(buckets
        .into_iter()
        .enumerate()
        .map(|(i, count)| ParticipationRow {
            shows: i + 1,
            individuals: count,
            individuals_percent: Percentage::of(count, opted_in_count),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{plans, reasons, respondent, withdrawn};
    use rqa_common::FieldValue;

    #[test]
    fn test_histogram_sums_to_opted_in() {
        let plans = plans();
        let individuals = vec![
            respondent("u1", &[("rqa_s04e01_raw", FieldValue::text("a"))]),
            respondent(
                "u2",
                &[("rqa_s04e01_raw", FieldValue::text("a")), ("rqa_s04e02_raw", FieldValue::text("b"))],
            ),
            respondent("u3", &[("rqa_s04e02_raw", FieldValue::text("b"))]),
            withdrawn("u4"),
        ];
        let rows = repeat_participation(&individuals, &plans).unwrap();

        assert_eq!(rows.iter().map(|r| r.shows).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(rows[0].individuals, 2);
        assert_eq!(rows[1].individuals, 1);
        assert_eq!(rows.iter().map(|r| r.individuals).sum::<usize>(), 3);
        assert_eq!(rows[0].individuals_percent.unwrap().to_string(), "66.7");
    }

    #[test]
    fn test_opted_in_without_participation_aborts() {
        let plans = plans();
        let individuals = vec![respondent("u1", &[("gender_raw", FieldValue::text("male"))])];
        let err = repeat_participation(&individuals, &plans).unwrap_err();
        match err {
            Error::SchemeInconsistency { uid, .. } => assert_eq!(uid, "u1"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_opted_in_stop_text_counts_as_participation() {
        let plans = plans();
        let individuals = vec![respondent(
            "u1",
            &[
                ("rqa_s04e01_raw", FieldValue::text("STOP")),
                ("rqa_s04e01_coded", reasons(&["reasons-NR"])),
            ],
        )];
        let rows = repeat_participation(&individuals, &plans).unwrap();
        assert_eq!(rows[0].individuals, 1);
        assert_eq!(rows[0].individuals_percent.unwrap().to_string(), "100.0");
    }
}
