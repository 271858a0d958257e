//! Dropping messages outside the project or sent by test contacts

use chrono::{DateTime, FixedOffset};
use rqa_common::time::parse_iso;
use rqa_common::traced_data::{FieldValue, TracedData};
use rqa_common::{CodingPlan, Result};
use std::collections::HashSet;
use tracing::info;

/// Flag set on runs from test contacts
pub const TEST_RUN_KEY: &str = "test_run";

/// Contact id of the run's sender
pub const CONTACT_UUID_KEY: &str = "rapid_pro_contact_uuid";

/// Keep records whose activation messages were sent within `[start, end)`.
///
/// Only plans with a `time_field` are checked. Records with no activation
/// response are kept.
pub fn filter_project_window(
    data: Vec<TracedData>,
    rqa_plans: &[CodingPlan],
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> Result<Vec<TracedData>> {
    let before = data.len();
    let mut kept = Vec::with_capacity(before);

    'records: for td in data {
        for plan in rqa_plans {
            let Some(time_field) = &plan.time_field else {
                continue;
            };
            if !td.contains_key(&plan.raw_field) {
                continue;
            }
            let sent_on = parse_iso(td.text(time_field)?)?;
            if sent_on < start || sent_on >= end {
                continue 'records;
            }
        }
        kept.push(td);
    }

    info!(
        "Kept {}/{} records within project window {} to {}",
        kept.len(),
        before,
        start,
        end
    );
    Ok(kept)
}

/// Drop records flagged as test runs or sent by a test contact
pub fn filter_test_messages(data: Vec<TracedData>, test_contact_uuids: &[String]) -> Vec<TracedData> {
    let before = data.len();
    let test_contacts: HashSet<&str> = test_contact_uuids.iter().map(String::as_str).collect();

    let kept: Vec<TracedData> = data
        .into_iter()
        .filter(|td| {
            let test_run = matches!(td.get(TEST_RUN_KEY), Some(FieldValue::Bool(true)));
            let test_contact = matches!(
                td.get(CONTACT_UUID_KEY),
                Some(FieldValue::Text(uuid)) if test_contacts.contains(uuid.as_str())
            );
            !test_run && !test_contact
        })
        .collect();

    info!("Filtered out {} test messages", before - kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{plans, record};

    fn message(uid: &str, sent_on: &str) -> TracedData {
        record(&[
            ("uid", FieldValue::text(uid)),
            ("rqa_s04e01_raw", FieldValue::text("hello")),
            ("sent_on", FieldValue::text(sent_on)),
        ])
    }

    #[test]
    fn test_window_is_half_open() {
        let plans = plans();
        let start = parse_iso("2019-11-01T00:00:00+03:00").unwrap();
        let end = parse_iso("2019-12-01T00:00:00+03:00").unwrap();
        let data = vec![
            message("before", "2019-10-31T23:59:59+03:00"),
            message("start", "2019-11-01T00:00:00+03:00"),
            message("end", "2019-12-01T00:00:00+03:00"),
            // Same instant as the start, different offset
            message("utc", "2019-10-31T21:00:00+00:00"),
            record(&[("uid", FieldValue::text("survey-only"))]),
        ];

        let kept = filter_project_window(data, &plans.rqa, start, end).unwrap();
        let uids: Vec<&str> = kept.iter().map(|td| td.uid()).collect();
        assert_eq!(uids, vec!["start", "utc", "survey-only"]);
    }

    #[test]
    fn test_missing_timestamp_is_error() {
        let plans = plans();
        let start = parse_iso("2019-11-01T00:00:00+03:00").unwrap();
        let end = parse_iso("2019-12-01T00:00:00+03:00").unwrap();
        let data = vec![record(&[
            ("uid", FieldValue::text("u1")),
            ("rqa_s04e01_raw", FieldValue::text("hello")),
        ])];
        assert!(filter_project_window(data, &plans.rqa, start, end).is_err());
    }

    #[test]
    fn test_test_contacts_dropped() {
        let data = vec![
            record(&[("uid", FieldValue::text("u1")), (TEST_RUN_KEY, FieldValue::Bool(true))]),
            record(&[("uid", FieldValue::text("u2")), (CONTACT_UUID_KEY, FieldValue::text("c-test"))]),
            record(&[("uid", FieldValue::text("u3")), (CONTACT_UUID_KEY, FieldValue::text("c-real"))]),
        ];
        let kept = filter_test_messages(data, &["c-test".to_string()]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].uid(), "u3");
    }
}
