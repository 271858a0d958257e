//! Folding: one record per respondent from many per-message records
//!
//! Records are grouped by the fold key (`uid`) in first-seen order. Each
//! group becomes one record whose history has every member as a parent, and
//! whose fields are merged by the strategy configured for that field.
//!
//! Fields without a configured strategy follow the plan's [`Unlisted`]
//! policy. Assert-equal comparisons treat an absent field as its own value,
//! so a field present in one member and absent in another is a mismatch.

use rqa_common::codes::{ControlCode, CONCATENATE_SEPARATOR, MATRIX_0, MATRIX_1};
use rqa_common::traced_data::{FieldValue, Label, Metadata, TracedData, UID_KEY};
use rqa_common::{CodeScheme, CodingConfiguration, Error, FoldingMode, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// How one field merges across the members of a group
#[derive(Debug, Clone)]
pub enum FoldStrategy {
    /// Every member must hold the same value; labels compare by scheme and code id
    AssertEqual,
    /// True if any member is true; absent counts as false
    BooleanOr,
    /// Best answer of a yes/no/ambivalent question
    YesNoAmb(Arc<CodeScheme>),
    /// Non-empty texts joined in member order
    Concatenate,
    /// Union of label lists, or boolean-or of "1"/"0" matrix cells
    Matrix(Arc<CodeScheme>),
}

impl FoldStrategy {
    pub fn for_configuration(cc: &CodingConfiguration) -> Self {
        Self::for_mode(cc.folding_mode, &cc.code_scheme)
    }

    /// Strategy for a raw text field
    pub fn for_raw_field(mode: FoldingMode) -> Self {
        match mode {
            FoldingMode::Concatenate => FoldStrategy::Concatenate,
            _ => FoldStrategy::AssertEqual,
        }
    }

    fn for_mode(mode: FoldingMode, scheme: &Arc<CodeScheme>) -> Self {
        match mode {
            FoldingMode::AssertEqual => FoldStrategy::AssertEqual,
            FoldingMode::YesNoAmb => FoldStrategy::YesNoAmb(Arc::clone(scheme)),
            FoldingMode::Concatenate => FoldStrategy::Concatenate,
            FoldingMode::Matrix => FoldStrategy::Matrix(Arc::clone(scheme)),
        }
    }
}

/// Policy for fields that have no configured strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unlisted {
    #[default]
    AssertEqual,
    /// Dropped from the folded record
    Discard,
}

#[derive(Debug, Clone, Default)]
pub struct FoldPlan {
    strategies: BTreeMap<String, FoldStrategy>,
    unlisted: Unlisted,
}

impl FoldPlan {
    pub fn new(unlisted: Unlisted) -> Self {
        Self {
            strategies: BTreeMap::new(),
            unlisted,
        }
    }

    pub fn with(mut self, field: impl Into<String>, strategy: FoldStrategy) -> Self {
        self.strategies.insert(field.into(), strategy);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, strategy: FoldStrategy) {
        self.strategies.insert(field.into(), strategy);
    }

    pub fn strategy(&self, field: &str) -> Option<&FoldStrategy> {
        self.strategies.get(field)
    }
}

/// Fold records into one record per `uid`, in order of each uid's first record
pub fn fold_by_uid(user: &str, data: &[TracedData], plan: &FoldPlan) -> Result<Vec<TracedData>> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&TracedData>> = HashMap::new();

    for td in data {
        let uid = td.text(UID_KEY)?;
        groups
            .entry(uid)
            .or_insert_with(|| {
                order.push(uid);
                Vec::new()
            })
            .push(td);
    }

    let mut folded = Vec::with_capacity(order.len());
    for uid in order {
        let members = &groups[uid];
        let values = fold_values(uid, members, plan)?;
        folded.push(TracedData::fold(members.iter().copied(), values, Metadata::new(user)));
    }

    info!("Folded {} records into {} respondents", data.len(), folded.len());
    Ok(folded)
}

fn fold_values(
    uid: &str,
    members: &[&TracedData],
    plan: &FoldPlan,
) -> Result<BTreeMap<String, FieldValue>> {
    let keys: BTreeSet<&str> = members.iter().flat_map(|td| td.keys()).collect();
    let mut values = BTreeMap::new();

    for key in keys {
        let strategy = plan.strategy(key);
        if key != UID_KEY && strategy.is_none() && plan.unlisted == Unlisted::Discard {
            continue;
        }

        let member_values: Vec<Option<&FieldValue>> = members.iter().map(|td| td.get(key)).collect();

        // A single record is copied as-is
        let value = if let [only] = member_values.as_slice() {
            only.cloned()
        } else {
            match strategy {
                _ if key == UID_KEY => member_values[0].cloned(),
                None | Some(FoldStrategy::AssertEqual) => assert_equal(key, uid, &member_values)?,
                Some(FoldStrategy::BooleanOr) => boolean_or(key, &member_values)?,
                Some(FoldStrategy::YesNoAmb(scheme)) => yes_no_amb(key, uid, scheme, &member_values)?,
                Some(FoldStrategy::Concatenate) => concatenate(key, &member_values)?,
                Some(FoldStrategy::Matrix(scheme)) => matrix(key, uid, scheme, &member_values)?,
            }
        };

        if let Some(value) = value {
            values.insert(key.to_string(), value);
        }
    }

    Ok(values)
}

fn same_content(a: Option<&FieldValue>, b: Option<&FieldValue>) -> bool {
    match (a, b) {
        (Some(FieldValue::Label(x)), Some(FieldValue::Label(y))) => same_label(x, y),
        (Some(FieldValue::Labels(xs)), Some(FieldValue::Labels(ys))) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_label(x, y))
        }
        _ => a == b,
    }
}

fn same_label(a: &Label, b: &Label) -> bool {
    a.scheme_id == b.scheme_id && a.code_id == b.code_id
}

fn describe(value: Option<&FieldValue>) -> String {
    match value {
        Some(value) => format!("'{}'", value.to_cell()),
        None => "<absent>".to_string(),
    }
}

fn assert_equal(key: &str, uid: &str, values: &[Option<&FieldValue>]) -> Result<Option<FieldValue>> {
    let first = values[0];
    if let Some(other) = values.iter().find(|v| !same_content(first, **v)) {
        return Err(Error::inconsistency(
            key,
            uid,
            format!("values differ: {} vs {}", describe(first), describe(*other)),
        ));
    }
    Ok(first.cloned())
}

fn boolean_or(key: &str, values: &[Option<&FieldValue>]) -> Result<Option<FieldValue>> {
    let mut any = false;
    for value in values.iter().flatten() {
        match value {
            FieldValue::Bool(flag) => any |= *flag,
            other => {
                return Err(Error::UnexpectedValue {
                    field: key.to_string(),
                    expected: format!("bool, found {}", other.kind()),
                })
            }
        }
    }
    Ok(Some(FieldValue::Bool(any)))
}

fn concatenate(key: &str, values: &[Option<&FieldValue>]) -> Result<Option<FieldValue>> {
    if values.iter().all(Option::is_none) {
        return Ok(None);
    }

    let mut parts = Vec::new();
    for value in values.iter().flatten() {
        match value {
            FieldValue::Text(text) if text.is_empty() => {}
            FieldValue::Text(text) => parts.push(text.as_str()),
            other => {
                return Err(Error::UnexpectedValue {
                    field: key.to_string(),
                    expected: format!("text, found {}", other.kind()),
                })
            }
        }
    }
    Ok(Some(FieldValue::Text(parts.join(CONCATENATE_SEPARATOR))))
}

/// Rank of a yes/no/ambivalent answer; higher wins
fn yes_no_amb_rank(scheme: &CodeScheme, label: &Label) -> Result<u8> {
    let code = scheme.code_with_id(&label.code_id)?;
    let rank = if code.is_normal() {
        match code.string_value.to_lowercase().as_str() {
            "yes" => 4,
            "no" => 2,
            _ => 3,
        }
    } else if code.is_control(ControlCode::Stop) {
        1
    } else {
        0
    };
    Ok(rank)
}

fn yes_no_amb(
    key: &str,
    uid: &str,
    scheme: &CodeScheme,
    values: &[Option<&FieldValue>],
) -> Result<Option<FieldValue>> {
    let mut best: Option<(u8, &Label)> = None;

    for value in values.iter().flatten() {
        let label = match value {
            FieldValue::Label(label) => label,
            other => {
                return Err(Error::UnexpectedValue {
                    field: key.to_string(),
                    expected: format!("label, found {}", other.kind()),
                })
            }
        };
        let rank = yes_no_amb_rank(scheme, label)?;
        best = match best {
            Some((best_rank, best_label))
                if best_rank > rank
                    || (best_rank == rank && best_label.date_time_utc <= label.date_time_utc) =>
            {
                Some((best_rank, best_label))
            }
            _ => Some((rank, label)),
        };
    }

    if let Some((rank, label)) = best {
        debug!(uid, field = key, code_id = %label.code_id, rank, "Folded yes/no/ambivalent answer");
    }
    Ok(best.map(|(_, label)| FieldValue::Label(label.clone())))
}

fn matrix(
    key: &str,
    uid: &str,
    scheme: &CodeScheme,
    values: &[Option<&FieldValue>],
) -> Result<Option<FieldValue>> {
    let present: Vec<&FieldValue> = values.iter().flatten().copied().collect();
    let Some(first) = present.first() else {
        return Ok(None);
    };

    match first {
        FieldValue::Labels(_) => {
            // Earliest label per code id
            let mut union: BTreeMap<usize, Label> = BTreeMap::new();
            for value in &present {
                let FieldValue::Labels(labels) = value else {
                    return Err(mixed_matrix(key, uid));
                };
                for label in labels {
                    let position = scheme.position(&label.code_id).ok_or_else(|| Error::UnknownCode {
                        scheme_id: scheme.scheme_id().to_string(),
                        lookup: format!("id '{}'", label.code_id),
                    })?;
                    match union.get(&position) {
                        Some(existing) if existing.date_time_utc <= label.date_time_utc => {}
                        _ => {
                            union.insert(position, label.clone());
                        }
                    }
                }
            }

            // A missing answer in one message says nothing once another message answered
            if union.len() > 1 {
                union.retain(|position, _| !scheme.codes()[*position].is_control(ControlCode::TrueMissing));
            }
            Ok(Some(FieldValue::Labels(union.into_values().collect())))
        }
        FieldValue::Text(_) => {
            let mut any = false;
            for value in &present {
                match value {
                    FieldValue::Text(text) if text == MATRIX_1 => any = true,
                    FieldValue::Text(text) if text == MATRIX_0 => {}
                    _ => return Err(mixed_matrix(key, uid)),
                }
            }
            let cell = if any { MATRIX_1 } else { MATRIX_0 };
            Ok(Some(FieldValue::text(cell)))
        }
        other => Err(Error::UnexpectedValue {
            field: key.to_string(),
            expected: format!("label list or matrix cell, found {}", other.kind()),
        }),
    }
}

fn mixed_matrix(key: &str, uid: &str) -> Error {
    Error::inconsistency(key, uid, "matrix field mixes label lists with other values")
}
