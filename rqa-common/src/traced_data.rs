//! Traced data: records with append-only provenance
//!
//! A [`TracedData`] is the current value of a record (field name → value)
//! plus the history that produced it. History is a DAG of immutable
//! [`HistoryNode`]s shared through `Arc`:
//!
//! - `append_data` pushes a new node whose only parent is the previous head.
//!   Clones taken before the append keep pointing at the old head, so they
//!   never observe later appends.
//! - `fold` creates a node whose parents are the heads of every folded record.
//!
//! Replay rule: a node with no parents starts from its delta, a node with one
//! parent applies its delta on top of the parent's values, a node with
//! several parents (a fold) holds the complete folded values in its delta.

use crate::code_scheme::{Code, CodeScheme};
use crate::time::utc_now_as_iso_string;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::panic::Location;
use std::sync::Arc;

/// Field holding the respondent identifier
pub const UID_KEY: &str = "uid";

/// Who changed a record, from where, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub user: String,
    pub source: String,
    pub timestamp: String,
}

impl Metadata {
    /// Metadata attributed to `user`, with the caller's source location
    #[track_caller]
    pub fn new(user: &str) -> Self {
        let location = Location::caller();
        Self {
            user: user.to_string(),
            source: format!("{}:{}", location.file(), location.line()),
            timestamp: utc_now_as_iso_string(),
        }
    }
}

/// Where a label came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    #[serde(rename = "OriginID")]
    pub origin_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "OriginType")]
    pub origin_type: String,
}

/// A code assigned to a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    #[serde(rename = "SchemeID")]
    pub scheme_id: String,
    #[serde(rename = "CodeID")]
    pub code_id: String,
    #[serde(rename = "DateTimeUTC")]
    pub date_time_utc: String,
    #[serde(rename = "Origin")]
    pub origin: Origin,
    #[serde(rename = "Checked", default)]
    pub checked: bool,
}

impl Label {
    /// Label produced automatically by the pipeline (not manually checked)
    #[track_caller]
    pub fn automatic(scheme: &CodeScheme, code: &Code) -> Self {
        let location = Location::caller();
        Self {
            scheme_id: scheme.scheme_id().to_string(),
            code_id: code.code_id.clone(),
            date_time_utc: utc_now_as_iso_string(),
            origin: Origin {
                origin_id: format!("{}:{}", location.file(), location.line()),
                name: "Pipeline Auto-Coder".to_string(),
                origin_type: "External".to_string(),
            },
            checked: false,
        }
    }
}

/// Value of one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
    Label(Label),
    Labels(Vec<Label>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Short description of the value's shape, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Text(_) => "text",
            FieldValue::Label(_) => "label",
            FieldValue::Labels(_) => "label list",
        }
    }

    /// Render for CSV output
    pub fn to_cell(&self) -> String {
        match self {
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Label(label) => label.code_id.clone(),
            FieldValue::Labels(labels) => labels
                .iter()
                .map(|l| l.code_id.as_str())
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

/// One immutable layer of a record's history
#[derive(Debug, PartialEq)]
pub struct HistoryNode {
    pub delta: BTreeMap<String, FieldValue>,
    pub metadata: Metadata,
    pub parents: Vec<Arc<HistoryNode>>,
}

/// A record with provenance
#[derive(Debug, Clone)]
pub struct TracedData {
    values: BTreeMap<String, FieldValue>,
    head: Arc<HistoryNode>,
}

impl TracedData {
    pub fn new(values: BTreeMap<String, FieldValue>, metadata: Metadata) -> Self {
        let head = Arc::new(HistoryNode {
            delta: values.clone(),
            metadata,
            parents: Vec::new(),
        });
        Self { values, head }
    }

    /// Combine several records into one whose history has every member as a parent
    pub fn fold<'a, I>(members: I, values: BTreeMap<String, FieldValue>, metadata: Metadata) -> Self
    where
        I: IntoIterator<Item = &'a TracedData>,
    {
        let parents = members.into_iter().map(|td| Arc::clone(&td.head)).collect();
        let head = Arc::new(HistoryNode {
            delta: values.clone(),
            metadata,
            parents,
        });
        Self { values, head }
    }

    /// Rebuild a record from a history head by replaying it
    pub(crate) fn from_head(head: Arc<HistoryNode>) -> Self {
        let values = replay(&head);
        Self { values, head }
    }

    /// Append new values; existing history is kept and earlier clones are unaffected
    pub fn append_data(&mut self, delta: BTreeMap<String, FieldValue>, metadata: Metadata) {
        for (key, value) in &delta {
            self.values.insert(key.clone(), value.clone());
        }
        let previous = Arc::clone(&self.head);
        self.head = Arc::new(HistoryNode {
            delta,
            metadata,
            parents: vec![previous],
        });
    }

    /// Append a single field
    pub fn append_field(&mut self, key: &str, value: FieldValue, metadata: Metadata) {
        let mut delta = BTreeMap::new();
        delta.insert(key.to_string(), value);
        self.append_data(delta, metadata);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn values(&self) -> &BTreeMap<String, FieldValue> {
        &self.values
    }

    /// Respondent id, or `<unknown>` for records without one (used in error context)
    pub fn uid(&self) -> &str {
        match self.values.get(UID_KEY) {
            Some(FieldValue::Text(uid)) => uid,
            _ => "<unknown>",
        }
    }

    pub fn require(&self, key: &str) -> Result<&FieldValue> {
        self.values.get(key).ok_or_else(|| Error::MissingField {
            uid: self.uid().to_string(),
            field: key.to_string(),
        })
    }

    pub fn label(&self, key: &str) -> Result<&Label> {
        match self.require(key)? {
            FieldValue::Label(label) => Ok(label),
            other => Err(unexpected(key, "label", other)),
        }
    }

    pub fn labels(&self, key: &str) -> Result<&[Label]> {
        match self.require(key)? {
            FieldValue::Labels(labels) => Ok(labels),
            other => Err(unexpected(key, "label list", other)),
        }
    }

    pub fn text(&self, key: &str) -> Result<&str> {
        match self.require(key)? {
            FieldValue::Text(text) => Ok(text),
            other => Err(unexpected(key, "text", other)),
        }
    }

    pub fn flag(&self, key: &str) -> Result<bool> {
        match self.require(key)? {
            FieldValue::Bool(flag) => Ok(*flag),
            other => Err(unexpected(key, "bool", other)),
        }
    }

    pub fn head(&self) -> &Arc<HistoryNode> {
        &self.head
    }

    /// All history nodes, parents before children, each shared node once
    pub fn history(&self) -> Vec<Arc<HistoryNode>> {
        let mut ordered = Vec::new();
        let mut visited = HashSet::new();
        // Iterative post-order: (node, parents_pushed)
        let mut stack = vec![(Arc::clone(&self.head), false)];

        while let Some((node, expanded)) = stack.pop() {
            let ptr = Arc::as_ptr(&node);
            if expanded {
                ordered.push(node);
                continue;
            }
            if !visited.insert(ptr) {
                continue;
            }
            stack.push((Arc::clone(&node), true));
            for parent in node.parents.iter().rev() {
                if !visited.contains(&Arc::as_ptr(parent)) {
                    stack.push((Arc::clone(parent), false));
                }
            }
        }

        ordered
    }

    pub fn history_len(&self) -> usize {
        self.history().len()
    }
}

impl PartialEq for TracedData {
    /// Records compare by current values; history is provenance, not content
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

fn unexpected(key: &str, expected: &str, found: &FieldValue) -> Error {
    Error::UnexpectedValue {
        field: key.to_string(),
        expected: format!("{}, found {}", expected, found.kind()),
    }
}

fn replay(head: &Arc<HistoryNode>) -> BTreeMap<String, FieldValue> {
    // Walk down single-parent chains to the nearest root or fold node, then
    // apply deltas back up.
    let mut chain = vec![Arc::clone(head)];
    loop {
        let next = match chain[chain.len() - 1].parents.as_slice() {
            [parent] => Arc::clone(parent),
            _ => break,
        };
        chain.push(next);
    }

    let mut values = BTreeMap::new();
    for node in chain.iter().rev() {
        for (key, value) in &node.delta {
            values.insert(key.clone(), value.clone());
        }
    }
    values
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn record(fields: &[(&str, FieldValue)]) -> TracedData {
        let values = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        TracedData::new(values, Metadata::new("test"))
    }
}
