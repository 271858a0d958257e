//! JSONL import/export of traced data
//!
//! One record per line. History is written flat (nodes listed parents first,
//! parents referenced by index) so deep histories never nest:
//!
//! ```json
//! {"data": {...}, "history": [{"id": 0, "parents": [], "metadata": {...}, "delta": {...}}, ...]}
//! ```
//!
//! The last history entry is the head. On import the head is replayed and
//! must reproduce `data` exactly.

use crate::traced_data::{FieldValue, HistoryNode, Metadata, TracedData};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Serialize, Deserialize)]
struct SerializedNode {
    id: usize,
    parents: Vec<usize>,
    metadata: Metadata,
    delta: BTreeMap<String, FieldValue>,
}

#[derive(Serialize, Deserialize)]
struct SerializedRecord {
    data: BTreeMap<String, FieldValue>,
    history: Vec<SerializedNode>,
}

fn to_serialized(td: &TracedData) -> SerializedRecord {
    let history = td.history();
    let index: HashMap<*const HistoryNode, usize> = history
        .iter()
        .enumerate()
        .map(|(i, node)| (Arc::as_ptr(node), i))
        .collect();

    let nodes = history
        .iter()
        .enumerate()
        .map(|(id, node)| SerializedNode {
            id,
            parents: node
                .parents
                .iter()
                .map(|p| index[&Arc::as_ptr(p)])
                .collect(),
            metadata: node.metadata.clone(),
            delta: node.delta.clone(),
        })
        .collect();

    SerializedRecord {
        data: td.values().clone(),
        history: nodes,
    }
}

fn from_serialized(record: SerializedRecord, line_number: usize) -> Result<TracedData> {
    let mut nodes: Vec<Arc<HistoryNode>> = Vec::with_capacity(record.history.len());

    for node in record.history {
        if node.id != nodes.len() {
            return Err(Error::InvalidInput(format!(
                "line {}: history node id {} out of order",
                line_number, node.id
            )));
        }
        let mut parents = Vec::with_capacity(node.parents.len());
        for parent in node.parents {
            let parent = nodes.get(parent).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "line {}: history node {} references later node {}",
                    line_number, node.id, parent
                ))
            })?;
            parents.push(Arc::clone(parent));
        }
        nodes.push(Arc::new(HistoryNode {
            delta: node.delta,
            metadata: node.metadata,
            parents,
        }));
    }

    let head = nodes
        .pop()
        .ok_or_else(|| Error::InvalidInput(format!("line {}: empty history", line_number)))?;
    let td = TracedData::from_head(head);

    if td.values() != &record.data {
        return Err(Error::InvalidInput(format!(
            "line {}: data does not match replayed history (uid: {})",
            line_number,
            td.uid()
        )));
    }
    Ok(td)
}

/// Write records as JSONL
pub fn export_jsonl<W: Write>(data: &[TracedData], writer: W) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    for td in data {
        serde_json::to_writer(&mut writer, &to_serialized(td))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read records from JSONL; blank lines are skipped
pub fn import_jsonl<R: BufRead>(reader: R) -> Result<Vec<TracedData>> {
    let mut data = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: SerializedRecord = serde_json::from_str(&line)?;
        data.push(from_serialized(record, i + 1)?);
    }
    Ok(data)
}

/// Write records to a JSONL file, creating parent directories as needed
pub fn write_jsonl_file(path: &Path, data: &[TracedData]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    export_jsonl(data, File::create(path)?)?;
    info!("Wrote {} traced data items to {}", data.len(), path.display());
    Ok(())
}

pub fn read_jsonl_file(path: &Path) -> Result<Vec<TracedData>> {
    let data = import_jsonl(BufReader::new(File::open(path)?))?;
    info!("Loaded {} traced data items from {}", data.len(), path.display());
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traced_data::test_support::record;

    #[test]
    fn test_round_trip_keeps_history_shape() {
        let base = record(&[("uid", FieldValue::text("u1"))]);
        let mut a = base.clone();
        a.append_field("rqa_s04e01_raw", FieldValue::text("hello"), Metadata::new("test"));
        let mut b = base.clone();
        b.append_field("consent_withdrawn", FieldValue::Bool(false), Metadata::new("test"));

        let mut folded_values = a.values().clone();
        folded_values.insert("consent_withdrawn".into(), FieldValue::Bool(false));
        let folded = TracedData::fold([&a, &b], folded_values, Metadata::new("test"));

        let mut buffer = Vec::new();
        export_jsonl(&[a.clone(), folded.clone()], &mut buffer).unwrap();
        let loaded = import_jsonl(buffer.as_slice()).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], a);
        assert_eq!(loaded[0].history_len(), 2);
        assert_eq!(loaded[1], folded);
        // Shared root is written once and stays shared
        assert_eq!(loaded[1].history_len(), folded.history_len());
    }

    #[test]
    fn test_tampered_data_rejected() {
        let td = record(&[("uid", FieldValue::text("u1"))]);
        let mut buffer = Vec::new();
        export_jsonl(&[td], &mut buffer).unwrap();

        let tampered = String::from_utf8(buffer).unwrap().replacen("\"data\":{\"uid\":\"u1\"}", "\"data\":{\"uid\":\"u2\"}", 1);
        let err = import_jsonl(tampered.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_file_helpers_create_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/messages.jsonl");
        let td = record(&[("uid", FieldValue::text("u1"))]);

        write_jsonl_file(&path, &[td.clone()]).unwrap();
        let loaded = read_jsonl_file(&path).unwrap();
        assert_eq!(loaded, vec![td]);
    }
}
