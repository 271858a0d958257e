//! Conversion of recovered messages into traced data
//!
//! Messages lost by the messaging platform are recovered from the operator
//! as a CSV with `Received On`, `Mobile No` and `Message Content` columns.
//! Times are local Mogadishu time (UTC+03:00, no daylight saving). Phone
//! numbers must already be de-identified.
//!
//! Each message's `run_id` is the SHA-256 of its CSV row laid out like
//! Python's `json.dumps(row, sort_keys=True)`, so ids match those of earlier
//! runs of the pipeline over the same file.

use crate::combine::RAW_UID_KEY;
use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use rqa_common::traced_data::{FieldValue, Metadata, TracedData};
use rqa_common::{Error, Result};
use serde::Serialize;
use serde_json::ser::Formatter;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use tracing::info;

/// Prefix of de-identified phone numbers
pub const DEIDENTIFIED_PREFIX: &str = "avf-phone-uuid-";

const RECEIVED_ON_FORMAT: &str = "%m/%d/%y %H:%M";
const MOGADISHU_OFFSET_SECONDS: i32 = 3 * 3600;

/// JSON layout of Python's `json.dumps`: `", "` and `": "` separators, non-ASCII as `\uXXXX`
struct PythonJsonFormatter;

impl Formatter for PythonJsonFormatter {
    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

fn python_json(row: &BTreeMap<String, String>) -> Result<String> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, PythonJsonFormatter);
    row.serialize(&mut serializer)?;
    // Only ASCII is ever written
    String::from_utf8(buffer).map_err(|e| Error::InvalidInput(format!("row is not valid UTF-8: {}", e)))
}

/// Hex SHA-256 of a row, serialized as JSON with sorted keys
pub fn row_hash(row: &BTreeMap<String, String>) -> Result<String> {
    let json = python_json(row)?;
    Ok(format!("{:x}", Sha256::digest(json.as_bytes())))
}

fn localize(received_on: &str) -> Result<String> {
    let naive = NaiveDateTime::parse_from_str(received_on, RECEIVED_ON_FORMAT)
        .map_err(|e| Error::InvalidInput(format!("Invalid 'Received On' value '{}': {}", received_on, e)))?;
    let offset = FixedOffset::east_opt(MOGADISHU_OFFSET_SECONDS)
        .ok_or_else(|| Error::InvalidInput("invalid Mogadishu offset".to_string()))?;
    let local = offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| Error::InvalidInput(format!("Ambiguous local time '{}'", received_on)))?;
    Ok(local.to_rfc3339())
}

fn column<'a>(row: &'a BTreeMap<String, String>, name: &str, line: usize) -> Result<&'a str> {
    row.get(name)
        .map(String::as_str)
        .ok_or_else(|| Error::InvalidInput(format!("row {}: missing '{}' column", line, name)))
}

/// Convert a recovery CSV into traced records `{avf_phone_id, message, received_on, run_id}`
pub fn convert_recovery_csv<R: Read>(user: &str, reader: R, source_name: &str) -> Result<Vec<TracedData>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut data = Vec::new();

    for (i, row) in csv_reader.deserialize::<BTreeMap<String, String>>().enumerate() {
        let row = row?;
        let line = i + 2;

        let phone = column(&row, "Mobile No", line)?;
        if !phone.starts_with(DEIDENTIFIED_PREFIX) {
            return Err(Error::InvalidInput(format!(
                "{} row {}: 'Mobile No' has not been de-identified (expected prefix '{}')",
                source_name, line, DEIDENTIFIED_PREFIX
            )));
        }

        let mut values = BTreeMap::new();
        values.insert(RAW_UID_KEY.to_string(), FieldValue::text(phone));
        values.insert(
            "message".to_string(),
            FieldValue::text(column(&row, "Message Content", line)?),
        );
        values.insert(
            "received_on".to_string(),
            FieldValue::text(localize(column(&row, "Received On", line)?)?),
        );
        values.insert("run_id".to_string(), FieldValue::text(row_hash(&row)?));

        data.push(TracedData::new(values, Metadata::new(user)));
    }

    info!("Converted {} recovered messages from {}", data.len(), source_name);
    Ok(data)
}

/// Output file stem for a recovery CSV URL or path (`gs://bucket/s04e01.csv` → `s04e01`)
pub fn output_stem(source: &str) -> &str {
    let file_name = source.rsplit('/').next().unwrap_or(source);
    file_name.split('.').next().unwrap_or(file_name)
}
