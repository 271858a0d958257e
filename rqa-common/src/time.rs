//! Timestamp utilities

use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC time as an RFC 3339 string with microsecond precision
pub fn utc_now_as_iso_string() -> String {
    now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Parse an ISO 8601 / RFC 3339 timestamp, keeping its offset
pub fn parse_iso(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .map_err(|e| Error::InvalidInput(format!("Invalid ISO timestamp '{}': {}", value, e)))
}
