//! Control code vocabulary and sentinel values
//!
//! Control codes mark a label as something other than a real answer
//! (not reviewed yet, withdrew consent, coding error, ...). Every code scheme
//! carries its own control codes with scheme-specific `CodeID`s, so two
//! schemes agree on a control code when their `ControlCode` values match,
//! not their ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel written to every exported field of a respondent who withdrew consent
pub const STOP: &str = "STOP";

/// Matrix column value for "label present"
pub const MATRIX_1: &str = "1";

/// Matrix column value for "label absent"
pub const MATRIX_0: &str = "0";

/// Separator used when concatenating raw messages of one respondent
pub const CONCATENATE_SEPARATOR: &str = ";";

/// Per-record flag set when the respondent withdrew consent
pub const CONSENT_WITHDRAWN_KEY: &str = "consent_withdrawn";

/// Fixed vocabulary of control codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ControlCode {
    #[serde(rename = "NC")]
    NotCoded,
    #[serde(rename = "NR")]
    NotReviewed,
    #[serde(rename = "STOP")]
    Stop,
    #[serde(rename = "CE")]
    CodingError,
    #[serde(rename = "WS")]
    WrongScheme,
    #[serde(rename = "NA")]
    TrueMissing,
    #[serde(rename = "SKIPPED")]
    Skipped,
    #[serde(rename = "NIC")]
    NotInternallyConsistent,
    #[serde(rename = "NL")]
    NotLogical,
}

impl ControlCode {
    /// Short form used in scheme files
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotCoded => "NC",
            Self::NotReviewed => "NR",
            Self::Stop => "STOP",
            Self::CodingError => "CE",
            Self::WrongScheme => "WS",
            Self::TrueMissing => "NA",
            Self::Skipped => "SKIPPED",
            Self::NotInternallyConsistent => "NIC",
            Self::NotLogical => "NL",
        }
    }
}

impl fmt::Display for ControlCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
