//! Code schemes: controlled vocabularies for one coded variable
//!
//! Scheme files use the export format of the labelling tool:
//!
//! ```json
//! {
//!   "SchemeID": "Scheme-gender",
//!   "Name": "gender",
//!   "Version": "0.0.1",
//!   "Codes": [
//!     {"CodeID": "code-M", "CodeType": "Normal", "DisplayText": "male",
//!      "StringValue": "male", "MatchValues": ["male"]},
//!     {"CodeID": "code-STOP", "CodeType": "Control", "ControlCode": "STOP",
//!      "DisplayText": "stop", "StringValue": "STOP"}
//!   ]
//! }
//! ```
//!
//! Lookups by an unknown key fail with [`Error::UnknownCode`]; there is no
//! silent default.

use crate::codes::ControlCode;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Semantic type of a code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeType {
    Normal,
    Control,
    Meta,
}

/// One entry of a code scheme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Code {
    #[serde(rename = "CodeID")]
    pub code_id: String,
    pub code_type: CodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_code: Option<ControlCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_code: Option<String>,
    #[serde(default)]
    pub display_text: String,
    pub string_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<i64>,
    #[serde(default)]
    pub match_values: Vec<String>,
}

impl Code {
    pub fn is_normal(&self) -> bool {
        self.code_type == CodeType::Normal
    }

    /// True if this is the given control code
    pub fn is_control(&self, control_code: ControlCode) -> bool {
        self.code_type == CodeType::Control && self.control_code == Some(control_code)
    }

    /// Whether two codes (possibly from different schemes) mean the same thing.
    ///
    /// Control and meta codes compare by role; normal codes compare by id.
    pub fn same_meaning(&self, other: &Code) -> bool {
        match (self.code_type, other.code_type) {
            (CodeType::Control, CodeType::Control) => self.control_code == other.control_code,
            (CodeType::Meta, CodeType::Meta) => self.meta_code == other.meta_code,
            (CodeType::Normal, CodeType::Normal) => self.code_id == other.code_id,
            _ => false,
        }
    }

    fn validate(&self, scheme_id: &str) -> Result<()> {
        let ok = match self.code_type {
            CodeType::Normal => self.control_code.is_none() && self.meta_code.is_none(),
            CodeType::Control => self.control_code.is_some() && self.meta_code.is_none(),
            CodeType::Meta => self.meta_code.is_some() && self.control_code.is_none(),
        };
        if !ok {
            return Err(Error::Config(format!(
                "scheme '{}': code '{}' of type {:?} has inconsistent control/meta fields",
                scheme_id, self.code_id, self.code_type
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SchemeFile {
    #[serde(rename = "SchemeID")]
    scheme_id: String,
    name: String,
    #[serde(default)]
    version: String,
    codes: Vec<Code>,
}

impl TryFrom<SchemeFile> for CodeScheme {
    type Error = Error;

    fn try_from(file: SchemeFile) -> Result<Self> {
        CodeScheme::new(file.scheme_id, file.name, file.version, file.codes)
    }
}

/// Ordered set of codes, unique by `code_id`
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "SchemeFile")]
pub struct CodeScheme {
    scheme_id: String,
    name: String,
    version: String,
    codes: Vec<Code>,
    by_id: HashMap<String, usize>,
}

impl CodeScheme {
    /// Build a scheme, validating code ids and per-type invariants
    pub fn new(
        scheme_id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        codes: Vec<Code>,
    ) -> Result<Self> {
        let scheme_id = scheme_id.into();
        let mut by_id = HashMap::with_capacity(codes.len());

        for (index, code) in codes.iter().enumerate() {
            code.validate(&scheme_id)?;
            if by_id.insert(code.code_id.clone(), index).is_some() {
                return Err(Error::Config(format!(
                    "scheme '{}': duplicate code id '{}'",
                    scheme_id, code.code_id
                )));
            }
        }

        Ok(Self {
            scheme_id,
            name: name.into(),
            version: version.into(),
            codes,
            by_id,
        })
    }

    /// Parse a scheme from its JSON file contents
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn scheme_id(&self) -> &str {
        &self.scheme_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Codes in scheme order
    pub fn codes(&self) -> &[Code] {
        &self.codes
    }

    /// Position of a code in scheme order
    pub fn position(&self, code_id: &str) -> Option<usize> {
        self.by_id.get(code_id).copied()
    }

    pub fn code_with_id(&self, code_id: &str) -> Result<&Code> {
        self.position(code_id)
            .map(|index| &self.codes[index])
            .ok_or_else(|| self.unknown(format!("id '{}'", code_id)))
    }

    pub fn code_with_control_code(&self, control_code: ControlCode) -> Result<&Code> {
        self.codes
            .iter()
            .find(|c| c.is_control(control_code))
            .ok_or_else(|| self.unknown(format!("control code '{}'", control_code)))
    }

    pub fn code_with_meta_code(&self, meta_code: &str) -> Result<&Code> {
        self.codes
            .iter()
            .find(|c| c.code_type == CodeType::Meta && c.meta_code.as_deref() == Some(meta_code))
            .ok_or_else(|| self.unknown(format!("meta code '{}'", meta_code)))
    }

    /// Case-sensitive exact match against each code's `match_values`
    pub fn code_with_match_value(&self, match_value: &str) -> Result<&Code> {
        self.codes
            .iter()
            .find(|c| c.match_values.iter().any(|v| v == match_value))
            .ok_or_else(|| self.unknown(format!("match value '{}'", match_value)))
    }

    fn unknown(&self, lookup: String) -> Error {
        Error::UnknownCode {
            scheme_id: self.scheme_id.clone(),
            lookup,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn normal(id: &str, value: &str) -> Code {
        Code {
            code_id: id.to_string(),
            code_type: CodeType::Normal,
            control_code: None,
            meta_code: None,
            display_text: value.to_string(),
            string_value: value.to_string(),
            numeric_value: None,
            match_values: vec![value.to_string()],
        }
    }

    pub fn control(id: &str, control_code: ControlCode) -> Code {
        Code {
            code_id: id.to_string(),
            code_type: CodeType::Control,
            control_code: Some(control_code),
            meta_code: None,
            display_text: control_code.to_string(),
            string_value: control_code.to_string(),
            numeric_value: None,
            match_values: Vec::new(),
        }
    }
}
