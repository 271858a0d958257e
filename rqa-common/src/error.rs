//! Common error types for the RQA pipeline
//!
//! Every variant except the wrapped I/O and parser errors describes an
//! upstream data or configuration defect. None of them are retried: the run
//! stops at the point of detection and the message names the offending
//! respondent, field and values.

use thiserror::Error;

/// Common result type for RQA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the RQA crates
#[derive(Error, Debug)]
pub enum Error {
    /// Data violates an invariant of the configured code schemes
    /// (conflicting code types, unequal values under an assert-equal fold,
    /// zero participation for an opted-in respondent, ...)
    #[error("Scheme inconsistency in field '{field}' (uid: {uid}): {details}")]
    SchemeInconsistency {
        field: String,
        uid: String,
        details: String,
    },

    /// Lookup of a code that the scheme does not contain
    #[error("Unknown code in scheme '{scheme_id}': no code with {lookup}")]
    UnknownCode { scheme_id: String, lookup: String },

    /// Requested scheme was never registered
    #[error("Unknown code scheme: {0}")]
    UnknownScheme(String),

    /// A field required by the configuration is absent from a record
    #[error("Missing field '{field}' (uid: {uid})")]
    MissingField { uid: String, field: String },

    /// A field holds a value of the wrong shape (e.g. text where a label is expected)
    #[error("Unexpected value in field '{field}': expected {expected}")]
    UnexpectedValue { field: String, expected: String },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input data outside the coded fields
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Shorthand for [`Error::SchemeInconsistency`]
    pub fn inconsistency(
        field: impl Into<String>,
        uid: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Error::SchemeInconsistency {
            field: field.into(),
            uid: uid.into(),
            details: details.into(),
        }
    }

    /// True for errors that indicate a configuration or data defect rather than I/O trouble
    pub fn is_data_defect(&self) -> bool {
        matches!(
            self,
            Error::SchemeInconsistency { .. }
                | Error::UnknownCode { .. }
                | Error::UnknownScheme(_)
                | Error::MissingField { .. }
                | Error::UnexpectedValue { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inconsistency_message_carries_context() {
        let err = Error::inconsistency("operator_coded", "u1", "values differ: Hormuud vs Telesom");
        let msg = err.to_string();
        assert!(msg.contains("operator_coded"));
        assert!(msg.contains("u1"));
        assert!(msg.contains("Hormuud vs Telesom"));
        assert!(err.is_data_defect());
    }

    #[test]
    fn test_io_error_is_not_data_defect() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(!err.is_data_defect());
    }
}
