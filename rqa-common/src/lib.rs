//! # RQA Common Library
//!
//! Shared code for the radio-question-answer (RQA) coding pipeline:
//! - Error types
//! - Control code vocabulary
//! - Code schemes and the scheme registry
//! - Traced data (records with append-only provenance)
//! - Coding plans (how each raw field is coded, folded and exported)
//! - Pipeline configuration loading and validation
//! - JSONL import/export of traced data
//! - Timestamp helpers

pub mod code_scheme;
pub mod codes;
pub mod coding_plan;
pub mod config;
pub mod error;
pub mod registry;
pub mod time;
pub mod traced_data;
pub mod traced_io;

pub use code_scheme::{Code, CodeScheme, CodeType};
pub use codes::ControlCode;
pub use coding_plan::{
    Cleaner, CodeImputation, CodingConfiguration, CodingMode, CodingPlan, CodingPlans, FoldingMode,
};
pub use config::{PipelineConfiguration, RapidProKeyRemapping, RawDataSource};
pub use error::{Error, Result};
pub use registry::CodeSchemeRegistry;
pub use traced_data::{FieldValue, Label, Metadata, TracedData};
