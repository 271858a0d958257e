//! # RQA Pipeline Library (rqa-pipeline)
//!
//! Turns raw radio show and survey exports into coded, folded and redacted
//! analysis datasets.
//!
//! **Stages:** key translation, raw dataset combination, project window and
//! test contact filtering, manual and default labelling, code imputation, consent
//! handling, folding to one record per respondent, and CSV/JSONL export.

pub mod analysis_file;
pub mod combine;
pub mod consent;
pub mod filter;
pub mod folding;
pub mod imputation;
pub mod labelling;
pub mod locations;
pub mod manual_labels;
pub mod recovery;
pub mod sink;
pub mod translate_keys;

#[cfg(test)]
mod test_support;

pub use folding::{fold_by_uid, FoldPlan, FoldStrategy, Unlisted};
pub use locations::{LocationLevel, LocationTable};
