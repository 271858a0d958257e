//! # RQA Analysis Library (rqa-analysis)
//!
//! Read-only summaries over the coded datasets produced by `rqa-pipeline`.
//!
//! **Tables:** engagement counts per show, repeat participation, demographic
//! distributions, theme cross-tabulation and the season-wide code
//! distribution. Percentages are one-decimal, half-to-even, over the
//! opted-in denominator of each grouping.

pub mod dataset;
pub mod demographics;
pub mod distribution;
pub mod engagement;
pub mod participation;
pub mod percentage;
pub mod report;
pub mod themes;

#[cfg(test)]
mod test_support;

pub use percentage::Percentage;
pub use report::{write_csv, write_report, Table};
