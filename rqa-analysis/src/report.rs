//! Summary CSV output
//!
//! Every table writes its fixed header row, even with no data rows.

use crate::demographics::demographic_distributions;
use crate::distribution::season_distribution;
use crate::engagement::engagement_counts;
use crate::participation::repeat_participation;
use crate::themes::theme_distributions;
use rqa_common::traced_data::TracedData;
use rqa_common::{CodingPlans, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

pub const ENGAGEMENT_CSV: &str = "engagement_counts.csv";
pub const PARTICIPATION_CSV: &str = "participation_frequency.csv";
pub const DEMOGRAPHICS_CSV: &str = "demographic_distributions.csv";
pub const THEMES_CSV: &str = "theme_distributions.csv";
pub const SEASON_DISTRIBUTION_CSV: &str = "season_distribution.csv";

/// A row type with a fixed header row
pub trait Table {
    /// Column names, in the order the row serializes its fields
    const HEADERS: &'static [&'static str];
}

pub fn write_csv<T: Serialize + Table>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(T::HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Compute every summary and write it under `output_dir`.
///
/// All tables are computed before any file is written, so a data defect
/// leaves no partial report behind.
pub fn write_report(
    output_dir: &Path,
    messages: &[TracedData],
    individuals: &[TracedData],
    plans: &CodingPlans,
) -> Result<()> {
    let engagement = engagement_counts(messages, individuals, plans)?;
    let participation = repeat_participation(individuals, plans)?;
    let demographics = demographic_distributions(individuals, plans)?;
    let themes = theme_distributions(messages, plans)?;
    let distribution = season_distribution(individuals, plans)?;

    write_csv(&output_dir.join(ENGAGEMENT_CSV), &engagement)?;
    write_csv(&output_dir.join(PARTICIPATION_CSV), &participation)?;
    write_csv(&output_dir.join(DEMOGRAPHICS_CSV), &demographics)?;
    write_csv(&output_dir.join(THEMES_CSV), &themes)?;
    write_csv(&output_dir.join(SEASON_DISTRIBUTION_CSV), &distribution)?;
    Ok(())
}
