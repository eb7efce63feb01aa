//! Chart-ready CSV tables and the console preview.

use crate::models::{Analysis, ScoreDistributionRow, SectorStat};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

/// File name of the sector summary table.
pub const SUMMARY_CSV: &str = "sector_summary.csv";

/// File name of the score distribution table.
pub const DISTRIBUTION_CSV: &str = "score_distribution.csv";

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the summary and distribution tables into `dir`.
///
/// Returns the paths written.
pub fn export_tables(dir: &Path, analysis: &Analysis) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let summary_path = dir.join(SUMMARY_CSV);
    write_csv::<SectorStat>(&summary_path, &analysis.summary_table)?;

    let distribution_path = dir.join(DISTRIBUTION_CSV);
    write_csv::<ScoreDistributionRow>(&distribution_path, &analysis.distribution)?;

    info!("Exported chart tables to {}", dir.display());
    Ok(vec![summary_path, distribution_path])
}

/// Console row for the sector summary.
#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "Sector")]
    sector: String,
    #[tabled(rename = "Average")]
    average: String,
    #[tabled(rename = "Std Dev")]
    std_dev: String,
    #[tabled(rename = "Respondents")]
    respondents: usize,
}

impl From<&SectorStat> for SummaryRow {
    fn from(stat: &SectorStat) -> Self {
        Self {
            sector: stat.sector.clone(),
            average: stat.average_score.to_string(),
            std_dev: stat.std_dev.to_string(),
            respondents: stat.respondent_count,
        }
    }
}

/// Render the sector summary as a console table.
pub fn summary_table(stats: &[SectorStat]) -> String {
    if stats.is_empty() {
        return "(no rows)".to_string();
    }
    let rows: Vec<SummaryRow> = stats.iter().map(SummaryRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}
