//! The analysis pipeline: survey table in, dashboard data out.

use crate::analysis::aggregator::{
    distribution_in_order, overall_stats, sector_stats, sort_by_average_desc,
    sort_by_respondent_count_desc, total_histogram,
};
use crate::analysis::categorizer::{categorize, SectorCatalog};
use crate::analysis::comments::{low_score_comments, selection_histogram};
use crate::error::{Result, SurveyError};
use crate::models::{Analysis, Respondent, SectorSelection};
use tracing::info;

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub selection: SectorSelection,
    /// Comments are taken from rows scoring strictly below this value.
    pub comment_score_threshold: u8,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            selection: SectorSelection::All,
            comment_score_threshold: 3,
        }
    }
}

/// Run categorization and aggregation over the respondents.
///
/// Overall statistics are taken from the raw rows before categorization.
pub fn analyze(
    respondents: &[Respondent],
    catalog: &SectorCatalog,
    options: &AnalysisOptions,
) -> Result<Analysis> {
    if let SectorSelection::Sector(ref label) = options.selection {
        if !catalog.contains_label(label) {
            return Err(SurveyError::UnknownSector(label.clone()));
        }
    }

    let overall = overall_stats(respondents);
    let total_histogram = total_histogram(respondents);

    let categorized = categorize(respondents, catalog);
    let stats = sector_stats(&categorized.records, catalog);
    info!("Aggregated {} sector labels", stats.len());

    let mut summary_table = stats.clone();
    sort_by_average_desc(&mut summary_table);

    let mut by_respondent_count = stats;
    sort_by_respondent_count_desc(&mut by_respondent_count);

    let distribution = distribution_in_order(&categorized.records, &by_respondent_count);

    let selection_histogram = selection_histogram(&categorized.records, &options.selection);
    let comments = low_score_comments(
        &categorized.records,
        &options.selection,
        options.comment_score_threshold,
    );
    info!(
        "Selected {} comments for '{}'",
        comments.len(),
        options.selection
    );

    Ok(Analysis {
        overall,
        total_histogram,
        summary_table,
        by_respondent_count,
        distribution,
        other_responses: categorized.other_responses,
        selection: options.selection.clone(),
        selection_histogram,
        comments,
    })
}
