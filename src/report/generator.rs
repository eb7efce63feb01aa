//! Markdown report generation.
//!
//! This module renders the dashboard as a Markdown document: overall
//! statistics, chart-ready tables for each view, the "Other" responses,
//! the selected comments and the generated summary.

use crate::config::ReportConfig;
use crate::models::{
    Analysis, Dashboard, OverallStats, ReportMetadata, Respondent, ScoreDistributionRow,
    ScoreHistogram, SectorStat, SummaryOutcome,
};
use crate::summary::SUMMARY_HEADING;
use anyhow::Result;

/// Axis title of every score histogram.
const SCORE_AXIS: &str =
    "Anser att kommunen tränger undan privat verksamhet. 1 = hög utsträckning, 6 = inte alls";

const BAR_WIDTH: usize = 30;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(dashboard: &Dashboard, options: &ReportConfig) -> String {
    let analysis = &dashboard.analysis;
    let mut output = String::new();

    output.push_str("# Företagsenkät Konkurrens\n\n");
    output.push_str(
        "Respondenternas svar kategoriserat per bransch respondenten upplever att kommunen tränger ut privat näringsliv.\n\n",
    );

    output.push_str(&generate_metadata_section(&dashboard.metadata));
    output.push_str(&generate_table_of_contents(options));
    output.push_str(&generate_histogram_section(
        "Total Poängdistribution",
        &analysis.total_histogram,
    ));
    output.push_str(&generate_overall_section(&analysis.overall));
    output.push_str(&generate_summary_table_section(analysis));
    output.push_str(&generate_distribution_section(analysis, DistributionView::Percentage));
    output.push_str(&generate_distribution_section(analysis, DistributionView::Count));
    output.push_str(&generate_average_series_section(&analysis.by_respondent_count));

    if options.include_other_responses {
        output.push_str(&generate_other_section(&analysis.other_responses));
    }

    output.push_str(&generate_histogram_section(
        &format!("Histogram for {}", analysis.selection),
        &analysis.selection_histogram,
    ));
    output.push_str(&generate_comments_section(&analysis.comments));
    output.push_str(&generate_summary_outcome_section(&dashboard.summary));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source File:** {}\n", metadata.source_file));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(ref model) = metadata.model_used {
        section.push_str(&format!("- **Model Used:** `{}`\n", model));
    }
    if metadata.invalid_scores > 0 {
        section.push_str(&format!(
            "- **Invalid Scores Ignored:** {}\n",
            metadata.invalid_scores
        ));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(options: &ReportConfig) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Total Poängdistribution](#total-poängdistribution)\n");
    toc.push_str("- [Översikt](#översikt)\n");
    toc.push_str("- [Sector Summary](#sector-summary)\n");
    toc.push_str("- [Sector-wise Score Distribution](#sector-wise-score-distribution-percent)\n");
    toc.push_str("- [Average Score per Sector](#average-score-per-sector)\n");
    if options.include_other_responses {
        toc.push_str("- [Kategorin Other](#kategorin-other)\n");
    }
    toc.push_str("- [Kommentarer](#kommentarer)\n");
    toc.push('\n');

    toc
}

/// Text bar proportional to `count / max`.
fn bar(count: usize, max: usize) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    let width = ((count as f64 / max as f64) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(width.max(1))
}

/// Generate a score histogram section.
fn generate_histogram_section(title: &str, histogram: &ScoreHistogram) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));
    section.push_str(&format!("*{}*\n\n", SCORE_AXIS));
    section.push_str("| Score | Count | |\n");
    section.push_str("|:---:|:---:|:---|\n");

    let max = histogram.counts.iter().copied().max().unwrap_or(0);
    for (score, count) in histogram.iter() {
        section.push_str(&format!("| {} | {} | {} |\n", score, count, bar(count, max)));
    }
    section.push_str(&format!("\nTotalt: {} svar\n\n", histogram.total()));

    section
}

/// Generate the overall statistics section.
fn generate_overall_section(overall: &OverallStats) -> String {
    let mut section = String::new();

    section.push_str("## Översikt\n\n");
    section.push_str(&format!("- **Totalt medelvärde:** {}\n", overall.total_mean));
    section.push_str(&format!(
        "- **Total standardavvikelse:** {}\n",
        overall.total_std_dev
    ));
    section.push_str(&format!("- **Totalt antal svar:** {}\n\n", overall.total_count));

    section
}

/// Generate the sector summary table, sorted by average score.
fn generate_summary_table_section(analysis: &Analysis) -> String {
    let mut section = String::new();

    section.push_str("## Sector Summary\n\n");
    section.push_str("| Sector | Average Score | Standard Deviation | Number of Respondents |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");

    for stat in &analysis.summary_table {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            stat.sector, stat.average_score, stat.std_dev, stat.respondent_count
        ));
    }
    section.push('\n');

    section.push_str(&format!(
        "Total number of respondents: {}. Note: One respondent can reply for several sectors.\n\n",
        analysis.overall.total_respondents
    ));

    section
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DistributionView {
    Percentage,
    Count,
}

fn rows_for<'a>(
    distribution: &'a [ScoreDistributionRow],
    sector: &'a str,
) -> impl Iterator<Item = &'a ScoreDistributionRow> + 'a {
    distribution.iter().filter(move |r| r.sector == sector)
}

/// Generate one stacked distribution table, sectors by respondent count.
fn generate_distribution_section(analysis: &Analysis, view: DistributionView) -> String {
    let mut section = String::new();

    match view {
        DistributionView::Percentage => {
            section.push_str("## Sector-wise Score Distribution (percent)\n\n");
            section.push_str("*% of Responses*\n\n");
        }
        DistributionView::Count => {
            section.push_str("## Sector-wise Score Distribution (count)\n\n");
            section.push_str("*Number of Responses*\n\n");
        }
    }

    section.push_str("| Sector | 1 | 2 | 3 | 4 | 5 | 6 |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|:---:|\n");

    for stat in &analysis.by_respondent_count {
        let cells: Vec<String> = rows_for(&analysis.distribution, &stat.sector)
            .map(|row| match view {
                DistributionView::Percentage => format!("{:.1}%", row.percentage),
                DistributionView::Count => row.count.to_string(),
            })
            .collect();
        section.push_str(&format!("| {} | {} |\n", stat.sector, cells.join(" | ")));
    }
    section.push('\n');

    section
}

/// Generate the average-score series, sectors by respondent count.
fn generate_average_series_section(by_count: &[SectorStat]) -> String {
    let mut section = String::new();

    section.push_str("## Average Score per Sector\n\n");
    section.push_str("| Sector | Average Score | |\n");
    section.push_str("|:---|:---:|:---|\n");

    for stat in by_count {
        let marker = match stat.average_score.value() {
            Some(avg) => "·".repeat((avg * 5.0).round() as usize) + "●",
            None => String::new(),
        };
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            stat.sector, stat.average_score, marker
        ));
    }
    section.push('\n');

    section
}

/// Generate the list of respondents categorized as Other.
fn generate_other_section(other: &[Respondent]) -> String {
    let mut section = String::new();

    section.push_str("## Kategorin Other\n\n");

    if other.is_empty() {
        section.push_str("Inga svar i kategorin Other.\n\n");
        return section;
    }

    section.push_str("| Row | Score | Sector Answer | Comment |\n");
    section.push_str("|:---:|:---:|:---|:---|\n");
    for respondent in other {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            respondent.row,
            respondent
                .score
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            escape_cell(respondent.sector_text.as_deref().unwrap_or("")),
            escape_cell(respondent.comment.as_deref().unwrap_or("")),
        ));
    }
    section.push('\n');

    section
}

/// Keep free text inside a single table cell.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Generate the selected comments section.
fn generate_comments_section(comments: &[String]) -> String {
    let mut section = String::new();

    section.push_str("## Kommentarer\n\n");

    if comments.is_empty() {
        section.push_str("Det finns inga kommentarer.\n\n");
        return section;
    }

    for comment in comments {
        section.push_str(&format!("> {}\n>\n", comment.replace('\n', "\n> ")));
    }
    section.push('\n');

    section
}

/// Generate the AI summary section.
fn generate_summary_outcome_section(summary: &SummaryOutcome) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", SUMMARY_HEADING));
    match summary {
        SummaryOutcome::Generated { text } => {
            section.push_str(text.trim());
            section.push_str("\n\n");
        }
        SummaryOutcome::Skipped => {
            section.push_str("*Sammanfattning hoppades över.*\n\n");
        }
        SummaryOutcome::Failed { reason } => {
            section.push_str(&format!("*Sammanfattningen kunde inte skapas: {}*\n\n", reason));
        }
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by survey-dashboard*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(dashboard: &Dashboard) -> Result<String> {
    serde_json::to_string_pretty(dashboard).map_err(Into::into)
}
