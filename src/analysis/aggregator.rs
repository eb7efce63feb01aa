//! Score aggregation and statistics.
//!
//! Per-label statistics use sample standard deviation (N-1). An empty
//! group has no mean, and fewer than two scores have no standard
//! deviation; both are reported as [`Stat::NoData`]. Histogram
//! percentages of an empty group are zero instead.

use crate::analysis::categorizer::SectorCatalog;
use crate::models::{
    CategorizedRespondent, OverallStats, Respondent, ScoreDistributionRow, ScoreHistogram,
    SectorStat, Stat,
};
use std::cmp::Reverse;
use tracing::debug;

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Stat {
    if values.is_empty() {
        return Stat::NoData;
    }
    let sum: f64 = values.iter().sum();
    Stat::Value(sum / values.len() as f64)
}

/// Sample standard deviation (N-1 denominator).
pub fn sample_std_dev(values: &[f64]) -> Stat {
    if values.len() < 2 {
        return Stat::NoData;
    }
    let Some(avg) = mean(values).value() else {
        return Stat::NoData;
    };
    let sum_sq: f64 = values.iter().map(|v| (v - avg).powi(2)).sum();
    Stat::Value((sum_sq / (values.len() - 1) as f64).sqrt())
}

fn valid_scores<I>(scores: I) -> Vec<f64>
where
    I: IntoIterator<Item = Option<u8>>,
{
    scores.into_iter().flatten().map(f64::from).collect()
}

/// Statistics over the whole score column.
pub fn overall_stats(respondents: &[Respondent]) -> OverallStats {
    let scores = valid_scores(respondents.iter().map(|r| r.score));
    OverallStats {
        total_mean: mean(&scores),
        total_std_dev: sample_std_dev(&scores),
        total_count: scores.len(),
        total_respondents: respondents.len(),
    }
}

/// Histogram of every score in the file.
pub fn total_histogram(respondents: &[Respondent]) -> ScoreHistogram {
    ScoreHistogram::from_scores(respondents.iter().map(|r| r.score))
}

fn members<'a>(
    records: &'a [CategorizedRespondent],
    label: &'a str,
) -> impl Iterator<Item = &'a CategorizedRespondent> + 'a {
    records.iter().filter(move |r| r.has_label(label))
}

/// Statistics for one label.
pub fn sector_stat(records: &[CategorizedRespondent], label: &str) -> SectorStat {
    let respondent_count = members(records, label).count();
    let scores = valid_scores(members(records, label).map(|r| r.score));

    let stat = SectorStat {
        sector: label.to_string(),
        average_score: mean(&scores),
        std_dev: sample_std_dev(&scores),
        respondent_count,
    };
    debug!(
        "{}: n={} mean={} sd={}",
        stat.sector, stat.respondent_count, stat.average_score, stat.std_dev
    );
    stat
}

/// Statistics for every label, in catalog order.
pub fn sector_stats(records: &[CategorizedRespondent], catalog: &SectorCatalog) -> Vec<SectorStat> {
    catalog
        .labels()
        .map(|label| sector_stat(records, label))
        .collect()
}

/// Score 1..=6 counts and shares for one label.
///
/// Shares are taken of the label's respondent count, so rows without a
/// valid score lower the total below 100.
pub fn score_distribution(
    records: &[CategorizedRespondent],
    label: &str,
) -> Vec<ScoreDistributionRow> {
    let respondent_count = members(records, label).count();
    let histogram = ScoreHistogram::from_scores(members(records, label).map(|r| r.score));

    histogram
        .iter()
        .map(|(score, count)| ScoreDistributionRow {
            sector: label.to_string(),
            score,
            count,
            percentage: percentage(count, respondent_count),
        })
        .collect()
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64) * 100.0
    }
}

/// Sort sector statistics by average score, highest first.
///
/// Labels without data sort last; ties keep their current order.
pub fn sort_by_average_desc(stats: &mut [SectorStat]) {
    stats.sort_by(|a, b| a.average_score.cmp_desc(&b.average_score));
}

/// Sort sector statistics by respondent count, largest first.
///
/// Ties keep their current order.
pub fn sort_by_respondent_count_desc(stats: &mut [SectorStat]) {
    stats.sort_by_key(|s| Reverse(s.respondent_count));
}

/// Distribution rows for every label, labels in the given order.
pub fn distribution_in_order(
    records: &[CategorizedRespondent],
    order: &[SectorStat],
) -> Vec<ScoreDistributionRow> {
    order
        .iter()
        .flat_map(|stat| score_distribution(records, &stat.sector))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::categorizer::categorize;
    use crate::config::SectorConfig;

    fn respondent(row: usize, score: Option<u8>, sector: &str) -> Respondent {
        Respondent {
            row,
            score,
            sector_text: Some(sector.to_string()),
            comment: None,
        }
    }

    fn catalog() -> SectorCatalog {
        SectorCatalog::from(&SectorConfig::default())
    }

    fn stat_for<'a>(stats: &'a [SectorStat], label: &str) -> &'a SectorStat {
        stats.iter().find(|s| s.sector == label).unwrap()
    }

    #[test]
    fn test_mean_and_std_dev() {
        let values = [1.0, 2.0, 3.0, 3.0, 4.0, 5.0];
        assert_eq!(mean(&values), Stat::Value(3.0));
        let sd = sample_std_dev(&values).value().unwrap();
        assert!((sd - 2.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_no_data_edge_cases() {
        assert_eq!(mean(&[]), Stat::NoData);
        assert_eq!(sample_std_dev(&[]), Stat::NoData);
        assert_eq!(mean(&[4.0]), Stat::Value(4.0));
        assert_eq!(sample_std_dev(&[4.0]), Stat::NoData);
    }

    #[test]
    fn test_single_sector_example() {
        let respondents: Vec<_> = [1, 2, 3, 3, 4, 5]
            .iter()
            .enumerate()
            .map(|(i, s)| respondent(i + 1, Some(*s), "Bygg"))
            .collect();
        let categorized = categorize(&respondents, &catalog());
        let stats = sector_stats(&categorized.records, &catalog());

        let bygg = stat_for(&stats, "Bygg");
        assert_eq!(bygg.respondent_count, 6);
        assert_eq!(bygg.average_score, Stat::Value(3.0));
        assert!((bygg.std_dev.value().unwrap() - 1.414).abs() < 1e-3);

        let handel = stat_for(&stats, "Handel");
        assert_eq!(handel.respondent_count, 0);
        assert!(handel.average_score.is_no_data());
        assert!(handel.std_dev.is_no_data());
    }

    #[test]
    fn test_single_respondent_has_no_std_dev() {
        let categorized = categorize(&[respondent(1, Some(5), "Transport")], &catalog());
        let stat = sector_stat(&categorized.records, "Transport");
        assert_eq!(stat.respondent_count, 1);
        assert_eq!(stat.average_score, Stat::Value(5.0));
        assert!(stat.std_dev.is_no_data());
    }

    #[test]
    fn test_fan_out_counts_exceed_respondents() {
        let respondents = vec![
            respondent(1, Some(2), "Bygg och Handel"),
            respondent(2, Some(4), "Industri"),
            respondent(3, Some(6), "Något helt annat"),
        ];
        let categorized = categorize(&respondents, &catalog());
        let stats = sector_stats(&categorized.records, &catalog());

        let total: usize = stats.iter().map(|s| s.respondent_count).sum();
        assert_eq!(total, 4);
        assert!(total >= respondents.len());
        assert_eq!(stat_for(&stats, "Bygg").respondent_count, 1);
        assert_eq!(stat_for(&stats, "Handel").respondent_count, 1);
        assert_eq!(stat_for(&stats, "Other").respondent_count, 1);
    }

    #[test]
    fn test_missing_scores_count_as_respondents_only() {
        let respondents = vec![
            respondent(1, Some(2), "Handel"),
            respondent(2, None, "Handel"),
            respondent(3, Some(4), "Handel"),
        ];
        let categorized = categorize(&respondents, &catalog());
        let stat = sector_stat(&categorized.records, "Handel");
        assert_eq!(stat.respondent_count, 3);
        assert_eq!(stat.average_score, Stat::Value(3.0));
    }

    #[test]
    fn test_distribution_percentages() {
        let respondents = vec![
            respondent(1, Some(1), "Handel"),
            respondent(2, Some(1), "Handel"),
            respondent(3, Some(6), "Handel"),
        ];
        let categorized = categorize(&respondents, &catalog());

        let rows = score_distribution(&categorized.records, "Handel");
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[5].count, 1);
        let sum: f64 = rows.iter().map(|r| r.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
        let counted: usize = rows.iter().map(|r| r.count).sum();
        assert_eq!(counted, 3);

        let empty = score_distribution(&categorized.records, "Bygg");
        assert!(empty.iter().all(|r| r.count == 0 && r.percentage == 0.0));
    }

    #[test]
    fn test_sort_by_average_no_data_last() {
        let mut stats = vec![
            SectorStat {
                sector: "A".to_string(),
                average_score: Stat::NoData,
                std_dev: Stat::NoData,
                respondent_count: 0,
            },
            SectorStat {
                sector: "B".to_string(),
                average_score: Stat::Value(2.0),
                std_dev: Stat::NoData,
                respondent_count: 1,
            },
            SectorStat {
                sector: "C".to_string(),
                average_score: Stat::Value(4.5),
                std_dev: Stat::NoData,
                respondent_count: 1,
            },
        ];
        sort_by_average_desc(&mut stats);
        let order: Vec<_> = stats.iter().map(|s| s.sector.as_str()).collect();
        assert_eq!(order, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_sort_by_respondent_count_is_stable() {
        let respondents = vec![
            respondent(1, Some(3), "Transport"),
            respondent(2, Some(3), "Transport"),
            respondent(3, Some(5), "Bygg"),
            respondent(4, Some(1), "Handel"),
        ];
        let categorized = categorize(&respondents, &catalog());
        let mut stats = sector_stats(&categorized.records, &catalog());
        sort_by_respondent_count_desc(&mut stats);

        let order: Vec<_> = stats.iter().take(3).map(|s| s.sector.as_str()).collect();
        assert_eq!(order, vec!["Transport", "Bygg", "Handel"]);
    }

    #[test]
    fn test_overall_stats_ignore_missing_scores() {
        let respondents = vec![
            respondent(1, Some(2), "Bygg"),
            respondent(2, None, "Bygg"),
            respondent(3, Some(4), "Handel"),
        ];
        let overall = overall_stats(&respondents);
        assert_eq!(overall.total_count, 2);
        assert_eq!(overall.total_respondents, 3);
        assert_eq!(overall.total_mean, Stat::Value(3.0));
        assert!((overall.total_std_dev.value().unwrap() - 2.0_f64.sqrt()).abs() < 1e-9);
    }
}
