//! Comment selection for the summarizer.

use crate::models::{CategorizedRespondent, ScoreHistogram, SectorSelection};
use std::collections::HashSet;

/// Rows belonging to the selection.
pub fn select_rows<'a>(
    records: &'a [CategorizedRespondent],
    selection: &'a SectorSelection,
) -> impl Iterator<Item = &'a CategorizedRespondent> + 'a {
    records
        .iter()
        .filter(move |r| selection.matches(&r.sector_field))
}

/// Score histogram of the selected rows.
pub fn selection_histogram(
    records: &[CategorizedRespondent],
    selection: &SectorSelection,
) -> ScoreHistogram {
    ScoreHistogram::from_scores(select_rows(records, selection).map(|r| r.score))
}

/// Comments of selected rows scoring strictly below `threshold`.
///
/// Missing comments are dropped and duplicates removed, keeping the first
/// occurrence order.
pub fn low_score_comments(
    records: &[CategorizedRespondent],
    selection: &SectorSelection,
    threshold: u8,
) -> Vec<String> {
    let mut seen = HashSet::new();
    select_rows(records, selection)
        .filter(|r| r.score.is_some_and(|s| s < threshold))
        .filter_map(|r| r.comment.as_deref())
        .filter(|c| seen.insert(*c))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        row: usize,
        score: Option<u8>,
        field: &str,
        comment: Option<&str>,
    ) -> CategorizedRespondent {
        CategorizedRespondent {
            row,
            score,
            sector_field: field.to_string(),
            labels: vec![],
            comment: comment.map(String::from),
        }
    }

    #[test]
    fn test_sector_comments_deduplicated() {
        let records = vec![
            record(1, Some(1), "Handel", Some("bad")),
            record(2, Some(2), "Handel", Some("bad")),
            record(3, Some(4), "Bygg", Some("ok")),
        ];
        let selection = SectorSelection::Sector("Handel".to_string());
        assert_eq!(low_score_comments(&records, &selection, 3), vec!["bad"]);
    }

    #[test]
    fn test_all_selection_keeps_first_seen_order() {
        let records = vec![
            record(1, Some(2), "Transport", Some("dyrt")),
            record(2, Some(1), "Other", Some("orättvist")),
            record(3, Some(3), "Bygg", Some("neutral")),
            record(4, Some(1), "Bygg", None),
            record(5, None, "Bygg", Some("utan betyg")),
            record(6, Some(2), "Handel", Some("dyrt")),
        ];
        assert_eq!(
            low_score_comments(&records, &SectorSelection::All, 3),
            vec!["dyrt", "orättvist"]
        );
    }

    #[test]
    fn test_selection_uses_substring_of_sector_field() {
        let records = vec![
            record(1, Some(1), "Bygg, Handel", Some("a")),
            record(2, Some(1), "Handel", Some("b")),
            record(3, Some(1), "Transport", Some("c")),
        ];
        let selection = SectorSelection::Sector("Handel".to_string());
        assert_eq!(low_score_comments(&records, &selection, 3), vec!["a", "b"]);
    }

    #[test]
    fn test_selection_histogram() {
        let records = vec![
            record(1, Some(1), "Handel", None),
            record(2, Some(6), "Handel", None),
            record(3, Some(6), "Bygg", None),
        ];
        let selection = SectorSelection::Sector("Handel".to_string());
        let histogram = selection_histogram(&records, &selection);
        assert_eq!(histogram.count(1), 1);
        assert_eq!(histogram.count(6), 1);
        assert_eq!(histogram.total(), 2);
    }
}
