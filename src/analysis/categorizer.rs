//! Sector categorization.
//!
//! Each respondent's free-text sector answer is matched against the named
//! sectors by case-sensitive substring containment. Matching is not
//! exclusive: an answer naming two sectors belongs to both. Answers that
//! match none of the named sectors (including empty answers) are relabeled
//! with the fallback label.

use crate::config::SectorConfig;
use crate::models::{CategorizedRespondent, Respondent};
use tracing::{debug, info};

/// Ordered sector dictionary: named sectors plus the fallback label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorCatalog {
    names: Vec<String>,
    other: String,
}

impl SectorCatalog {
    pub fn new(names: Vec<String>, other: impl Into<String>) -> Self {
        Self {
            names,
            other: other.into(),
        }
    }

    /// The fallback label.
    pub fn other(&self) -> &str {
        &self.other
    }

    /// Every label, named sectors first and the fallback last.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.other.as_str()))
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.labels().any(|l| l == label)
    }

    /// Named sectors contained in `text`, in catalog order.
    pub fn matching_sectors<'a>(&'a self, text: Option<&str>) -> Vec<&'a str> {
        match text {
            Some(text) => self
                .names
                .iter()
                .map(String::as_str)
                .filter(|name| text.contains(name))
                .collect(),
            None => Vec::new(),
        }
    }
}

impl From<&SectorConfig> for SectorCatalog {
    fn from(config: &SectorConfig) -> Self {
        Self::new(config.names.clone(), config.other_label.clone())
    }
}

/// Result of categorizing the survey table.
#[derive(Debug, Clone)]
pub struct Categorized {
    pub records: Vec<CategorizedRespondent>,
    /// Original rows of respondents relabeled with the fallback label.
    pub other_responses: Vec<Respondent>,
}

/// Categorize every respondent against the catalog.
///
/// Respondents matching no named sector have their sector field replaced
/// by the fallback label. Label membership is then every label the
/// (possibly replaced) field contains.
pub fn categorize(respondents: &[Respondent], catalog: &SectorCatalog) -> Categorized {
    let mut records = Vec::with_capacity(respondents.len());
    let mut other_responses = Vec::new();

    for respondent in respondents {
        let matched = catalog.matching_sectors(respondent.sector_text.as_deref());

        let sector_field = if matched.is_empty() {
            other_responses.push(respondent.clone());
            catalog.other().to_string()
        } else {
            respondent.sector_text.clone().unwrap_or_default()
        };

        let labels: Vec<String> = catalog
            .labels()
            .filter(|label| sector_field.contains(label))
            .map(String::from)
            .collect();

        debug!("Row {} labels: {:?}", respondent.row, labels);

        records.push(CategorizedRespondent {
            row: respondent.row,
            score: respondent.score,
            sector_field,
            labels,
            comment: respondent.comment.clone(),
        });
    }

    info!(
        "Categorized {} respondents ({} as {})",
        records.len(),
        other_responses.len(),
        catalog.other()
    );

    Categorized {
        records,
        other_responses,
    }
}
