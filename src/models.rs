//! Data models for the survey dashboard.
//!
//! This module contains the core data structures used throughout
//! the application: raw respondents, derived sector statistics and the
//! complete dashboard report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Lowest valid survey score (strong perceived crowding-out).
pub const MIN_SCORE: u8 = 1;

/// Highest valid survey score (no perceived crowding-out).
pub const MAX_SCORE: u8 = 6;

/// A statistic that may be undefined.
///
/// `NoData` is distinct from zero: it is produced for the mean of an empty
/// group and the sample standard deviation of fewer than two scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Stat {
    Value(f64),
    NoData,
}

impl Stat {
    /// Returns the value, if defined.
    pub fn value(&self) -> Option<f64> {
        match self {
            Stat::Value(v) => Some(*v),
            Stat::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Stat::NoData)
    }

    /// Descending order with `NoData` sorted last.
    pub fn cmp_desc(&self, other: &Stat) -> Ordering {
        match (self, other) {
            (Stat::Value(a), Stat::Value(b)) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
            (Stat::Value(_), Stat::NoData) => Ordering::Less,
            (Stat::NoData, Stat::Value(_)) => Ordering::Greater,
            (Stat::NoData, Stat::NoData) => Ordering::Equal,
        }
    }
}

impl From<Option<f64>> for Stat {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(v) if v.is_finite() => Stat::Value(v),
            _ => Stat::NoData,
        }
    }
}

impl From<Stat> for Option<f64> {
    fn from(s: Stat) -> Self {
        s.value()
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stat::Value(v) => write!(f, "{:.2}", v),
            Stat::NoData => write!(f, "no data"),
        }
    }
}

/// One survey row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Respondent {
    /// Data row number in the source file (1-indexed, header excluded).
    pub row: usize,
    /// Score 1-6, `None` when missing or invalid.
    pub score: Option<u8>,
    /// Free-text sector answer, possibly naming several sectors.
    pub sector_text: Option<String>,
    /// Optional free-text comment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A respondent after categorization.
///
/// `sector_field` is the original sector text, or the fallback label when
/// none of the named sectors matched. `labels` lists every label the field
/// contains, in catalog order; a respondent may belong to several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedRespondent {
    pub row: usize,
    pub score: Option<u8>,
    pub sector_field: String,
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl CategorizedRespondent {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Per-sector score statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorStat {
    pub sector: String,
    pub average_score: Stat,
    pub std_dev: Stat,
    pub respondent_count: usize,
}

/// Count and share of one score value within one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDistributionRow {
    pub sector: String,
    pub score: u8,
    pub count: usize,
    pub percentage: f64,
}

/// Counts of each score value 1..=6.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreHistogram {
    pub counts: [usize; 6],
}

impl ScoreHistogram {
    /// Builds a histogram, ignoring missing scores.
    pub fn from_scores<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = Option<u8>>,
    {
        let mut histogram = Self::default();
        for score in scores.into_iter().flatten() {
            if (MIN_SCORE..=MAX_SCORE).contains(&score) {
                histogram.counts[(score - MIN_SCORE) as usize] += 1;
            }
        }
        histogram
    }

    /// Returns the count for a score value (0 outside 1..=6).
    pub fn count(&self, score: u8) -> usize {
        if (MIN_SCORE..=MAX_SCORE).contains(&score) {
            self.counts[(score - MIN_SCORE) as usize]
        } else {
            0
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Iterates `(score, count)` pairs in ascending score order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, usize)> + '_ {
        (MIN_SCORE..=MAX_SCORE).map(move |s| (s, self.count(s)))
    }
}

/// Statistics over the whole score column, before categorization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_mean: Stat,
    pub total_std_dev: Stat,
    /// Number of valid scores.
    pub total_count: usize,
    /// Number of rows, including rows with a missing score.
    pub total_respondents: usize,
}

/// Which rows the comment filter and selection histogram operate on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectorSelection {
    #[default]
    All,
    Sector(String),
}

impl SectorSelection {
    /// Whether a categorized sector field belongs to this selection.
    pub fn matches(&self, sector_field: &str) -> bool {
        match self {
            SectorSelection::All => true,
            SectorSelection::Sector(label) => sector_field.contains(label.as_str()),
        }
    }
}

impl FromStr for SectorSelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("all")
            || trimmed.eq_ignore_ascii_case("alla")
        {
            Ok(SectorSelection::All)
        } else {
            Ok(SectorSelection::Sector(trimmed.to_string()))
        }
    }
}

impl fmt::Display for SectorSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectorSelection::All => write!(f, "Alla"),
            SectorSelection::Sector(s) => write!(f, "{}", s),
        }
    }
}

/// Everything derived from one pass over the survey table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub overall: OverallStats,
    /// Histogram of every score in the file.
    pub total_histogram: ScoreHistogram,
    /// Sector statistics sorted by average score, descending, no-data last.
    pub summary_table: Vec<SectorStat>,
    /// Sector statistics sorted by respondent count, descending.
    pub by_respondent_count: Vec<SectorStat>,
    /// Per-(sector, score) rows, sectors in respondent-count order.
    pub distribution: Vec<ScoreDistributionRow>,
    /// Original rows of respondents categorized as the fallback label.
    pub other_responses: Vec<Respondent>,
    pub selection: SectorSelection,
    pub selection_histogram: ScoreHistogram,
    /// Deduplicated comments from low-scoring rows in the selection.
    pub comments: Vec<String>,
}

/// Outcome of the comment summary step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SummaryOutcome {
    Generated { text: String },
    Skipped,
    Failed { reason: String },
}

/// Metadata about the dashboard report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Path of the survey file.
    pub source_file: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Text-generation model, when a summary was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// Rows whose score was present but invalid.
    pub invalid_scores: usize,
    pub duration_seconds: f64,
}

/// The complete dashboard report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub metadata: ReportMetadata,
    pub analysis: Analysis,
    pub summary: SummaryOutcome,
}
