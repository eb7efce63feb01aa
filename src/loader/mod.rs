//! Survey file loader.
//!
//! Reads the survey workbook, or a delimited export of it, into
//! [`Respondent`] rows. The score and comment
//! columns are addressed by position, the sector column by header text.
//! The layout is assumed: a missing column is fatal, a bad score only
//! excludes that row from score statistics.

use crate::config::InputConfig;
use crate::error::{Result, SurveyError};
use crate::models::{Respondent, MAX_SCORE, MIN_SCORE};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::path::Path;
use tracing::{debug, info, warn};

/// The loaded survey.
#[derive(Debug, Clone)]
pub struct SurveyTable {
    pub respondents: Vec<Respondent>,
    /// Rows whose score cell was non-empty but not a score 1-6.
    pub invalid_scores: usize,
}

/// Resolved column positions.
#[derive(Debug, Clone, Copy)]
struct Columns {
    score: usize,
    comment: usize,
    sector: usize,
}

/// Load the survey file at `path`.
///
/// Spreadsheet workbooks are read from their first worksheet; anything
/// else is read as delimited text.
pub fn load_survey(path: &Path, config: &InputConfig) -> Result<SurveyTable> {
    info!("Loading survey from: {}", path.display());

    let (headers, rows) = if is_workbook(path) {
        read_workbook(path)?
    } else {
        read_csv(path, config)?
    };

    build_table(path, &headers, rows, config)
}

/// Whether `path` names a spreadsheet workbook.
pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| WORKBOOK_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

type Rows = Vec<Vec<String>>;

fn read_csv(path: &Path, config: &InputConfig) -> Result<(Vec<String>, Rows)> {
    let delimiter = u8::try_from(config.delimiter).map_err(|_| {
        SurveyError::InvalidInput(format!(
            "delimiter '{}' is not a single-byte character",
            config.delimiter
        ))
    })?;

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.iter().map(String::from).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(String::from).collect());
    }
    Ok((headers, rows))
}

fn read_workbook(path: &Path) -> Result<(Vec<String>, Rows)> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SurveyError::EmptyInput(path.display().to_string()))??;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>());
    let headers = rows
        .next()
        .ok_or_else(|| SurveyError::EmptyInput(path.display().to_string()))?;
    Ok((headers, rows.collect()))
}

fn build_table(
    path: &Path,
    headers: &[String],
    rows: Rows,
    config: &InputConfig,
) -> Result<SurveyTable> {
    let columns = resolve_columns(headers, config)?;
    debug!(
        "Columns: score={:?}, comment={:?}, sector={:?}",
        headers[columns.score], headers[columns.comment], headers[columns.sector]
    );

    let mut respondents = Vec::with_capacity(rows.len());
    let mut invalid_scores = 0usize;

    for (idx, cells) in rows.iter().enumerate() {
        let row = idx + 1;

        let raw_score = field(cells, columns.score);
        let score = parse_score(raw_score);
        if score.is_none() && raw_score.is_some() {
            invalid_scores += 1;
            warn!("Row {}: ignoring invalid score {:?}", row, raw_score.unwrap_or_default());
        }

        respondents.push(Respondent {
            row,
            score,
            sector_text: field(cells, columns.sector).map(String::from),
            comment: field(cells, columns.comment).map(String::from),
        });
    }

    if respondents.is_empty() {
        return Err(SurveyError::EmptyInput(path.display().to_string()));
    }

    info!(
        "Loaded {} responses ({} invalid scores)",
        respondents.len(),
        invalid_scores
    );

    Ok(SurveyTable {
        respondents,
        invalid_scores,
    })
}

fn resolve_columns(headers: &[String], config: &InputConfig) -> Result<Columns> {
    let positional = |index: usize, what: &str| {
        if index < headers.len() {
            Ok(index)
        } else {
            Err(SurveyError::MissingColumn(format!(
                "{} column at index {} (file has {} columns)",
                what,
                index,
                headers.len()
            )))
        }
    };

    let score = positional(config.score_column, "score")?;
    let comment = positional(config.comment_column, "comment")?;

    // Exact header first; exports sometimes drop trailing whitespace.
    let wanted = config.sector_column.as_str();
    let sector = headers
        .iter()
        .position(|h| h == wanted)
        .or_else(|| headers.iter().position(|h| h.trim() == wanted.trim()))
        .ok_or_else(|| SurveyError::MissingColumn(wanted.trim().to_string()))?;

    Ok(Columns {
        score,
        comment,
        sector,
    })
}

/// A non-empty cell, or `None` for an empty or absent one.
fn field(cells: &[String], index: usize) -> Option<&str> {
    cells
        .get(index)
        .map(String::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Parse a score cell.
///
/// Accepts integral values in 1..=6, including spreadsheet renderings such
/// as `"3.0"`. Anything else is treated as missing.
pub fn parse_score(s: Option<&str>) -> Option<u8> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let value: f64 = s.replace(',', ".").parse().ok()?;
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value < MIN_SCORE as f64 || value > MAX_SCORE as f64 {
        return None;
    }
    Some(value as u8)
}
