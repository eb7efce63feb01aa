//! Domain error types.
//!
//! Loading and aggregation failures abort the run. Summary failures are
//! reported in their own variant so the caller can keep the rest of the
//! dashboard.

use thiserror::Error;

/// Errors raised while loading, analysing or summarising the survey.
#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("Column not found in survey file: {0}")]
    MissingColumn(String),

    #[error("Survey file contains no responses: {0}")]
    EmptyInput(String),

    #[error("Failed to read survey file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read survey workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Invalid input settings: {0}")]
    InvalidInput(String),

    #[error("Unknown sector '{0}'")]
    UnknownSector(String),

    #[error("Summary generation failed: {reason}")]
    Summary { reason: String },
}

impl SurveyError {
    /// Shorthand for a summary failure.
    pub fn summary(reason: impl Into<String>) -> Self {
        SurveyError::Summary {
            reason: reason.into(),
        }
    }
}

/// Result type for survey operations.
pub type Result<T> = std::result::Result<T, SurveyError>;
