//! Survey analysis.
//!
//! Categorization of free-text sector answers, score aggregation per
//! sector, and selection of comments for the summarizer.

pub mod aggregator;
pub mod categorizer;
pub mod comments;
pub mod pipeline;

pub use categorizer::SectorCatalog;
pub use pipeline::{analyze, AnalysisOptions};
