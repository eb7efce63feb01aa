//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::SectorSelection;
use clap::Parser;
use std::path::PathBuf;

/// Survey Dashboard - sector statistics for the municipal competition survey
///
/// Categorizes respondents by sector, computes score statistics and
/// distributions, and summarizes low-score comments with a language model.
///
/// Examples:
///   survey-dashboard --input Företagsenkät.xlsx
///   survey-dashboard --input svar.csv --sector Handel
///   survey-dashboard --input svar.csv --format json --no-summary
///   survey-dashboard --input svar.csv --export-dir charts
///   survey-dashboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Survey file to analyze (xlsx workbook or CSV export)
    ///
    /// Defaults to input.path from the configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .survey-dashboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sector whose low-score comments are summarized ("all" for every row)
    #[arg(short, long, default_value = "all", value_name = "SECTOR")]
    pub sector: SectorSelection,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Directory for chart-ready CSV tables
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,

    /// Model used for the comment summary
    #[arg(short, long, env = "SURVEY_MODEL")]
    pub model: Option<String>,

    /// Ollama-compatible API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// API credential for hosted endpoints
    #[arg(long, env = "SURVEY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Temperature for the summary (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Skip the comment summary (no model call)
    #[arg(long)]
    pub no_summary: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .survey-dashboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    ///
    /// Sector names are checked later, against the configured dictionary.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if !self.no_summary {
            if let Some(ref url) = self.ollama_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
                }
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            input: None,
            config: None,
            sector: SectorSelection::All,
            output: None,
            format: OutputFormat::Markdown,
            export_dir: None,
            model: None,
            ollama_url: None,
            api_key: None,
            temperature: None,
            timeout: None,
            no_summary: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_sector_selection() {
        let args = Args::try_parse_from(["survey-dashboard", "--sector", "Handel"]).unwrap();
        assert_eq!(args.sector, SectorSelection::Sector("Handel".to_string()));

        let args = Args::try_parse_from(["survey-dashboard"]).unwrap();
        assert_eq!(args.sector, SectorSelection::All);
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.ollama_url = Some("localhost:11434".to_string());
        assert!(args.validate().is_err());

        args.no_summary = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_temperature_range() {
        let mut args = make_args();
        args.temperature = Some(1.5);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_input() {
        let mut args = make_args();
        args.input = Some(PathBuf::from("/definitely/not/here.csv"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
