//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.survey-dashboard.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".survey-dashboard.toml";

/// Where the run's configuration came from.
///
/// Configuration is resolved before logging is set up, so the outcome is
/// kept and logged afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Builtin,
    /// The default file exists but could not be loaded.
    Fallback(String),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Builtin => debug!("No config file found, using defaults"),
            ConfigSource::Fallback(reason) => {
                warn!("Failed to load config: {}; using defaults", reason)
            }
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Survey file layout.
    #[serde(default)]
    pub input: InputConfig,

    /// Sector dictionary.
    #[serde(default)]
    pub sectors: SectorConfig,

    /// Text-generation settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "survey_report.md".to_string()
}

/// Layout of the survey export.
///
/// Score and comment columns are addressed by position, the sector column
/// by its header text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Path to the survey file.
    #[serde(default = "default_input_path")]
    pub path: String,

    /// Field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// 0-based index of the score column.
    #[serde(default = "default_score_column")]
    pub score_column: usize,

    /// 0-based index of the comment column.
    #[serde(default = "default_comment_column")]
    pub comment_column: usize,

    /// Header of the free-text sector column.
    #[serde(default = "default_sector_column")]
    pub sector_column: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            delimiter: default_delimiter(),
            score_column: default_score_column(),
            comment_column: default_comment_column(),
            sector_column: default_sector_column(),
        }
    }
}

fn default_input_path() -> String {
    "survey.csv".to_string()
}

fn default_delimiter() -> char {
    ','
}

fn default_score_column() -> usize {
    2
}

fn default_comment_column() -> usize {
    5
}

fn default_sector_column() -> String {
    // The trailing space is part of the exported header.
    "Inom vilken bransch/vilka branscher upplever du att detta sker? ".to_string()
}

/// Sector dictionary: the named sectors in presentation order plus the
/// fallback label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorConfig {
    #[serde(default = "default_sector_names")]
    pub names: Vec<String>,

    #[serde(default = "default_other_label")]
    pub other_label: String,
}

impl Default for SectorConfig {
    fn default() -> Self {
        Self {
            names: default_sector_names(),
            other_label: default_other_label(),
        }
    }
}

fn default_sector_names() -> Vec<String> {
    vec![
        "Besöksnäring",
        "Bygg",
        "Fastigheter",
        "Handel",
        "Industri",
        "Information",
        "Jordbruk, skog, fiske",
        "Personliga tjänster",
        "Skola, utbildning",
        "Tjänster till företag",
        "Transport",
        "Vård & omsorg",
        "Upplever inte att det sker",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_other_label() -> String {
    "Other".to_string()
}

/// Text-generation model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama-compatible API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Bearer credential for hosted endpoints. Never written by `--init-config`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            api_key: None,
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout() -> u64 {
    300
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Comments are collected from rows scoring strictly below this value.
    #[serde(default = "default_comment_threshold")]
    pub comment_score_threshold: u8,

    /// List the original rows of respondents categorized as the fallback label.
    #[serde(default = "default_true")]
    pub include_other_responses: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            comment_score_threshold: default_comment_threshold(),
            include_other_responses: true,
        }
    }
}

fn default_comment_threshold() -> u8 {
    3
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Resolve the configuration for a run.
    ///
    /// An explicit path must load. The default file is optional, and an
    /// unreadable one falls back to built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, ConfigSource::File(path.to_path_buf())));
        }

        match Self::load_default() {
            Ok(Some(config)) => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                Ok((config, ConfigSource::File(path)))
            }
            Ok(None) => Ok((Config::default(), ConfigSource::Builtin)),
            Err(e) => Ok((Config::default(), ConfigSource::Fallback(format!("{:#}", e)))),
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the user actually supplied override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref input) = args.input {
            self.input.path = input.display().to_string();
        }
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if let Some(ref key) = args.api_key {
            self.model.api_key = Some(key.clone());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level after merging: `-q` wins, then `-v` or `general.verbose`.
    pub fn log_level(&self, args: &crate::cli::Args) -> tracing::Level {
        if !args.quiet && self.general.verbose {
            tracing::Level::DEBUG
        } else {
            args.log_level()
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
