//! Survey Dashboard - sector statistics for the municipal competition survey
//!
//! A CLI tool that categorizes survey respondents by sector, aggregates
//! their scores, renders a Markdown/JSON dashboard and summarizes
//! low-score comments with a language model.
//!
//! Exit codes:
//!   0 - Success (including a failed or skipped comment summary)
//!   1 - Runtime error (config, missing file or column, unknown sector, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod loader;
mod models;
mod report;
mod summary;

use analysis::{AnalysisOptions, SectorCatalog};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use models::{Dashboard, ReportMetadata, SummaryOutcome};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use summary::summarize_comments;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Resolve configuration; logging depends on it
    let (mut config, source) = match Config::resolve(args.config.as_deref()) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(config.log_level(&args));

    info!("Survey Dashboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    match run_dashboard(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Dashboard failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .survey-dashboard.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize input columns, sectors, model, and more.");
    Ok(())
}

/// Initialize logging at the resolved level.
fn init_logging(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete dashboard workflow. Returns the exit code.
async fn run_dashboard(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    // Step 1: Load the survey
    let input = PathBuf::from(&config.input.path);
    if !args.quiet {
        println!("📥 Loading survey: {}", input.display());
    }
    let table = loader::load_survey(&input, &config.input)
        .with_context(|| format!("Failed to load survey {}", input.display()))?;

    // Step 2: Categorize and aggregate
    let catalog = SectorCatalog::from(&config.sectors);
    let options = AnalysisOptions {
        selection: args.sector.clone(),
        comment_score_threshold: config.report.comment_score_threshold,
    };
    let analysis = analysis::analyze(&table.respondents, &catalog, &options)?;

    if !args.quiet {
        println!("\n📊 Sector summary ({} respondents):", analysis.overall.total_respondents);
        println!("{}", report::summary_table(&analysis.summary_table));
        println!(
            "   Totalt medelvärde: {} | Total standardavvikelse: {} | Totalt antal svar: {}",
            analysis.overall.total_mean,
            analysis.overall.total_std_dev,
            analysis.overall.total_count
        );
    }

    // Step 3: Summarize comments
    let (summary, model_used) = if args.no_summary {
        info!("Comment summary skipped (--no-summary)");
        (SummaryOutcome::Skipped, None)
    } else {
        let outcome = summarize_comments(&config.model, &analysis.comments, args.quiet).await;
        (outcome, Some(config.model.name.clone()))
    };

    // Step 4: Build and save the report
    let dashboard = Dashboard {
        metadata: ReportMetadata {
            source_file: input.display().to_string(),
            generated_at: Utc::now(),
            model_used,
            invalid_scores: table.invalid_scores,
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        analysis,
        summary,
    };

    let output_path = output_path(&args, &config);
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&dashboard)?,
        OutputFormat::Markdown => report::generate_markdown_report(&dashboard, &config.report),
    };

    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    if let Some(ref dir) = args.export_dir {
        let written = report::export_tables(dir, &dashboard.analysis)?;
        if !args.quiet {
            for path in written {
                println!("   📄 {}", path.display());
            }
        }
    }

    if !args.quiet {
        println!(
            "\n✅ Dashboard complete in {:.1}s! Report saved to: {}",
            start_time.elapsed().as_secs_f64(),
            output_path.display()
        );
    }

    Ok(0)
}

/// Report path: CLI, then config; JSON output swaps a default `.md` extension.
fn output_path(args: &Args, config: &Config) -> PathBuf {
    if let Some(ref output) = args.output {
        return output.clone();
    }
    let path = PathBuf::from(&config.general.output);
    match args.format {
        OutputFormat::Json if path.extension().is_some_and(|e| e == "md") => {
            path.with_extension("json")
        }
        _ => path,
    }
}
