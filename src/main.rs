//! ux-sweep main entry point
//!
//! This is the command-line interface for the batch UX analysis pipeline.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use ux_sweep::config::{load_config_with_hash, AnalysisOptions, PipelineConfig};
use ux_sweep::crawler::{discover, DiscoveryOptions};
use ux_sweep::llm::OpenAiModel;
use ux_sweep::output::{read_json, write_discovery, write_json};
use ux_sweep::stages::analysis::{build_report, AnalysisFile};
use ux_sweep::{validate_report, Orchestrator, RunOptions};

/// ux-sweep: batch UX analysis of websites
///
/// Crawls each configured site, captures screenshots and performance audits,
/// asks a language model for a UX review of every page and assembles the
/// reviews into a validated report.
#[derive(Parser, Debug)]
#[command(name = "ux-sweep")]
#[command(version)]
#[command(about = "Batch UX analysis pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline for the presets in a configuration file
    Run {
        /// Preset file (TOML, or JSON by extension)
        #[arg(value_name = "PRESETS")]
        presets: PathBuf,

        /// Directory for run directories (overrides the config's output-dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Run only this preset
        #[arg(long)]
        specific_preset: Option<String>,

        /// Resume the latest run directory at this stage
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        skip_to_step: Option<u8>,

        /// Remove existing run directories before running
        #[arg(long)]
        force_overwrite: bool,
    },

    /// Discover URLs for a single site
    Discover {
        #[arg(long)]
        url: String,

        /// Directory for urls.json and urls_simple.json
        #[arg(long, default_value = ".")]
        output: PathBuf,

        #[arg(long)]
        max_pages: Option<u32>,

        #[arg(long)]
        concurrency: Option<u32>,

        /// Per-request timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,

        #[arg(long)]
        max_urls_total: Option<u32>,
    },

    /// Format an analysis.json into a validated structured-analysis.json
    Format {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Formatting model
        #[arg(long)]
        model: Option<String>,

        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Validate a structured report and print the repairs it needs
    Validate {
        #[arg(value_name = "REPORT")]
        report: PathBuf,

        /// Write the repaired report here
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Command::Run {
            presets,
            output_dir,
            specific_preset,
            skip_to_step,
            force_overwrite,
        } => {
            handle_run(
                presets,
                output_dir,
                specific_preset,
                skip_to_step,
                force_overwrite,
            )
            .await
        }
        Command::Discover {
            url,
            output,
            max_pages,
            concurrency,
            timeout,
            max_urls_total,
        } => {
            let mut options = AnalysisOptions::default();
            options.max_pages = max_pages.unwrap_or(options.max_pages);
            options.concurrency = concurrency.unwrap_or(options.concurrency);
            options.timeout = timeout.unwrap_or(options.timeout);
            options.max_urls_total = max_urls_total.unwrap_or(options.max_urls_total);
            handle_discover(&url, output, DiscoveryOptions::from(&options)).await
        }
        Command::Format {
            input,
            output,
            model,
            concurrency,
        } => handle_format(input, output, model, concurrency).await,
        Command::Validate { report, output } => handle_validate(report, output),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ux_sweep=info,warn"),
            1 => EnvFilter::new("ux_sweep=debug,info"),
            2 => EnvFilter::new("ux_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Runs the pipeline; returns false if any preset failed
async fn handle_run(
    presets: PathBuf,
    output_dir: Option<PathBuf>,
    specific_preset: Option<String>,
    skip_to_step: Option<u8>,
    force_overwrite: bool,
) -> anyhow::Result<bool> {
    tracing::info!("Loading presets from: {}", presets.display());
    let (config, hash) = load_config_with_hash(&presets)
        .with_context(|| format!("failed to load {}", presets.display()))?;
    tracing::info!(
        "Loaded {} preset(s) (hash: {})",
        config.presets.len(),
        &hash[..12]
    );

    let options = RunOptions {
        output_dir: output_dir.unwrap_or_else(|| PathBuf::from(&config.pipeline.output_dir)),
        specific_preset,
        skip_to_step,
        force_overwrite,
    };

    let orchestrator = Orchestrator::standard(config.pipeline.clone());
    let report = orchestrator.run(&config.presets, &options).await;
    Ok(report.all_succeeded())
}

async fn handle_discover(url: &str, output: PathBuf, options: DiscoveryOptions) -> anyhow::Result<bool> {
    let discovery = discover(url, &options)
        .await
        .with_context(|| format!("discovery of {} failed", url))?;

    if discovery.urls.is_empty() {
        tracing::error!("No pages reachable from {}", url);
        return Ok(false);
    }

    let path = write_discovery(&output, &discovery)
        .with_context(|| format!("failed to write discovery files to {}", output.display()))?;
    println!("{} URLs written to {}", discovery.urls.len(), path.display());
    Ok(true)
}

async fn handle_format(
    input: PathBuf,
    output: PathBuf,
    model: Option<String>,
    concurrency: Option<usize>,
) -> anyhow::Result<bool> {
    let analysis: AnalysisFile =
        read_json(&input).with_context(|| format!("failed to read {}", input.display()))?;

    let defaults = AnalysisOptions::default();
    let model_name = model.unwrap_or(defaults.formatting_model);
    let concurrency = concurrency.unwrap_or(defaults.llm_concurrency as usize);

    let client = OpenAiModel::from_env(&PipelineConfig::default().api_base_url)?;
    let result = build_report(Arc::new(client), &model_name, concurrency, &analysis).await;

    write_json(&output, &result.data)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!(
        "{} pages formatted ({} via heuristic fallback) into {}",
        result.data.page_analyses.len(),
        result.data.metadata.pages_heuristic_fallback,
        output.display()
    );
    Ok(true)
}

/// Validates a report file; returns false if it needed repairs
fn handle_validate(report: PathBuf, output: Option<PathBuf>) -> anyhow::Result<bool> {
    let raw: serde_json::Value =
        read_json(&report).with_context(|| format!("failed to read {}", report.display()))?;
    let result = validate_report(&raw);

    if result.valid {
        println!("✓ {} is valid", report.display());
    } else {
        println!("{} needed {} repair(s):", report.display(), result.errors.len());
        for error in &result.errors {
            println!("  - {}", error);
        }
    }

    if let Some(path) = output {
        write_json(&path, &result.data)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Repaired report written to {}", path.display());
    }

    Ok(result.valid)
}
