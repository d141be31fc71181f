//! Command-line driver for the VAST pipelines.
//!
//! ```text
//! vast --config vast.toml find-voids --num-cpus 4
//! vast --config vast.toml --json classify
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vast_rust::config::PipelineConfig;
use vast_rust::engine::python::PyVoidFinder;
use vast_rust::pipeline::{ClassificationPipeline, VoidFindingPipeline};

#[derive(Parser)]
#[command(name = "vast")]
#[command(about = "VAST VoidFinder driver: find voids and classify galaxy environments")]
struct Cli {
    /// Configuration file (defaults to vast.toml in the usual locations)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<Level>,

    /// Print the run report as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preprocess, mask, filter and find voids
    FindVoids {
        /// Worker processes for hole finding
        #[arg(long)]
        num_cpus: Option<usize>,

        /// Reuse valid mask and filter checkpoints from a previous run
        #[arg(long)]
        resume: bool,
    },

    /// Classify galaxies against a void catalog
    Classify,
}

fn init_logging(level: Option<Level>) {
    match (level, env::var("RUST_LOG").ok()) {
        (None, Some(_)) => FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(true)
            .init(),
        (level, _) => FmtSubscriber::builder()
            .with_max_level(level.unwrap_or(Level::INFO))
            .with_target(true)
            .init(),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::from_default_location()?,
    };
    Ok(config)
}

fn print_json<T: serde::Serialize>(report: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let config = load_config(cli.config.as_ref())?;
    let engine = PyVoidFinder::new().context("VAST VoidFinder is not available")?;

    match cli.command {
        Commands::FindVoids { num_cpus, resume } => {
            let mut settings = config.void_finding()?.clone();
            if num_cpus.is_some() {
                settings.num_cpus = num_cpus;
            }
            settings.resume |= resume;

            let report = VoidFindingPipeline::new(settings)?.run(&engine)?;
            info!(
                survey = %report.survey_name,
                wall = report.wall_count,
                field = report.field_count,
                "Void finding complete; holes in {}",
                report.holes_path.display()
            );
            if cli.json {
                print_json(&report)?;
            }
        }
        Commands::Classify => {
            let settings = config.classification()?.clone();

            let report = ClassificationPipeline::new(settings)?.run(&engine)?;
            info!(
                galaxies = report.galaxy_count,
                classified = report.classified_count,
                "Classification complete; written to {}",
                report.output_path.display()
            );
            if cli.json {
                print_json(&report)?;
            }
        }
    }

    Ok(())
}
