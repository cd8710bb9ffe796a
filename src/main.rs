//! Command-line entry point of the EPCI energy pipeline.
//!
//! - `process`: merge the datasets and enrich the boundaries
//! - `forecast`: project totals from the outputs of `process`
//! - `run`: both, in one pass

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use epci_energy::{pipeline, PipelineConfig};
use std::io;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Consolidate and forecast EPCI energy datasets",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    options: Options,
}

#[derive(Subcommand)]
enum Command {
    /// Merge the datasets and write the non-forecast outputs
    Process,
    /// Train on the merged table and write the forecast outputs
    Forecast,
    /// Process then forecast
    Run,
}

#[derive(Args)]
struct Options {
    /// Directory holding ratio.json, prod.json, conso.json and epci.geojson
    #[arg(long, global = true, default_value = "original_dataset")]
    dataset_dir: PathBuf,
    /// Directory receiving the outputs
    #[arg(long, global = true, default_value = "processed_data")]
    output_dir: PathBuf,
    /// Trees per forest
    #[arg(long, global = true, default_value_t = 100)]
    trees: usize,
    /// Maximum tree depth
    #[arg(long, global = true, default_value_t = 5)]
    max_depth: usize,
    /// Seed for the split and the bootstrap
    #[arg(long, global = true, default_value_t = 99)]
    seed: u64,
    /// Share of units held out for the test score
    #[arg(long, global = true, default_value_t = 0.2)]
    test_size: f64,
    /// Cross-validation folds
    #[arg(long, global = true, default_value_t = 5)]
    cv_folds: usize,
}

impl From<Options> for PipelineConfig {
    fn from(opts: Options) -> Self {
        Self {
            dataset_dir: opts.dataset_dir,
            output_dir: opts.output_dir,
            trees: opts.trees,
            max_depth: opts.max_depth,
            seed: opts.seed,
            test_size: opts.test_size,
            cv_folds: opts.cv_folds,
        }
    }
}

fn main() {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    info!("epci-pipeline v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = execute(cli) {
        error!("Pipeline failed: {:?}", e);
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    let config = PipelineConfig::from(cli.options);
    match cli.command {
        Command::Process => {
            pipeline::process(&config)?;
        }
        Command::Forecast => {
            pipeline::forecast(&config)?;
        }
        Command::Run => {
            pipeline::run(&config)?;
        }
    }
    info!("Outputs written to {}", config.output_dir.display());
    Ok(())
}
