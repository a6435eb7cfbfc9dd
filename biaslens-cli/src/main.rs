//! biaslens CLI: analyze, clean, and download datasets from the terminal.

mod commands;

use biaslens_core::{ClassifierBackend, ConfigOverrides};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// biaslens: dataset bias analysis and deterministic debiasing
#[derive(Parser, Debug)]
#[command(name = "biaslens", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file to read instead of .biaslens/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the pipeline seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Override the classifier backend (lexicon, http, none)
    #[arg(long, global = true)]
    classifier: Option<ClassifierBackend>,

    /// Override the directory cleaned datasets are stored in
    #[arg(long, global = true)]
    jobs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score a dataset for bias and print recommendations
    Analyze {
        /// CSV, JSON, or JSON Lines file
        file: PathBuf,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Stop classifying after this many seconds and report partial results
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Clean a dataset, store the result, and analyze the cleaned copy
    Clean {
        /// CSV, JSON, or JSON Lines file
        file: PathBuf,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Stop after this many seconds and keep the stages completed so far
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Fetch the cleaned CSV for a previous clean job
    Download {
        /// Job id printed by `clean`
        job_id: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "biaslens", "biaslens")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "biaslens.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let overrides = ConfigOverrides {
        config_file: cli.config,
        seed: cli.seed,
        classifier: cli.classifier,
        jobs_dir: cli.jobs_dir,
    };
    let config = biaslens_core::load_config(Some(&workspace), &overrides)?;

    commands::handle_command(cli.command, config, &workspace).await
}
