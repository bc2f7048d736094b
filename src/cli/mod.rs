//! Command-line interface
//!
//! One subcommand per pipeline stage plus `pipeline` for the full run and
//! `serve` for the prediction server.

use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::{AppConfig, DEFAULT_CONFIG_PATH};
use crate::ingestion::{store_from_config, DataIngestion};
use crate::pipeline::TrainingPipeline;
use crate::preprocessing::DataProcessor;
use crate::server::{run_server, ServerConfig};
use crate::training::{EvaluationMetrics, ModelTrainer};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

fn print_metrics(cv_score: f64, metrics: &EvaluationMetrics) {
    println!();
    kv("CV score", &format!("{:.4}", cv_score));
    for (name, value) in metrics.as_pairs() {
        kv(name, &format!("{:.4}", value));
    }
    println!();
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hotel-reservation")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Hotel booking cancellation prediction: training pipeline and server")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the raw data and split it into train and test
    Ingest {
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Clean, encode, balance and select features
    Process {
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Search hyperparameters, train and evaluate the model
    Train {
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Run ingestion, processing and training in order
    Pipeline {
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Start the prediction server
    Serve {
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Model artifact to serve instead of the configured one
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    step_run(&format!("Loading config {}", path.display()));
    let config = AppConfig::from_yaml_file(path)?;
    step_done(&format!("artifacts → {}", config.paths.artifacts_dir.display()));
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub async fn cmd_ingest(config_path: &Path) -> anyhow::Result<()> {
    section("Ingest");
    let config = load_config(config_path)?;
    let store = store_from_config(&config.data_ingestion.storage)?;

    step_run(&format!(
        "Fetching {}/{} via {}",
        config.data_ingestion.bucket_name,
        config.data_ingestion.bucket_file_name,
        store.name()
    ));
    let start = Instant::now();
    let output = DataIngestion::new(config.data_ingestion.clone(), config.artifact_paths())
        .run(store.as_ref())
        .await?;
    step_done(&format!("{:?}", start.elapsed()));

    kv("Raw rows", &output.raw_rows.to_string());
    kv("Train rows", &output.train_rows.to_string());
    kv("Test rows", &output.test_rows.to_string());
    println!();
    Ok(())
}

pub fn cmd_process(config_path: &Path) -> anyhow::Result<()> {
    section("Process");
    let config = load_config(config_path)?;

    step_run("Processing train and test splits");
    let start = Instant::now();
    let output = DataProcessor::new(config.data_processing.clone(), config.artifact_paths()).run()?;
    step_done(&format!("{:?}", start.elapsed()));

    kv("Train rows", &output.train_rows.to_string());
    kv("Test rows", &output.test_rows.to_string());
    kv("Synthetic rows", &output.synthetic_rows.to_string());
    kv("Log1p columns", &output.skewed_columns.join(", "));
    kv("Features", &output.selected_features.join(", "));
    println!();
    Ok(())
}

pub fn cmd_train(config_path: &Path) -> anyhow::Result<()> {
    section("Train");
    let config = load_config(config_path)?;
    let pipeline = TrainingPipeline::new(config.clone());
    let tracker = pipeline.tracker();

    step_run(&format!(
        "Searching {} candidates with {}-fold CV",
        config.model_training.n_iter, config.model_training.cv
    ));
    let start = Instant::now();
    let output = ModelTrainer::new(
        config.model_training.clone(),
        config.data_processing.target_column.clone(),
        config.artifact_paths(),
    )
    .run(tracker.as_ref())?;
    step_done(&format!("{:?}", start.elapsed()));

    print_metrics(output.cv_score, &output.metrics);
    if let Some(run_id) = output.run_id {
        step_ok(&format!("Tracked run {}", run_id.cyan()));
    }
    step_ok(&format!("Model saved to {}", config.artifact_paths().model_file.display()));
    println!();
    Ok(())
}

pub async fn cmd_pipeline(config_path: &Path) -> anyhow::Result<()> {
    section("Pipeline");
    let config = load_config(config_path)?;

    step_run("Running ingestion → processing → training");
    let pipeline = TrainingPipeline::new(config);
    let report = pipeline.run().await?;
    step_done(&format!("{:.1}s", report.elapsed_secs));

    kv("Train rows", &report.processing.train_rows.to_string());
    kv("Test rows", &report.processing.test_rows.to_string());
    kv("Features", &report.processing.selected_features.join(", "));
    print_metrics(report.training.cv_score, &report.training.metrics);
    step_ok(&format!("Model saved to {}", pipeline.paths().model_file.display()));
    println!();
    Ok(())
}

pub async fn cmd_serve(config_path: &Path, model: Option<PathBuf>) -> anyhow::Result<()> {
    section("Serve");
    let config = load_config(config_path)?;
    let mut server = ServerConfig::from_app_config(&config);
    if let Some(path) = model {
        server = server.with_model_path(path);
    }

    step_ok(&format!("Model {}", server.model_path.display()));
    step_ok(&format!("Listening on {}", format!("http://{}:{}", server.host, server.port).cyan()));
    println!("  {}", dim("press ctrl+c to stop"));
    run_server(server).await
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Ingest { config } => cmd_ingest(&config).await,
        Commands::Process { config } => cmd_process(&config),
        Commands::Train { config } => cmd_train(&config),
        Commands::Pipeline { config } => cmd_pipeline(&config).await,
        Commands::Serve { config, model } => cmd_serve(&config, model).await,
    }
}
