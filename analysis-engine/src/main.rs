use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use analysis_engine::config::Config;
use analysis_engine::inference::InferenceEngine;
use analysis_engine::queue::FileWatchDaemon;
use analysis_engine::scanners::{self, log_scan_failure, DatasetBuilder, FileScanner, SampleLabel};
use anyhow::{Context, Result};
use clap::Parser;
use shared::observability::init_logging;
use tracing::{error, info};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_logging(config.log_config("entropyx")).context("Failed to initialize logging")?;

    match args.command {
        Command::Watch { .. } => watch(&config).await,
        Command::Scan { paths } => scan(&config, &paths).await,
        Command::Dataset {
            input,
            label,
            family,
            output,
        } => dataset(&config, &input, label, family, &output).await,
    }
}

/// Artifacts are loaded before anything else so a bad model never
/// reaches the point of subscribing to the filesystem.
fn load_scanner(config: &Config) -> Result<FileScanner> {
    let engine = InferenceEngine::load(&config.model.model_path, &config.model.scaler_path)
        .context("Failed to load trained artifacts")?;
    Ok(FileScanner::new(config.scanner_config(), Arc::new(engine)))
}

async fn watch(config: &Config) -> Result<()> {
    info!("Starting Entropy-X watch daemon");
    let scanner = load_scanner(config)?;
    let daemon = FileWatchDaemon::new(config.watch_config(), scanner);

    let stats = daemon
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await
        .context("Watch daemon failed")?;

    info!(
        processed = stats.processed,
        malicious = stats.malicious,
        skipped = stats.skipped,
        abandoned = stats.abandoned,
        "Shutdown complete"
    );
    Ok(())
}

async fn scan(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let scanner = load_scanner(config)?;
    let mut failed = 0usize;

    for path in paths {
        let job = scanner.clone();
        let target = path.clone();
        match tokio::task::spawn_blocking(move || job.scan(&target))
            .await
            .context("Scan task failed")?
        {
            Ok(report) => scanner.emit(&report),
            Err(e) => {
                log_scan_failure(&e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files could not be scanned", failed, paths.len());
    }
    Ok(())
}

async fn dataset(
    config: &Config,
    input: &Path,
    label: SampleLabel,
    family: Option<String>,
    output: &Path,
) -> Result<()> {
    let builder = DatasetBuilder::new(label, family, config.scanner.max_file_size);
    let input = input.to_path_buf();

    let batch = tokio::task::spawn_blocking(move || {
        let paths = builder.collect(&input);
        builder.extract_all(&paths)
    })
    .await
    .context("Dataset extraction failed")?;

    for failure in &batch.failures {
        log_scan_failure(failure);
    }

    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    scanners::dataset::write_csv(&batch.records, file)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        output = %output.display(),
        records = batch.records.len(),
        skipped = batch.failures.len(),
        "Dataset written"
    );
    Ok(())
}
