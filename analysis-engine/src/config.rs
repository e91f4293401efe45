//! Configuration module for the classifier
//!
//! Values come from environment variables (a `.env` file is honoured), each
//! with a default. Command-line flags are applied on top by the binary
//! before `validate` runs.

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use shared::observability::{LogConfig, LogFormat, LogLevel};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::ReportFormat;
use crate::queue::WatchConfig;
use crate::scanners::FileScannerConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub watch: WatchSettings,
    pub model: ModelConfig,
    pub scanner: ScannerConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            watch: WatchSettings::from_env()?,
            model: ModelConfig::from_env()?,
            scanner: ScannerConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.watch.validate()?;
        self.model.validate()?;
        self.scanner.validate()?;
        Ok(())
    }

    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            dir: self.watch.dir.clone(),
            recursive: self.watch.recursive,
            settle_delay: Duration::from_millis(self.watch.settle_delay_ms),
        }
    }

    pub fn scanner_config(&self) -> FileScannerConfig {
        FileScannerConfig {
            max_file_size: self.scanner.max_file_size,
            top_k: self.scanner.top_k,
            report_format: self.scanner.report_format,
        }
    }

    pub fn log_config(&self, service_name: &str) -> LogConfig {
        LogConfig {
            level: self.logging.level,
            format: self.logging.format,
            service_name: service_name.to_string(),
            ..LogConfig::default()
        }
    }
}

/// Watch daemon configuration
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub dir: PathBuf,
    pub recursive: bool,
    pub settle_delay_ms: u64,
}

impl WatchSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            dir: PathBuf::from(
                env::var("ENTROPYX_WATCH_DIR").unwrap_or_else(|_| "./watch".to_string()),
            ),
            recursive: env::var("ENTROPYX_WATCH_RECURSIVE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("Invalid ENTROPYX_WATCH_RECURSIVE")?,
            settle_delay_ms: env::var("ENTROPYX_SETTLE_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("Invalid ENTROPYX_SETTLE_DELAY_MS")?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.dir.as_os_str().is_empty() {
            anyhow::bail!("Watch directory cannot be empty");
        }
        Ok(())
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./watch"),
            recursive: false,
            settle_delay_ms: 1000,
        }
    }
}

/// Trained artifact locations
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
}

impl ModelConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            model_path: PathBuf::from(
                env::var("ENTROPYX_MODEL_PATH")
                    .unwrap_or_else(|_| "./models/model.json".to_string()),
            ),
            scaler_path: PathBuf::from(
                env::var("ENTROPYX_SCALER_PATH")
                    .unwrap_or_else(|_| "./models/scaler.json".to_string()),
            ),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_path.as_os_str().is_empty() {
            anyhow::bail!("Model path cannot be empty");
        }
        if self.scaler_path.as_os_str().is_empty() {
            anyhow::bail!("Scaler path cannot be empty");
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/model.json"),
            scaler_path: PathBuf::from("./models/scaler.json"),
        }
    }
}

/// Per-file scan configuration
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub top_k: usize,
    pub max_file_size: u64,
    pub report_format: ReportFormat,
}

impl ScannerConfig {
    pub fn from_env() -> Result<Self> {
        let report_format = env::var("REPORT_FORMAT").unwrap_or_else(|_| "text".to_string());

        Ok(Self {
            top_k: env::var("ENTROPYX_TOP_K")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Invalid ENTROPYX_TOP_K")?,
            max_file_size: env::var("ENTROPYX_MAX_FILE_SIZE")
                .unwrap_or_else(|_| (100 * 1024 * 1024).to_string())
                .parse()
                .context("Invalid ENTROPYX_MAX_FILE_SIZE")?,
            report_format: ReportFormat::from_str(&report_format, true)
                .map_err(|e| anyhow!(e))
                .context("Invalid REPORT_FORMAT")?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            anyhow::bail!("Top-K must be at least 1");
        }
        if self.max_file_size == 0 {
            anyhow::bail!("Max file size must be greater than 0");
        }
        Ok(())
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_file_size: 100 * 1024 * 1024,
            report_format: ReportFormat::Text,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "info".to_string())
                .parse()
                .context("Invalid LOG_LEVEL")?,
            format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "compact".to_string())
                .parse()
                .context("Invalid LOG_FORMAT")?,
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
        }
    }
}
