use std::path::PathBuf;

use analysis_engine::config::Config;
use analysis_engine::models::ReportFormat;
use analysis_engine::scanners::SampleLabel;
use clap::{Parser, Subcommand};
use shared::observability::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "entropyx")]
#[command(about = "Entropy-based static PE malware classifier")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Trained model artifact (JSON)
    #[arg(long, global = true)]
    pub model: Option<PathBuf>,

    /// Fitted scaler artifact (JSON)
    #[arg(long, global = true)]
    pub scaler: Option<PathBuf>,

    /// Report format (text, json)
    #[arg(short, long, global = true)]
    pub format: Option<ReportFormat>,

    /// Number of feature impacts shown per report
    #[arg(long, global = true)]
    pub top_k: Option<usize>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch a directory and classify every new file
    Watch {
        /// Directory to watch
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Include subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Delay between a file appearing and reading it
        #[arg(long)]
        settle_ms: Option<u64>,
    },

    /// Classify the given files once
    Scan {
        /// Files to classify
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Extract labelled feature records from a sample tree into a CSV
    Dataset {
        /// Root directory holding the samples
        #[arg(short, long)]
        input: PathBuf,

        /// Label applied to every sample
        #[arg(short, long)]
        label: SampleLabel,

        /// Family name, instead of the containing directory
        #[arg(long)]
        family: Option<String>,

        /// CSV file to write
        #[arg(short, long)]
        output: PathBuf,
    },
}

impl Args {
    /// Flags win over the environment.
    pub fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model.model_path = model.clone();
        }
        if let Some(scaler) = &self.scaler {
            config.model.scaler_path = scaler.clone();
        }
        if let Some(format) = self.format {
            config.scanner.report_format = format;
        }
        if let Some(top_k) = self.top_k {
            config.scanner.top_k = top_k;
        }
        if self.verbose {
            config.logging.level = LogLevel::Debug;
        }

        if let Command::Watch {
            dir,
            recursive,
            settle_ms,
        } = &self.command
        {
            if let Some(dir) = dir {
                config.watch.dir = dir.clone();
            }
            if *recursive {
                config.watch.recursive = true;
            }
            if let Some(ms) = settle_ms {
                config.watch.settle_delay_ms = *ms;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "entropyx",
            "watch",
            "--dir",
            "/srv/drop",
            "--recursive",
            "--model",
            "rf.json",
            "--top-k",
            "3",
            "--format",
            "json",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.watch.dir, PathBuf::from("/srv/drop"));
        assert!(config.watch.recursive);
        assert_eq!(config.model.model_path, PathBuf::from("rf.json"));
        assert_eq!(config.scanner.top_k, 3);
        assert_eq!(config.scanner.report_format, ReportFormat::Json);
    }

    #[test]
    fn test_dataset_command_parsing() {
        let args = Args::parse_from([
            "entropyx", "dataset", "-i", "samples", "-l", "malicious", "-o", "out.csv",
        ]);
        match args.command {
            Command::Dataset { label, family, .. } => {
                assert_eq!(label, SampleLabel::Malicious);
                assert!(family.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
