//! Batch feature extraction for building training datasets.
//!
//! Files are processed independently on the rayon pool with no shared
//! mutable state, so the output order is not meaningful. Failures are
//! collected next to the records instead of aborting the batch.

use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use shared::{AnalysisError, FeatureRecord, RECORD_COLUMNS};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::analyzers::FeatureVectorBuilder;

const SAMPLE_EXTENSIONS: &[&str] = &["exe", "dll"];

/// Ground-truth label for every sample in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SampleLabel {
    Benign,
    Malicious,
}

#[derive(Debug, Default)]
pub struct DatasetBatch {
    pub records: Vec<FeatureRecord>,
    pub failures: Vec<AnalysisError>,
}

#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    label: SampleLabel,
    family: Option<String>,
    builder: FeatureVectorBuilder,
}

impl DatasetBuilder {
    /// `family` overrides the per-sample family. Without it, malicious samples
    /// take the name of their containing directory and benign ones `benign`.
    pub fn new(label: SampleLabel, family: Option<String>, max_file_size: u64) -> Self {
        Self {
            label,
            family,
            builder: FeatureVectorBuilder::new(max_file_size),
        }
    }

    /// Every `.exe`/`.dll` below `root`, sorted for reproducible runs.
    pub fn collect(&self, root: &Path) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_sample(entry.path()) => {
                    paths.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => warn!(root = %root.display(), error = %e, "Cannot read directory entry"),
            }
        }
        paths.sort();
        debug!(root = %root.display(), count = paths.len(), "Collected samples");
        paths
    }

    pub fn extract_all(&self, paths: &[PathBuf]) -> DatasetBatch {
        let malicious = self.label == SampleLabel::Malicious;

        let results: Vec<Result<FeatureRecord, AnalysisError>> = paths
            .par_iter()
            .map(|path| {
                self.builder
                    .build_from_path(path)
                    .map(|record| record.with_label(self.family_for(path), malicious))
            })
            .collect();

        let mut batch = DatasetBatch::default();
        for result in results {
            match result {
                Ok(record) => batch.records.push(record),
                Err(e) => batch.failures.push(e),
            }
        }

        info!(
            extracted = batch.records.len(),
            skipped = batch.failures.len(),
            "Batch extraction finished"
        );
        batch
    }

    fn family_for(&self, path: &Path) -> String {
        if let Some(family) = &self.family {
            return family.clone();
        }
        match self.label {
            SampleLabel::Benign => "benign".to_string(),
            SampleLabel::Malicious => path
                .parent()
                .and_then(|dir| dir.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

fn is_sample(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SAMPLE_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// Write records with the schema header, even when there are no records.
pub fn write_csv<W: io::Write>(records: &[FeatureRecord], writer: W) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(RECORD_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
