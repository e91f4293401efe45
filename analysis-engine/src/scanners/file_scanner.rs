//! File scanner: Extract -> Classify -> Report for a single file
//!
//! Shared by the one-shot `scan` command and the watch daemon. Each call is
//! self-contained: the file is read once, features are extracted from that
//! buffer, and the same buffer is hashed for the report.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use shared::{AnalysisError, AnalysisResult};
use tracing::{debug, error, info, warn};

use crate::analyzers::FeatureVectorBuilder;
use crate::inference::InferenceEngine;
use crate::models::{ClassificationReport, ReportFormat};

/// Configuration for file scanner
#[derive(Debug, Clone)]
pub struct FileScannerConfig {
    pub max_file_size: u64,
    pub top_k: usize,
    pub report_format: ReportFormat,
}

impl Default for FileScannerConfig {
    fn default() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024,
            top_k: 5,
            report_format: ReportFormat::Text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileScanner {
    config: FileScannerConfig,
    builder: FeatureVectorBuilder,
    engine: Arc<InferenceEngine>,
}

impl FileScanner {
    pub fn new(config: FileScannerConfig, engine: Arc<InferenceEngine>) -> Self {
        let builder = FeatureVectorBuilder::new(config.max_file_size);
        Self {
            config,
            builder,
            engine,
        }
    }

    /// Run the full pipeline for one file. Blocking.
    pub fn scan(&self, path: &Path) -> AnalysisResult<ClassificationReport> {
        let start = Instant::now();

        let contents = self.builder.read_file(path)?;
        let record = self.builder.build(path, &contents)?;
        // the record only knows its file name; report the full path
        let verdict = self.engine.classify(&record).map_err(|e| match e {
            AnalysisError::SchemaMismatch { column, .. } => AnalysisError::SchemaMismatch {
                path: path.to_path_buf(),
                column,
            },
            other => other,
        })?;
        let report = ClassificationReport::new(path, &contents, &verdict, self.config.top_k);

        debug!(
            path = %path.display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Scan finished"
        );
        Ok(report)
    }

    /// Print the report to stdout and log it. Malicious verdicts are raised
    /// to warn level; the rest of the handling is identical.
    pub fn emit(&self, report: &ClassificationReport) {
        match report.render(self.config.report_format) {
            Ok(rendered) => println!("{}", rendered.trim_end()),
            Err(e) => error!(path = %report.path, error = %e, "Failed to render report"),
        }

        if report.is_malicious() {
            warn!(
                path = %report.path,
                sha256 = %report.sha256,
                confidence = report.confidence,
                "MALICIOUS file detected"
            );
        } else {
            info!(
                path = %report.path,
                confidence = report.confidence,
                "File classified as benign"
            );
        }
    }
}

/// Log a per-file failure with its path and kind.
pub fn log_scan_failure(err: &AnalysisError) {
    match err {
        AnalysisError::SchemaMismatch { column, .. } => {
            warn!(
                path = %err.path().display(),
                kind = err.kind(),
                column = %column,
                "Feature schema drift: extractor and trained artifacts disagree, file skipped"
            );
        }
        AnalysisError::ArtifactLoad { .. } => {
            error!(path = %err.path().display(), kind = err.kind(), error = %err, "Artifact failure");
        }
        _ => {
            warn!(path = %err.path().display(), kind = err.kind(), error = %err, "File skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::{Label, StandardScaler, TreeEnsemble};
    use crate::test_support::{max_entropy_forest, packed_pe, plain_pe, threshold_scaler};

    fn engine() -> Arc<InferenceEngine> {
        let model: TreeEnsemble = serde_json::from_value(max_entropy_forest()).unwrap();
        let scaler: StandardScaler = serde_json::from_value(threshold_scaler()).unwrap();
        Arc::new(InferenceEngine::from_parts(Box::new(model), Box::new(scaler)).unwrap())
    }

    #[test]
    fn test_scan_packed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("packed.exe");
        std::fs::write(&path, packed_pe()).unwrap();

        let scanner = FileScanner::new(FileScannerConfig::default(), engine());
        let report = scanner.scan(&path).unwrap();
        assert_eq!(report.label, Label::Malicious);
        assert_eq!(report.confidence, 1.0);
        assert_eq!(report.filename, "packed.exe");
        assert_eq!(report.top_impacts[0].feature, "max_entropy");
    }

    #[test]
    fn test_scan_low_entropy_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.exe");
        std::fs::write(&path, plain_pe()).unwrap();

        let scanner = FileScanner::new(FileScannerConfig::default(), engine());
        assert_eq!(scanner.scan(&path).unwrap().label, Label::Benign);
    }

    #[test]
    fn test_scan_text_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "meeting notes").unwrap();

        let scanner = FileScanner::new(FileScannerConfig::default(), engine());
        let err = scanner.scan(&path).unwrap_err();
        assert_eq!(err.kind(), "format_error");
        assert_eq!(err.path(), path.as_path());
    }
}
