//! Error taxonomy for the extraction and inference pipeline

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The file is not a parseable executable.
    #[error("{}: not a valid PE file: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    /// The executable parsed but is structurally degenerate.
    #[error("{}: feature extraction failed: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    /// The record is missing a column the trained artifacts require.
    #[error("{}: feature column `{column}` expected by the model is missing (schema drift)", path.display())]
    SchemaMismatch { path: PathBuf, column: String },

    /// Model or scaler artifact missing, unreadable or inconsistent.
    #[error("failed to load artifact {}: {reason}", path.display())]
    ArtifactLoad { path: PathBuf, reason: String },

    #[error("{}: I/O error: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: file too large ({size} bytes, limit {limit})", path.display())]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },
}

impl AnalysisError {
    pub fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AnalysisError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn extraction(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AnalysisError::Extraction {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn artifact(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AnalysisError::ArtifactLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable identifier used in log fields and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Format { .. } => "format_error",
            AnalysisError::Extraction { .. } => "extraction_error",
            AnalysisError::SchemaMismatch { .. } => "schema_mismatch",
            AnalysisError::ArtifactLoad { .. } => "artifact_load_error",
            AnalysisError::Io { .. } => "io_error",
            AnalysisError::FileTooLarge { .. } => "file_too_large",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            AnalysisError::Format { path, .. }
            | AnalysisError::Extraction { path, .. }
            | AnalysisError::SchemaMismatch { path, .. }
            | AnalysisError::ArtifactLoad { path, .. }
            | AnalysisError::Io { path, .. }
            | AnalysisError::FileTooLarge { path, .. } => path,
        }
    }

    /// Only artifact failures stop the process; everything else is per-file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalysisError::ArtifactLoad { .. })
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_path() {
        let err = AnalysisError::format("/tmp/readme.txt", "bad magic");
        assert_eq!(err.kind(), "format_error");
        assert_eq!(err.path(), Path::new("/tmp/readme.txt"));
        assert!(err.to_string().contains("/tmp/readme.txt"));
    }

    #[test]
    fn test_only_artifact_errors_are_fatal() {
        assert!(AnalysisError::artifact("model.json", "missing").is_fatal());
        assert!(!AnalysisError::extraction("a.exe", "no sections").is_fatal());

        let drift = AnalysisError::SchemaMismatch {
            path: PathBuf::from("a.exe"),
            column: "std_entropy".to_string(),
        };
        assert!(!drift.is_fatal());
        assert!(drift.to_string().contains("std_entropy"));
    }

    #[test]
    fn test_io_error_keeps_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = AnalysisError::io("/tmp/x.exe", source);
        assert_eq!(err.kind(), "io_error");
        assert!(std::error::Error::source(&err).is_some());
    }
}
