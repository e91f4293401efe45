//! Entropy-X analysis engine
//!
//! Static feature extraction for PE files, inference over trained tree
//! ensembles, a directory watch daemon and the batch dataset builder.

pub mod analyzers;
pub mod config;
pub mod inference;
pub mod models;
pub mod queue;
pub mod scanners;

#[cfg(test)]
mod test_support;

pub use analyzers::FeatureVectorBuilder;
pub use inference::{InferenceEngine, Label, Verdict};
pub use models::{ClassificationReport, ReportFormat};
pub use queue::{DaemonStats, FileWatchDaemon, WatchConfig};
pub use scanners::{DatasetBuilder, FileScanner, FileScannerConfig};
