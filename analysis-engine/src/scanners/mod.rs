//! Scanner modules
//!
//! - `file_scanner`: one file through extraction, inference and reporting
//! - `dataset`: batch extraction of labelled samples into a training CSV

pub mod dataset;
pub mod file_scanner;

pub use dataset::{DatasetBatch, DatasetBuilder, SampleLabel};
pub use file_scanner::{log_scan_failure, FileScanner, FileScannerConfig};
