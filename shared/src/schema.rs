//! Versioned feature schema shared by the dataset builder and the inference engine.
//!
//! `FeatureRecord` is declared exactly once. Its field order is the CSV column
//! order written at training time and the order read back at serve time, so
//! the two can never drift apart silently.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Bumped whenever a column is added, removed or reordered.
pub const SCHEMA_VERSION: &str = "v1";

/// Every column of a dataset row, in declaration order.
pub const RECORD_COLUMNS: [&str; 13] = [
    "filename",
    "total_file_size",
    "avg_entropy",
    "max_entropy",
    "min_entropy",
    "std_entropy",
    "num_sections",
    "size_of_headers",
    "raw_size",
    "virtual_size",
    "virtual_size_ratio",
    "family",
    "is_malicious",
];

/// Columns the classifier consumes, in the order the scaler was fitted on.
pub const MODEL_COLUMNS: [&str; 8] = [
    "total_file_size",
    "avg_entropy",
    "max_entropy",
    "min_entropy",
    "std_entropy",
    "num_sections",
    "size_of_headers",
    "virtual_size_ratio",
];

/// Columns removed before training: metadata, labels, and the two size
/// columns that are collinear with `virtual_size_ratio`.
pub const DROPPED_COLUMNS: [&str; 5] = [
    "filename",
    "raw_size",
    "virtual_size",
    "family",
    "is_malicious",
];

/// Label value written to `is_malicious`.
pub const BENIGN: u8 = 0;
pub const MALICIOUS: u8 = 1;

/// One analyzed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub filename: String,
    pub total_file_size: u64,
    pub avg_entropy: f64,
    pub max_entropy: f64,
    pub min_entropy: f64,
    pub std_entropy: f64,
    pub num_sections: u64,
    pub size_of_headers: u64,
    pub raw_size: u64,
    pub virtual_size: u64,
    pub virtual_size_ratio: f64,
    pub family: Option<String>,
    pub is_malicious: Option<u8>,
}

impl FeatureRecord {
    /// Numeric columns in declaration order, metadata excluded.
    pub fn numeric_columns(&self) -> [(&'static str, f64); 10] {
        [
            ("total_file_size", self.total_file_size as f64),
            ("avg_entropy", self.avg_entropy),
            ("max_entropy", self.max_entropy),
            ("min_entropy", self.min_entropy),
            ("std_entropy", self.std_entropy),
            ("num_sections", self.num_sections as f64),
            ("size_of_headers", self.size_of_headers as f64),
            ("raw_size", self.raw_size as f64),
            ("virtual_size", self.virtual_size as f64),
            ("virtual_size_ratio", self.virtual_size_ratio),
        ]
    }

    pub fn with_label(mut self, family: impl Into<String>, is_malicious: bool) -> Self {
        self.family = Some(family.into());
        self.is_malicious = Some(if is_malicious { MALICIOUS } else { BENIGN });
        self
    }
}

/// Anything that can hand out named numeric feature columns.
///
/// Implemented for the fixed record and for loosely-typed rows (for example
/// rows read back from a CSV written by an older builder).
pub trait FeatureColumns {
    fn column(&self, name: &str) -> Option<f64>;

    /// Identifier used in logs and errors.
    fn source_name(&self) -> &str;
}

impl FeatureColumns for FeatureRecord {
    fn column(&self, name: &str) -> Option<f64> {
        self.numeric_columns()
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, value)| *value)
    }

    fn source_name(&self) -> &str {
        &self.filename
    }
}

/// A row keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    pub name: String,
    pub values: BTreeMap<String, f64>,
}

impl FeatureRow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: f64) -> &mut Self {
        self.values.insert(column.into(), value);
        self
    }
}

impl From<&FeatureRecord> for FeatureRow {
    fn from(record: &FeatureRecord) -> Self {
        let mut row = FeatureRow::new(record.filename.clone());
        for (column, value) in record.numeric_columns() {
            row.insert(column, value);
        }
        row
    }
}

impl FeatureColumns for FeatureRow {
    fn column(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
