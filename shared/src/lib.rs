//! Shared schema, error types and observability for Entropy-X crates

// Re-export common dependencies
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tracing;

pub mod observability;
pub mod schema;
pub mod types;

pub use schema::{FeatureColumns, FeatureRecord, FeatureRow, MODEL_COLUMNS, RECORD_COLUMNS, SCHEMA_VERSION};
pub use types::error::{AnalysisError, AnalysisResult};
