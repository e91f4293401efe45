#![allow(dead_code)]

use std::path::{Path, PathBuf};

#[path = "../../src/test_support.rs"]
mod pe;

pub use pe::*;

/// Write the max-entropy forest and its scaler next to each other in `dir`.
pub fn write_artifacts(dir: &Path) -> (PathBuf, PathBuf) {
    let model = dir.join("model.json");
    let scaler = dir.join("scaler.json");
    std::fs::write(&model, max_entropy_forest().to_string()).unwrap();
    std::fs::write(&scaler, threshold_scaler().to_string()).unwrap();
    (model, scaler)
}
