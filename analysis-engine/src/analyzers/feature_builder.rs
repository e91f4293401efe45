//! Assemble the fixed-schema feature record for one file.

use std::fs;
use std::path::Path;

use shared::{AnalysisError, AnalysisResult, FeatureRecord};
use tracing::debug;

use super::entropy::shannon_entropy;
use super::pe_parser::parse_pe;
use super::structural::{extract_structural, SectionSizes};

/// Summary of the per-section entropy list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntropyStats {
    pub avg: f64,
    pub max: f64,
    pub min: f64,
    /// Population standard deviation.
    pub std: f64,
}

impl EntropyStats {
    /// `None` for an empty list; the statistics are undefined there.
    pub fn from_sections(entropies: &[f64]) -> Option<Self> {
        if entropies.is_empty() {
            return None;
        }

        let n = entropies.len() as f64;
        let avg = entropies.iter().sum::<f64>() / n;
        let max = entropies.iter().copied().fold(f64::MIN, f64::max);
        let min = entropies.iter().copied().fold(f64::MAX, f64::min);
        let variance = entropies.iter().map(|e| (e - avg).powi(2)).sum::<f64>() / n;

        Some(Self {
            avg,
            max,
            min,
            std: variance.sqrt(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FeatureVectorBuilder {
    max_file_size: u64,
}

impl Default for FeatureVectorBuilder {
    fn default() -> Self {
        Self::new(100 * 1024 * 1024)
    }
}

impl FeatureVectorBuilder {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    /// Read `path`, refusing files above the size limit.
    pub fn read_file(&self, path: &Path) -> AnalysisResult<Vec<u8>> {
        let metadata = fs::metadata(path).map_err(|e| AnalysisError::io(path, e))?;
        if metadata.len() > self.max_file_size {
            return Err(AnalysisError::FileTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: self.max_file_size,
            });
        }
        fs::read(path).map_err(|e| AnalysisError::io(path, e))
    }

    /// Read `path` and build its record.
    pub fn build_from_path(&self, path: &Path) -> AnalysisResult<FeatureRecord> {
        let bytes = self.read_file(path)?;
        self.build(path, &bytes)
    }

    /// Build the record for an in-memory file. `family` and `is_malicious`
    /// are left unset; only the dataset builder labels records.
    pub fn build(&self, path: &Path, bytes: &[u8]) -> AnalysisResult<FeatureRecord> {
        let parsed = parse_pe(path, bytes)?;

        let sizes: Vec<SectionSizes> = parsed.sections.iter().map(SectionSizes::from).collect();
        let structural = extract_structural(path, parsed.size_of_headers, &sizes)?;

        let entropies: Vec<f64> = parsed
            .sections
            .iter()
            .map(|section| shannon_entropy(section.data))
            .collect();
        let stats = EntropyStats::from_sections(&entropies)
            .ok_or_else(|| AnalysisError::extraction(path, "no section entropies"))?;

        debug!(
            path = %path.display(),
            sections = structural.num_sections,
            max_entropy = stats.max,
            "Extracted features"
        );

        Ok(FeatureRecord {
            filename: display_name(path),
            total_file_size: bytes.len() as u64,
            avg_entropy: stats.avg,
            max_entropy: stats.max,
            min_entropy: stats.min,
            std_entropy: stats.std,
            num_sections: structural.num_sections,
            size_of_headers: structural.size_of_headers,
            raw_size: structural.raw_size,
            virtual_size: structural.virtual_size,
            virtual_size_ratio: structural.virtual_size_ratio,
            family: None,
            is_malicious: None,
        })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
