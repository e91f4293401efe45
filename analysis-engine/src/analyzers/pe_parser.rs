//! Thin adapter over `goblin` exposing only what feature extraction needs.

use std::path::Path;

use goblin::pe::PE;
use shared::{AnalysisError, AnalysisResult};

/// One section of a parsed executable, borrowed from the file buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionView<'a> {
    pub name: String,
    pub virtual_size: u64,
    pub raw_size: u64,
    /// Raw bytes, clamped to the file and trimmed to `virtual_size`.
    pub data: &'a [u8],
}

#[derive(Debug, Clone)]
pub struct ParsedExecutable<'a> {
    pub size_of_headers: u64,
    pub sections: Vec<SectionView<'a>>,
}

/// Parse `bytes` as a PE image. Anything goblin rejects is a format error.
pub fn parse_pe<'a>(path: &Path, bytes: &'a [u8]) -> AnalysisResult<ParsedExecutable<'a>> {
    let pe = PE::parse(bytes).map_err(|e| AnalysisError::format(path, e.to_string()))?;

    let size_of_headers = pe
        .header
        .optional_header
        .map(|oh| u64::from(oh.windows_fields.size_of_headers))
        .ok_or_else(|| AnalysisError::format(path, "missing optional header"))?;

    let sections = pe
        .sections
        .iter()
        .map(|section| {
            let name = String::from_utf8_lossy(&section.name)
                .trim_end_matches('\0')
                .to_string();
            let virtual_size = u64::from(section.virtual_size);
            let raw_size = u64::from(section.size_of_raw_data);
            let data = section_data(
                bytes,
                section.pointer_to_raw_data as usize,
                section.size_of_raw_data as usize,
                section.virtual_size as usize,
            );

            SectionView {
                name,
                virtual_size,
                raw_size,
                data,
            }
        })
        .collect();

    Ok(ParsedExecutable {
        size_of_headers,
        sections,
    })
}

/// Slice a section's raw data out of the file without reading past its end,
/// then drop any on-disk padding beyond the declared in-memory size.
fn section_data(bytes: &[u8], offset: usize, raw_size: usize, virtual_size: usize) -> &[u8] {
    let start = offset.min(bytes.len());
    let end = offset.saturating_add(raw_size).min(bytes.len());
    let raw = &bytes[start..end];
    &raw[..raw.len().min(virtual_size)]
}
