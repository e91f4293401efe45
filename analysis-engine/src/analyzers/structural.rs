//! Aggregate structural metrics over a section table.

use std::path::Path;

use shared::{AnalysisError, AnalysisResult};

use super::pe_parser::SectionView;

/// Raw and virtual size of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSizes {
    pub raw_size: u64,
    pub virtual_size: u64,
}

impl From<&SectionView<'_>> for SectionSizes {
    fn from(section: &SectionView<'_>) -> Self {
        Self {
            raw_size: section.raw_size,
            virtual_size: section.virtual_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructuralFeatures {
    pub num_sections: u64,
    pub size_of_headers: u64,
    /// Headers plus the on-disk size of every section.
    pub raw_size: u64,
    /// Headers plus the in-memory size of every section.
    pub virtual_size: u64,
    /// `virtual_size / raw_size`, or `0.0` when `raw_size` is zero.
    pub virtual_size_ratio: f64,
}

pub fn extract_structural(
    path: &Path,
    size_of_headers: u64,
    sections: &[SectionSizes],
) -> AnalysisResult<StructuralFeatures> {
    if sections.is_empty() {
        return Err(AnalysisError::extraction(path, "section table is empty"));
    }

    let raw_size = sections
        .iter()
        .fold(size_of_headers, |acc, s| acc.saturating_add(s.raw_size));
    let virtual_size = sections
        .iter()
        .fold(size_of_headers, |acc, s| acc.saturating_add(s.virtual_size));

    Ok(StructuralFeatures {
        num_sections: sections.len() as u64,
        size_of_headers,
        raw_size,
        virtual_size,
        virtual_size_ratio: size_ratio(virtual_size, raw_size),
    })
}

fn size_ratio(virtual_size: u64, raw_size: u64) -> f64 {
    if raw_size == 0 {
        0.0
    } else {
        virtual_size as f64 / raw_size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(raw_size: u64, virtual_size: u64) -> SectionSizes {
        SectionSizes {
            raw_size,
            virtual_size,
        }
    }

    #[test]
    fn test_sums_include_headers() {
        let features = extract_structural(
            Path::new("a.exe"),
            0x400,
            &[sizes(0x1000, 0x0f00), sizes(0x200, 0x3000)],
        )
        .unwrap();

        assert_eq!(features.num_sections, 2);
        assert_eq!(features.raw_size, 0x400 + 0x1000 + 0x200);
        assert_eq!(features.virtual_size, 0x400 + 0x0f00 + 0x3000);
        assert!(features.raw_size >= features.size_of_headers);
        let expected = features.virtual_size as f64 / features.raw_size as f64;
        assert!((features.virtual_size_ratio - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zero_raw_size_gives_zero_ratio() {
        let features =
            extract_structural(Path::new("b.exe"), 0, &[sizes(0, 0x2000), sizes(0, 0x10)]).unwrap();
        assert_eq!(features.raw_size, 0);
        assert_eq!(features.virtual_size_ratio, 0.0);
    }

    #[test]
    fn test_empty_section_table_is_an_error() {
        let err = extract_structural(Path::new("c.exe"), 0x200, &[]).unwrap_err();
        assert_eq!(err.kind(), "extraction_error");
    }

    #[test]
    fn test_sizes_saturate() {
        let features =
            extract_structural(Path::new("d.exe"), u64::MAX, &[sizes(10, 10)]).unwrap();
        assert_eq!(features.raw_size, u64::MAX);
        assert_eq!(features.virtual_size_ratio, 1.0);
    }
}
