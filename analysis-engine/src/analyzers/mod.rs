//! Feature extraction: PE parsing, byte entropy and structural metrics.

pub mod entropy;
pub mod feature_builder;
pub mod pe_parser;
pub mod structural;

pub use entropy::{byte_histogram, shannon_entropy, MAX_ENTROPY};
pub use feature_builder::{EntropyStats, FeatureVectorBuilder};
pub use pe_parser::{parse_pe, ParsedExecutable, SectionView};
pub use structural::{extract_structural, SectionSizes, StructuralFeatures};
