pub mod report;

pub use report::{ClassificationReport, ReportFormat};
