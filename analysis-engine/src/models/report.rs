use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared::SCHEMA_VERSION;

use crate::inference::{FeatureImpact, Label, Verdict};

const RULE_WIDTH: usize = 50;

/// Output format for classification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable report block
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub path: String,
    pub filename: String,
    pub sha256: String,
    pub file_size: u64,
    pub scanned_at: DateTime<Utc>,
    pub schema_version: &'static str,
    pub label: Label,
    pub confidence: f64,
    pub top_impacts: Vec<FeatureImpact>,
}

impl ClassificationReport {
    pub fn new(path: &Path, contents: &[u8], verdict: &Verdict, top_k: usize) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self {
            path: path.display().to_string(),
            filename,
            sha256: hex::encode(Sha256::digest(contents)),
            file_size: contents.len() as u64,
            scanned_at: Utc::now(),
            schema_version: SCHEMA_VERSION,
            label: verdict.label,
            confidence: verdict.confidence,
            top_impacts: verdict.impacts.iter().take(top_k).cloned().collect(),
        }
    }

    pub fn is_malicious(&self) -> bool {
        self.label.is_malicious()
    }

    pub fn render_text(&self) -> String {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);
        let mut out = String::new();

        let _ = writeln!(out, "{}", heavy);
        let _ = writeln!(out, "       ENTROPY-X CLASSIFICATION REPORT");
        let _ = writeln!(out, "{}", heavy);
        let _ = writeln!(out, "File:       {}", self.filename);
        let _ = writeln!(out, "SHA-256:    {}", self.sha256);
        let _ = writeln!(out, "Verdict:    {}", self.label);
        let _ = writeln!(out, "Confidence: {:.2}%", self.confidence * 100.0);
        let _ = writeln!(out, "{}", light);
        let _ = writeln!(out, "Top {} Drivers (Scaled Impact):", self.top_impacts.len());
        for (i, impact) in self.top_impacts.iter().enumerate() {
            let _ = writeln!(
                out,
                " {}. {:<20} | Magnitude: {:.4}",
                i + 1,
                impact.feature,
                impact.score
            );
        }
        let _ = writeln!(out, "{}", heavy);
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn render(&self, format: ReportFormat) -> serde_json::Result<String> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Json => self.to_json(),
        }
    }
}
