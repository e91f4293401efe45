use std::fs;
use std::path::Path;

use serde::Deserialize;
use shared::MODEL_COLUMNS;

use super::ArtifactError;

/// Per-feature normalization fitted at training time.
pub trait FeatureScaler: Send + Sync {
    /// Columns in the order `transform` expects them.
    fn feature_names(&self) -> &[String];

    fn transform(&self, x: &[f64]) -> Vec<f64>;
}

/// Standardization `(x - mean) / scale`, as fitted by the trainer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardScaler {
    #[serde(default)]
    pub schema_version: Option<String>,
    #[serde(default = "default_feature_names")]
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

fn default_feature_names() -> Vec<String> {
    MODEL_COLUMNS.iter().map(|c| c.to_string()).collect()
}

impl StandardScaler {
    pub fn from_path(path: &Path) -> Result<Self, ArtifactError> {
        let data = fs::read(path)?;
        let scaler: StandardScaler = serde_json::from_slice(&data)?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn validate(&self) -> Result<(), ArtifactError> {
        let n = self.feature_names.len();
        if n == 0 {
            return Err(ArtifactError::Invalid("scaler has no features".into()));
        }
        if self.mean.len() != n || self.scale.len() != n {
            return Err(ArtifactError::Invalid(format!(
                "scaler has {} names, {} means and {} scales",
                n,
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self
            .mean
            .iter()
            .chain(self.scale.iter())
            .any(|v| !v.is_finite())
        {
            return Err(ArtifactError::Invalid("scaler contains non-finite values".into()));
        }
        Ok(())
    }
}

impl FeatureScaler for StandardScaler {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn transform(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(value, (mean, scale))| {
                // zero-variance columns were fitted with unit scale
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (value - mean) / scale
            })
            .collect()
    }
}
