//! Model inference over feature records.
//!
//! An [`InferenceEngine`] only exists once both artifacts have been loaded and
//! cross-checked, and it is never mutated afterwards. Share it with `Arc`.

pub mod explain;
pub mod model;
pub mod scaler;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use shared::{AnalysisError, AnalysisResult, FeatureColumns, SCHEMA_VERSION};
use thiserror::Error;
use tracing::{info, warn};

pub use explain::{rank_impacts, FeatureImpact};
pub use model::{Classifier, EnsembleKind, TreeEnsemble};
pub use scaler::{FeatureScaler, StandardScaler};

/// Class value the trainers use for malware.
pub const MALICIOUS_CLASS: i64 = 1;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("cannot read artifact: {0}")]
    Read(#[from] std::io::Error),

    #[error("cannot decode artifact: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid artifact: {0}")]
    Invalid(String),

    #[error("model expects {model} features but scaler provides {scaler}")]
    FeatureCountMismatch { model: usize, scaler: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Benign,
    Malicious,
}

impl Label {
    pub fn from_class(class: i64) -> Self {
        if class == MALICIOUS_CLASS {
            Label::Malicious
        } else {
            Label::Benign
        }
    }

    pub fn is_malicious(&self) -> bool {
        matches!(self, Label::Malicious)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Benign => write!(f, "BENIGN"),
            Label::Malicious => write!(f, "MALICIOUS"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub label: Label,
    /// Highest class probability, in `[0, 1]`.
    pub confidence: f64,
    pub probabilities: Vec<f64>,
    /// Approximate local drivers, strongest first.
    pub impacts: Vec<FeatureImpact>,
}

pub struct InferenceEngine {
    model: Box<dyn Classifier>,
    scaler: Box<dyn FeatureScaler>,
}

impl fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("columns", &self.scaler.feature_names())
            .field("classes", &self.model.classes())
            .finish()
    }
}

impl InferenceEngine {
    /// Load both artifacts. Any failure here is fatal for the caller.
    pub fn load(model_path: &Path, scaler_path: &Path) -> AnalysisResult<Self> {
        info!("Loading model from: {}", model_path.display());
        let model = TreeEnsemble::from_path(model_path)
            .map_err(|e| AnalysisError::artifact(model_path, e.to_string()))?;

        info!("Loading scaler from: {}", scaler_path.display());
        let scaler = StandardScaler::from_path(scaler_path)
            .map_err(|e| AnalysisError::artifact(scaler_path, e.to_string()))?;

        for (path, version) in [
            (model_path, model.schema_version.as_deref()),
            (scaler_path, scaler.schema_version.as_deref()),
        ] {
            if let Some(version) = version {
                if version != SCHEMA_VERSION {
                    warn!(
                        artifact = %path.display(),
                        artifact_schema = version,
                        extractor_schema = SCHEMA_VERSION,
                        "Artifact was trained on a different feature schema version"
                    );
                }
            }
        }

        let engine = Self::from_parts(Box::new(model), Box::new(scaler))
            .map_err(|e| AnalysisError::artifact(model_path, e.to_string()))?;

        info!(
            features = engine.columns().len(),
            "Inference engine ready"
        );
        Ok(engine)
    }

    pub fn from_parts(
        model: Box<dyn Classifier>,
        scaler: Box<dyn FeatureScaler>,
    ) -> Result<Self, ArtifactError> {
        let scaler_features = scaler.feature_names().len();
        if model.n_features() != scaler_features {
            return Err(ArtifactError::FeatureCountMismatch {
                model: model.n_features(),
                scaler: scaler_features,
            });
        }
        if model.feature_importances().len() != model.n_features() {
            return Err(ArtifactError::Invalid(
                "feature importances do not match feature count".into(),
            ));
        }
        Ok(Self { model, scaler })
    }

    /// Columns the artifacts were trained on, in model order.
    pub fn columns(&self) -> &[String] {
        self.scaler.feature_names()
    }

    /// Select the trained columns from `record`, dropping everything else.
    pub fn select<R: FeatureColumns + ?Sized>(&self, record: &R) -> AnalysisResult<Vec<f64>> {
        self.columns()
            .iter()
            .map(|column| {
                record
                    .column(column)
                    .ok_or_else(|| AnalysisError::SchemaMismatch {
                        path: PathBuf::from(record.source_name()),
                        column: column.clone(),
                    })
            })
            .collect()
    }

    /// Selected and standardized model input.
    pub fn scale<R: FeatureColumns + ?Sized>(&self, record: &R) -> AnalysisResult<Vec<f64>> {
        let raw = self.select(record)?;
        Ok(self.scaler.transform(&raw))
    }

    pub fn classify<R: FeatureColumns + ?Sized>(&self, record: &R) -> AnalysisResult<Verdict> {
        let scaled = self.scale(record)?;

        let probabilities = self.model.predict_proba(&scaled);
        let label = Label::from_class(self.model.predict(&scaled));
        let confidence = probabilities.iter().copied().fold(0.0, f64::max);

        Ok(Verdict {
            label,
            confidence,
            probabilities,
            impacts: self.explain(&scaled),
        })
    }

    /// Approximate per-feature drivers for an already scaled vector.
    /// See [`explain`] for the caveats.
    pub fn explain(&self, scaled: &[f64]) -> Vec<FeatureImpact> {
        rank_impacts(self.columns(), self.model.feature_importances(), scaled)
    }
}
