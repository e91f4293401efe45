//! Local feature impact ranking.
//!
//! `impact_j = |importance_j * scaled_j|` combines the model's global
//! importance with how far this sample sits from the training mean. It is an
//! approximate, single-sample heuristic and not an attribution method: it
//! ignores feature interactions and the direction a feature pushes the
//! decision.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImpact {
    pub feature: String,
    pub score: f64,
}

/// Rank features by descending impact. Equal scores keep column order.
pub fn rank_impacts(names: &[String], importances: &[f64], scaled: &[f64]) -> Vec<FeatureImpact> {
    let mut impacts: Vec<FeatureImpact> = names
        .iter()
        .zip(importances.iter().zip(scaled))
        .map(|(name, (weight, value))| FeatureImpact {
            feature: name.clone(),
            score: (weight * value).abs(),
        })
        .collect();

    // sort_by is stable
    impacts.sort_by(|a, b| b.score.total_cmp(&a.score));
    impacts
}
