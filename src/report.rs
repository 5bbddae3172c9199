//! Typed canonical response schema: the wire contract the serving layer
//! emits for every prediction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level ensemble verdict with its display metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Index into the fixed label set, or -1 when the label is unknown.
    pub class_id: i64,
    pub class_name: String,
    pub display_name: String,
    pub risk: String,
    pub description: String,
    pub recommendation: String,
    /// Ensemble probability of the top class, 0..1.
    pub confidence: f64,
    /// Fraction of members whose own top class matches the ensemble's.
    pub agreement: f64,
}

/// One member model's individual verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub class_id: i64,
    pub class_name: String,
    pub confidence: f64,
}

/// The canonical prediction payload. `class_probabilities` always carries
/// one entry per class; for this label set alphabetical key order equals
/// index order, so a `BTreeMap` keeps the wire layout deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    pub prediction: Prediction,
    pub model_predictions: BTreeMap<String, ModelPrediction>,
    pub class_probabilities: BTreeMap<String, f64>,
}
