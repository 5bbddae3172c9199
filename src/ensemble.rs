//! Probability-level ensemble combination.
//!
//! Every loaded member runs over the same preprocessed tensor; the member
//! probability vectors are averaged element-wise (not majority-voted —
//! averaging yields a calibrated ensemble confidence that voting cannot),
//! and agreement records how many members picked the ensemble's top class
//! on their own.

use ndarray::{Array1, Array4};
use std::collections::BTreeMap;

use crate::classes::{class_info, ClassLabel, NUM_CLASSES};
use crate::classifier::{ModelRegistry, PredictError};
use crate::report::{ModelPrediction, Prediction, PredictionReport};

/// Numerically stable softmax over raw logits.
pub fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exp = logits.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

/// One member's verdict over the input.
#[derive(Debug, Clone)]
pub struct MemberPrediction {
    pub class_id: usize,
    pub label: ClassLabel,
    pub confidence: f32,
}

/// The combined ensemble outcome before display metadata is joined in.
#[derive(Debug, Clone)]
pub struct EnsembleResult {
    pub class_id: usize,
    pub label: ClassLabel,
    pub confidence: f32,
    pub agreement: f32,
    pub probabilities: [f32; NUM_CLASSES],
    pub members: BTreeMap<String, MemberPrediction>,
}

/// Index of the largest probability; ties break toward the lowest class
/// index, which is stable under the fixed label ordering.
fn argmax(probs: &Array1<f32>) -> usize {
    let mut best = 0;
    for (i, &p) in probs.iter().enumerate() {
        if p > probs[best] {
            best = i;
        }
    }
    best
}

/// Runs every registered classifier over one preprocessed tensor and
/// combines the per-member distributions.
///
/// An empty registry is refused up front. A single member's forward-pass
/// failure aborts the whole request: a partial ensemble would silently
/// change the statistical meaning of agreement.
pub fn run_ensemble(
    registry: &ModelRegistry,
    input: &Array4<f32>,
) -> Result<EnsembleResult, PredictError> {
    if registry.is_empty() {
        return Err(PredictError::NoModels);
    }

    let mut members = BTreeMap::new();
    let mut sum_probs = Array1::<f32>::zeros(NUM_CLASSES);

    for (name, classifier) in registry.iter() {
        let logits = classifier.forward(input)?;
        if logits.len() != NUM_CLASSES {
            return Err(PredictError::Inference(format!(
                "{} produced {} logits, expected {}",
                name,
                logits.len(),
                NUM_CLASSES
            )));
        }
        let probs = softmax(&logits);
        let top = argmax(&probs);
        members.insert(
            name.to_string(),
            MemberPrediction {
                class_id: top,
                // top < NUM_CLASSES by construction
                label: ClassLabel::from_index(top)
                    .ok_or_else(|| PredictError::Inference("class index out of range".into()))?,
                confidence: probs[top],
            },
        );
        sum_probs += &probs;
    }

    let n_models = members.len() as f32;
    let ens_probs = sum_probs / n_models;
    let top_idx = argmax(&ens_probs);
    let label = ClassLabel::from_index(top_idx)
        .ok_or_else(|| PredictError::Inference("class index out of range".into()))?;

    let matching = members.values().filter(|m| m.class_id == top_idx).count();
    let agreement = matching as f32 / n_models;

    let mut probabilities = [0.0f32; NUM_CLASSES];
    for (slot, &p) in probabilities.iter_mut().zip(ens_probs.iter()) {
        *slot = p;
    }

    Ok(EnsembleResult {
        class_id: top_idx,
        label,
        confidence: probabilities[top_idx],
        agreement,
        probabilities,
        members,
    })
}

impl EnsembleResult {
    /// Joins the class knowledge base into the canonical response schema.
    pub fn into_report(self) -> PredictionReport {
        let info = class_info(self.label);
        let prediction = Prediction {
            class_id: self.class_id as i64,
            class_name: self.label.as_str().to_string(),
            display_name: info.display.to_string(),
            risk: info.risk.as_str().to_string(),
            description: info.description.to_string(),
            recommendation: info.recommendation.to_string(),
            confidence: self.confidence as f64,
            agreement: self.agreement as f64,
        };

        let model_predictions = self
            .members
            .into_iter()
            .map(|(name, m)| {
                (
                    name,
                    ModelPrediction {
                        class_id: m.class_id as i64,
                        class_name: m.label.as_str().to_string(),
                        confidence: m.confidence as f64,
                    },
                )
            })
            .collect();

        let class_probabilities = ClassLabel::ALL
            .iter()
            .map(|label| {
                (
                    label.as_str().to_string(),
                    self.probabilities[label.index()] as f64,
                )
            })
            .collect();

        PredictionReport {
            prediction,
            model_predictions,
            class_probabilities,
        }
    }
}
