use ndarray::{Array1, Array2, Array4, ArrayView1};
use ort::session::Session;
use ort::value::Tensor;
use std::sync::Mutex;

use super::arch::Architecture;
use super::checkpoint::ParamMap;
use super::error::PredictError;
use super::loader::ArtifactError;
use crate::classes::NUM_CLASSES;

/// An inference-ready ensemble member: takes one preprocessed
/// `[1, 3, 224, 224]` tensor and produces 7 raw class logits.
///
/// The seam exists so the ensemble and loader can be exercised against
/// stub members in tests; the production implementation is
/// [`OnnxClassifier`].
pub trait LesionClassifier: Send + Sync {
    /// Architecture name the member is registered under.
    fn architecture(&self) -> &str;

    /// Runs one forward pass. No gradients, no side effects.
    fn forward(&self, input: &Array4<f32>) -> Result<Array1<f32>, PredictError>;
}

impl std::fmt::Debug for dyn LesionClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LesionClassifier")
            .field("architecture", &self.architecture())
            .finish()
    }
}

/// The 7-class linear classification head applied on top of a frozen
/// feature extractor: `logits = W · features + b`, `W: [7, in_features]`.
#[derive(Debug, Clone)]
pub struct LinearHead {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl LinearHead {
    /// Pulls the head out of a canonical parameter map by the
    /// architecture's exported key names, validating that it really is a
    /// 7-logit head. Unrelated entries in the map are ignored.
    pub fn from_params(arch: Architecture, params: &ParamMap) -> Result<Self, ArtifactError> {
        let (weight_key, bias_key) = arch.head_keys();

        let weight = params.get(weight_key).ok_or(ArtifactError::MissingParam {
            arch: arch.name(),
            key: weight_key,
        })?;
        let bias = params.get(bias_key).ok_or(ArtifactError::MissingParam {
            arch: arch.name(),
            key: bias_key,
        })?;

        if weight.shape.len() != 2 || weight.shape[0] != NUM_CLASSES {
            return Err(ArtifactError::HeadShape {
                arch: arch.name(),
                got: weight.shape.clone(),
            });
        }
        if bias.shape != [NUM_CLASSES] {
            return Err(ArtifactError::HeadShape {
                arch: arch.name(),
                got: bias.shape.clone(),
            });
        }

        let in_features = weight.shape[1];
        let weight = Array2::from_shape_vec((NUM_CLASSES, in_features), weight.data.clone())
            .map_err(|_| ArtifactError::HeadShape {
                arch: arch.name(),
                got: vec![NUM_CLASSES, in_features],
            })?;
        let bias = Array1::from_vec(bias.data.clone());

        Ok(Self { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    /// Applies the head to one feature vector, yielding the 7 logits.
    pub fn apply(&self, features: ArrayView1<f32>) -> Result<Array1<f32>, PredictError> {
        if features.len() != self.in_features() {
            return Err(PredictError::Inference(format!(
                "backbone produced {} features, head expects {}",
                features.len(),
                self.in_features()
            )));
        }
        Ok(self.weight.dot(&features) + &self.bias)
    }
}

/// Production ensemble member: an ONNX feature-extractor session with the
/// trained linear head bound on top.
///
/// `Session::run` needs exclusive access, so the session sits behind a
/// `Mutex`; members stay shareable across threads.
pub struct OnnxClassifier {
    arch: Architecture,
    session: Mutex<Session>,
    input_name: String,
    head: LinearHead,
}

impl OnnxClassifier {
    pub fn new(arch: Architecture, session: Session, head: LinearHead) -> Result<Self, ArtifactError> {
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or(ArtifactError::NoGraphInput { arch: arch.name() })?;
        Ok(Self {
            arch,
            session: Mutex::new(session),
            input_name,
            head,
        })
    }
}

impl LesionClassifier for OnnxClassifier {
    fn architecture(&self) -> &str {
        self.arch.name()
    }

    fn forward(&self, input: &Array4<f32>) -> Result<Array1<f32>, PredictError> {
        let shape: Vec<i64> = input.shape().iter().map(|&d| d as i64).collect();
        let data: Vec<f32> = input.iter().copied().collect();
        let tensor = Tensor::from_array((shape, data))
            .map_err(|e| PredictError::Inference(format!("Failed to create input tensor: {}", e)))?;
        let inputs = ort::inputs![self.input_name.as_str() => tensor]
            .map_err(|e| PredictError::Inference(format!("Failed to bind input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| PredictError::Inference("session lock poisoned".into()))?;
        let outputs = session
            .run(inputs)
            .map_err(|e| PredictError::Inference(format!("Failed to run model: {}", e)))?;
        let features = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| PredictError::Inference(format!("Failed to extract output tensor: {}", e)))?;

        // Batch size is always 1; trailing singleton dims from pooling
        // layers flatten away with the rest.
        let features = Array1::from_iter(features.iter().copied());
        self.head.apply(features.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::checkpoint::TensorEntry;

    fn head_params(weight_key: &str, bias_key: &str, in_features: usize) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert(
            weight_key.to_string(),
            TensorEntry {
                shape: vec![NUM_CLASSES, in_features],
                data: vec![0.1; NUM_CLASSES * in_features],
            },
        );
        params.insert(
            bias_key.to_string(),
            TensorEntry {
                shape: vec![NUM_CLASSES],
                data: vec![0.0; NUM_CLASSES],
            },
        );
        params
    }

    #[test]
    fn head_extraction_by_architecture_keys() {
        let params = head_params("fc.weight", "fc.bias", 4);
        let head = LinearHead::from_params(Architecture::ResNet50, &params).unwrap();
        assert_eq!(head.in_features(), 4);
    }

    #[test]
    fn head_ignores_unrelated_backbone_entries() {
        let mut params = head_params("classifier.weight", "classifier.bias", 8);
        params.insert(
            "features.0.conv.weight".to_string(),
            TensorEntry {
                shape: vec![2, 2],
                data: vec![0.0; 4],
            },
        );
        assert!(LinearHead::from_params(Architecture::DenseNet121, &params).is_ok());
    }

    #[test]
    fn missing_head_key_is_reported() {
        let params = head_params("fc.weight", "fc.bias", 4);
        let err = LinearHead::from_params(Architecture::MobileNetV3, &params).unwrap_err();
        assert!(matches!(err, ArtifactError::MissingParam { .. }));
    }

    #[test]
    fn wrong_logit_count_is_rejected() {
        let mut params = ParamMap::new();
        params.insert(
            "fc.weight".to_string(),
            TensorEntry {
                shape: vec![5, 4],
                data: vec![0.0; 20],
            },
        );
        params.insert(
            "fc.bias".to_string(),
            TensorEntry {
                shape: vec![5],
                data: vec![0.0; 5],
            },
        );
        let err = LinearHead::from_params(Architecture::ResNet50, &params).unwrap_err();
        assert!(matches!(err, ArtifactError::HeadShape { .. }));
    }

    #[test]
    fn head_apply_checks_feature_length() {
        let params = head_params("fc.weight", "fc.bias", 4);
        let head = LinearHead::from_params(Architecture::ResNet50, &params).unwrap();
        let err = head.apply(Array1::zeros(3).view()).unwrap_err();
        assert!(matches!(err, PredictError::Inference(_)));

        let logits = head.apply(Array1::ones(4).view()).unwrap();
        assert_eq!(logits.len(), NUM_CLASSES);
        assert!((logits[0] - 0.4).abs() < 1e-6);
    }
}
