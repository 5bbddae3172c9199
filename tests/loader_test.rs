use dermascan::{
    Architecture, ArtifactError, ClassifierFactory, LesionClassifier, LinearHead, ModelRegistry,
    ParamMap, PredictError,
};
use ndarray::{Array1, Array4};
use serde_json::{json, Value};
use std::path::Path;

/// Factory that validates the head like the production one but swaps the
/// ONNX backbone for a zero-feature stub, so loader behaviour is testable
/// without graph files on disk.
struct StubFactory;

struct StubClassifier {
    arch: Architecture,
    head: LinearHead,
}

impl LesionClassifier for StubClassifier {
    fn architecture(&self) -> &str {
        self.arch.name()
    }

    fn forward(&self, _input: &Array4<f32>) -> Result<Array1<f32>, PredictError> {
        self.head.apply(Array1::zeros(self.head.in_features()).view())
    }
}

impl ClassifierFactory for StubFactory {
    fn build(
        &self,
        arch: Architecture,
        _models_dir: &Path,
        params: ParamMap,
    ) -> Result<Box<dyn LesionClassifier>, ArtifactError> {
        let head = LinearHead::from_params(arch, &params)?;
        Ok(Box::new(StubClassifier { arch, head }))
    }
}

fn head_tensors(weight_key: &str, bias_key: &str, in_features: usize) -> Value {
    let mut tensors = serde_json::Map::new();
    tensors.insert(
        weight_key.to_string(),
        json!({ "shape": [7, in_features], "data": vec![0.1f32; 7 * in_features] }),
    );
    tensors.insert(
        bias_key.to_string(),
        json!({ "shape": [7], "data": vec![0.0f32; 7] }),
    );
    Value::Object(tensors)
}

fn write_checkpoint(dir: &Path, filename: &str, contents: &Value) {
    std::fs::write(dir.join(filename), serde_json::to_vec(contents).unwrap()).unwrap();
}

#[test]
fn single_loadable_artifact_yields_single_entry_registry() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = json!({ "model": head_tensors("fc.weight", "fc.bias", 4) });
    write_checkpoint(dir.path(), "final_resnet50_model.json", &checkpoint);

    let registry = ModelRegistry::load_with(dir.path(), &StubFactory).unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.names(), vec!["resnet50".to_string()]);
}

#[test]
fn empty_directory_reports_total_failure() {
    let dir = tempfile::tempdir().unwrap();
    let err = ModelRegistry::load_with(dir.path(), &StubFactory).unwrap_err();
    assert!(matches!(err, ArtifactError::NoneLoaded(_)));
}

#[test]
fn one_bad_artifact_does_not_abort_the_others() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("densenet121.json"), b"{ not json").unwrap();
    let checkpoint = json!({
        "state_dict": head_tensors("classifier.3.weight", "classifier.3.bias", 8)
    });
    write_checkpoint(dir.path(), "mobilenetv3.json", &checkpoint);

    let registry = ModelRegistry::load_with(dir.path(), &StubFactory).unwrap();
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.names(), vec!["mobilenetv3".to_string()]);
}

#[test]
fn all_container_shapes_load() {
    let dir = tempfile::tempdir().unwrap();
    // Nested "model" container.
    write_checkpoint(
        dir.path(),
        "final_resnet50_model.json",
        &json!({ "model": head_tensors("fc.weight", "fc.bias", 4) }),
    );
    // Self-describing export record.
    write_checkpoint(
        dir.path(),
        "densenet121.json",
        &json!({
            "arch": "densenet121",
            "num_classes": 7,
            "weights": head_tensors("classifier.weight", "classifier.bias", 6)
        }),
    );
    // Flat state dict with a data-parallel "module." prefix.
    write_checkpoint(
        dir.path(),
        "mobilenetv3.json",
        &json!({
            "module.classifier.3.weight": { "shape": [7, 8], "data": vec![0.1f32; 56] },
            "module.classifier.3.bias": { "shape": [7], "data": vec![0.0f32; 7] }
        }),
    );

    let registry = ModelRegistry::load_with(dir.path(), &StubFactory).unwrap();
    assert_eq!(registry.len(), 3);
    assert_eq!(
        registry.names(),
        vec![
            "densenet121".to_string(),
            "mobilenetv3".to_string(),
            "resnet50".to_string()
        ]
    );
}

#[test]
fn checkpoint_with_wrong_head_shape_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    // A 5-class head cannot serve a 7-class ensemble.
    write_checkpoint(
        dir.path(),
        "resnet50.json",
        &json!({ "model": {
            "fc.weight": { "shape": [5, 4], "data": vec![0.0f32; 20] },
            "fc.bias": { "shape": [5], "data": vec![0.0f32; 5] }
        }}),
    );
    let err = ModelRegistry::load_with(dir.path(), &StubFactory).unwrap_err();
    assert!(matches!(err, ArtifactError::NoneLoaded(_)));
}

#[test]
fn unrecognized_container_layout_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(
        dir.path(),
        "resnet50.json",
        &json!({ "epoch": 30, "accuracy": 0.91 }),
    );
    let err = ModelRegistry::load_with(dir.path(), &StubFactory).unwrap_err();
    assert!(matches!(err, ArtifactError::NoneLoaded(_)));
}
