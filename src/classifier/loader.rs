use log::{info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::arch::Architecture;
use super::checkpoint::{extract_params, ParamMap};
use super::model::{LesionClassifier, LinearHead, OnnxClassifier};
use crate::runtime::{create_session_builder, Device, RuntimeConfig};

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("no checkpoint file found for {arch}")]
    NotFound { arch: &'static str },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed checkpoint: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unrecognized checkpoint layout (expected a model/state_dict container or a flat parameter map)")]
    UnrecognizedLayout,
    #[error("checkpoint for {arch} is missing parameter '{key}'")]
    MissingParam { arch: &'static str, key: &'static str },
    #[error("classifier head for {arch} has shape {got:?}, expected a 7-logit head")]
    HeadShape { arch: &'static str, got: Vec<usize> },
    #[error("backbone graph not found: {0}")]
    MissingBackbone(PathBuf),
    #[error("backbone graph for {arch} has no inputs")]
    NoGraphInput { arch: &'static str },
    #[error("ONNX session error: {0}")]
    Session(#[from] ort::Error),
    #[error("no model artifacts could be loaded from {0}")]
    NoneLoaded(PathBuf),
}

/// Builds a runnable classifier out of an architecture and its extracted
/// canonical parameters. The seam lets tests drive the loader without any
/// backbone graphs on disk.
pub trait ClassifierFactory {
    fn build(
        &self,
        arch: Architecture,
        models_dir: &Path,
        params: ParamMap,
    ) -> Result<Box<dyn LesionClassifier>, ArtifactError>;
}

/// Production factory: opens the architecture's frozen ONNX feature
/// extractor and binds the checkpoint's classification head on top.
pub struct OnnxClassifierFactory {
    config: RuntimeConfig,
    device: Device,
}

impl OnnxClassifierFactory {
    pub fn new(config: RuntimeConfig, device: Device) -> Self {
        Self { config, device }
    }
}

impl Default for OnnxClassifierFactory {
    fn default() -> Self {
        Self::new(RuntimeConfig::default(), Device::detect())
    }
}

impl ClassifierFactory for OnnxClassifierFactory {
    fn build(
        &self,
        arch: Architecture,
        models_dir: &Path,
        params: ParamMap,
    ) -> Result<Box<dyn LesionClassifier>, ArtifactError> {
        let head = LinearHead::from_params(arch, &params)?;

        let backbone_path = models_dir.join(arch.backbone_file());
        if !backbone_path.exists() {
            return Err(ArtifactError::MissingBackbone(backbone_path));
        }

        // Sessions are inference-only; this is the eval-mode, no-gradient
        // equivalent of the trained model.
        let session = create_session_builder(&self.config, self.device)?
            .commit_from_file(&backbone_path)?;

        Ok(Box::new(OnnxClassifier::new(arch, session, head)?))
    }
}

/// The process-wide mapping of architecture name to loaded classifier.
/// Built once, read-only afterwards; concurrent reads are safe.
pub struct ModelRegistry {
    models: BTreeMap<String, Box<dyn LesionClassifier>>,
    device: Device,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("device", &self.device)
            .finish()
    }
}

impl ModelRegistry {
    /// Loads every architecture that can be loaded from `models_dir` using
    /// the production ONNX factory. See [`ModelRegistry::load_with`].
    pub fn load(models_dir: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        Self::load_with(models_dir, &OnnxClassifierFactory::default())
    }

    /// Loads the registry through an explicit factory.
    ///
    /// A failure to load one architecture is logged and skipped; it never
    /// aborts loading of the remaining architectures. Only when zero
    /// architectures load is the whole registry reported as failed —
    /// an empty but usable-looking registry is never returned.
    pub fn load_with(
        models_dir: impl AsRef<Path>,
        factory: &dyn ClassifierFactory,
    ) -> Result<Self, ArtifactError> {
        let models_dir = resolve_models_dir(models_dir.as_ref());
        let device = Device::detect();
        info!("Loading models from {:?} (device: {})", models_dir, device);

        let mut models: BTreeMap<String, Box<dyn LesionClassifier>> = BTreeMap::new();
        for arch in Architecture::ALL {
            match load_architecture(&models_dir, arch, factory) {
                Ok(classifier) => {
                    info!("Successfully loaded {}", arch);
                    models.insert(arch.name().to_string(), classifier);
                }
                Err(e) => {
                    warn!("Could not load {}: {}", arch, e);
                }
            }
        }

        if models.is_empty() {
            return Err(ArtifactError::NoneLoaded(models_dir));
        }
        info!("Loaded {} models successfully", models.len());
        Ok(Self { models, device })
    }

    /// Wraps already-built classifiers into a registry. Intended for
    /// embedders that bring their own members.
    pub fn from_classifiers(
        classifiers: impl IntoIterator<Item = Box<dyn LesionClassifier>>,
    ) -> Self {
        let models = classifiers
            .into_iter()
            .map(|c| (c.architecture().to_string(), c))
            .collect();
        Self {
            models,
            device: Device::detect(),
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Registered architecture names, in deterministic order.
    pub fn names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// Iterates members in deterministic (name) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn LesionClassifier)> {
        self.models.iter().map(|(name, c)| (name.as_str(), c.as_ref()))
    }
}

fn load_architecture(
    models_dir: &Path,
    arch: Architecture,
    factory: &dyn ClassifierFactory,
) -> Result<Box<dyn LesionClassifier>, ArtifactError> {
    let checkpoint_path = find_checkpoint(models_dir, arch)
        .ok_or(ArtifactError::NotFound { arch: arch.name() })?;
    info!("Loading {} checkpoint from {:?}", arch, checkpoint_path);

    let bytes = fs::read(&checkpoint_path)?;
    let raw: serde_json::Value = serde_json::from_slice(&bytes)?;
    let (params, layout) = extract_params(&raw).ok_or(ArtifactError::UnrecognizedLayout)?;
    info!("{} checkpoint uses the {} layout", arch, layout);

    factory.build(arch, models_dir, params)
}

/// Resolves the first existing checkpoint filename variant for an
/// architecture.
pub fn find_checkpoint(models_dir: &Path, arch: Architecture) -> Option<PathBuf> {
    arch.checkpoint_candidates()
        .iter()
        .map(|candidate| models_dir.join(candidate))
        .find(|path| path.exists())
}

/// When the configured directory does not exist, fall back to searching
/// ancestor directories of the working directory for a `models` child.
fn resolve_models_dir(models_dir: &Path) -> PathBuf {
    if models_dir.exists() {
        return models_dir.to_path_buf();
    }
    warn!("Models directory {:?} not found, searching ancestors", models_dir);
    if let Ok(cwd) = std::env::current_dir() {
        for ancestor in cwd.ancestors() {
            let candidate = ancestor.join("models");
            if candidate.is_dir() {
                info!("Found models directory at {:?}", candidate);
                return candidate;
            }
        }
    }
    models_dir.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn find_checkpoint_prefers_first_variant() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("resnet50.json"), "{}").unwrap();
        fs::write(dir.path().join("final_resnet50_model.json"), "{}").unwrap();

        let found = find_checkpoint(dir.path(), Architecture::ResNet50).unwrap();
        assert_eq!(
            found.file_name().unwrap().to_str().unwrap(),
            "final_resnet50_model.json"
        );
    }

    #[test]
    fn find_checkpoint_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_checkpoint(dir.path(), Architecture::DenseNet121).is_none());
    }

    #[test]
    fn missing_backbone_is_an_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        let weight: Vec<f32> = vec![0.0; 7 * 2];
        let checkpoint = json!({
            "model": {
                "fc.weight": { "shape": [7, 2], "data": weight },
                "fc.bias": { "shape": [7], "data": vec![0.0f32; 7] }
            }
        });
        fs::write(
            dir.path().join("resnet50.json"),
            serde_json::to_vec(&checkpoint).unwrap(),
        )
        .unwrap();

        let factory = OnnxClassifierFactory::default();
        let err = load_architecture(dir.path(), Architecture::ResNet50, &factory).unwrap_err();
        assert!(matches!(err, ArtifactError::MissingBackbone(_)));
    }
}
