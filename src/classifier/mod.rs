//! Classifier subsystem: artifact discovery, tolerant checkpoint
//! deserialization, and the inference-ready model registry.

mod arch;
mod checkpoint;
mod error;
mod loader;
mod model;

pub use arch::Architecture;
pub use checkpoint::{extract_params, ParamMap, TensorEntry};
pub use error::PredictError;
pub use loader::{
    find_checkpoint, ArtifactError, ClassifierFactory, ModelRegistry, OnnxClassifierFactory,
};
pub use model::{LesionClassifier, LinearHead, OnnxClassifier};
