//! An ensemble skin-lesion image classifier built on ONNX Runtime.
//!
//! Several independently trained backbones (MobileNetV3, DenseNet121,
//! ResNet50) classify the same dermatoscopic image into one of seven
//! diagnostic categories; their probability distributions are averaged
//! into a single calibrated prediction with agreement statistics and
//! per-class risk metadata.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use dermascan::PredictionService;
//!
//! let service = PredictionService::new("./models")?;
//! let bytes = std::fs::read("lesion.jpg")?;
//! let report = service.predict_bytes(&bytes)?;
//!
//! println!("{} ({:.1}% confidence, {:.0}% agreement)",
//!     report.prediction.display_name,
//!     report.prediction.confidence * 100.0,
//!     report.prediction.agreement * 100.0);
//! # Ok(())
//! # }
//! ```
//!
//! # Partial loading
//!
//! Model artifacts load independently: one unreadable or mismatched
//! checkpoint is logged and skipped, and the ensemble runs over whatever
//! subset loaded. Only when no artifact loads at all does construction
//! fail — an empty registry never serves predictions.
//!
//! # Thread Safety
//!
//! The registry is immutable after construction and every prediction is a
//! read-only pass over it, so a [`PredictionService`] can be shared across
//! threads behind an `Arc` (or via [`PredictionService::shared`]).

pub mod classes;
pub mod classifier;
pub mod ensemble;
pub mod normalize;
pub mod preprocess;
pub mod report;
pub mod runtime;
pub mod service;

pub use classes::{class_info, is_malignant, ClassInfo, ClassLabel, Risk, NUM_CLASSES};
pub use classifier::{
    Architecture, ArtifactError, ClassifierFactory, LesionClassifier, LinearHead, ModelRegistry,
    OnnxClassifierFactory, ParamMap, PredictError, TensorEntry,
};
pub use ensemble::{run_ensemble, softmax, EnsembleResult, MemberPrediction};
pub use normalize::{compute_risk, normalize, safe_float};
pub use report::{ModelPrediction, Prediction, PredictionReport};
pub use runtime::{create_session_builder, Device, RuntimeConfig};
pub use service::{PredictionService, ServiceHealth};

pub fn init_logger() {
    env_logger::init();
}
