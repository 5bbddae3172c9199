use ort::Error as OrtError;
use std::fmt;

/// Represents the different types of errors that can occur on the
/// prediction path.
#[derive(Debug)]
pub enum PredictError {
    /// No classifier loaded; inference is refused rather than run against
    /// an empty registry
    NoModels,
    /// The submitted image could not be decoded (client input error)
    ImageDecode(String),
    /// A forward pass failed mid-ensemble; the whole request is aborted
    Inference(String),
}

impl fmt::Display for PredictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoModels => write!(f, "No models are loaded; cannot run inference"),
            Self::ImageDecode(msg) => write!(f, "Invalid image file: {}", msg),
            Self::Inference(msg) => write!(f, "Inference error: {}", msg),
        }
    }
}

impl std::error::Error for PredictError {}

impl From<OrtError> for PredictError {
    fn from(err: OrtError) -> Self {
        PredictError::Inference(err.to_string())
    }
}
