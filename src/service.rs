//! Process-scoped prediction service: owns the model registry, wires the
//! pipeline stages together, and exposes the serving-layer entry points.

use image::DynamicImage;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;

use crate::classifier::{ArtifactError, ModelRegistry, PredictError};
use crate::ensemble::run_ensemble;
use crate::normalize::normalize;
use crate::preprocess::{decode_image, to_tensor};
use crate::report::PredictionReport;

static SHARED: OnceLock<PredictionService> = OnceLock::new();

/// Liveness payload for the serving layer's health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: &'static str,
    pub models: Vec<String>,
}

/// The inference pipeline bound to one loaded registry. Construct once at
/// startup and share by reference; every method is a read-only pass over
/// the registry.
pub struct PredictionService {
    registry: ModelRegistry,
}

impl PredictionService {
    /// Builds the registry from `models_dir`. Fails with
    /// [`ArtifactError::NoneLoaded`] when nothing loads, rather than
    /// standing up a service that cannot predict.
    pub fn new(models_dir: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let registry = ModelRegistry::load(models_dir)?;
        Ok(Self { registry })
    }

    /// Wraps an existing registry.
    pub fn with_registry(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    /// Process-wide shared instance. The first successful call builds the
    /// registry; later calls reuse it regardless of the directory argument.
    pub fn shared(models_dir: impl AsRef<Path>) -> Result<&'static PredictionService, ArtifactError> {
        if let Some(service) = SHARED.get() {
            return Ok(service);
        }
        let service = PredictionService::new(models_dir)?;
        Ok(SHARED.get_or_init(|| service))
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Full pipeline over a decoded image: preprocess, ensemble, join the
    /// knowledge base.
    pub fn predict(&self, image: &DynamicImage) -> Result<PredictionReport, PredictError> {
        let tensor = to_tensor(image);
        let result = run_ensemble(&self.registry, &tensor)?;
        Ok(result.into_report())
    }

    /// Decodes raw upload bytes first; malformed input surfaces as
    /// [`PredictError::ImageDecode`].
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<PredictionReport, PredictError> {
        let image = decode_image(bytes)?;
        self.predict(&image)
    }

    /// Serving-layer entry point: predicts, echoes the opaque caller
    /// identifiers into the payload verbatim, and runs the result through
    /// the normalizer so the response is canonical no matter what.
    pub fn predict_with_context(
        &self,
        image: &DynamicImage,
        user_id: Option<&str>,
        meta: Option<Value>,
    ) -> Result<Value, PredictError> {
        let report = self.predict(image)?;
        let mut payload = serde_json::to_value(&report)
            .map_err(|e| PredictError::Inference(e.to_string()))?;
        if let Some(object) = payload.as_object_mut() {
            if let Some(user_id) = user_id {
                object.insert("user_id".to_string(), Value::String(user_id.to_string()));
            }
            if let Some(meta) = meta {
                object.insert("meta".to_string(), meta);
            }
        }
        Ok(normalize(payload))
    }

    pub fn health(&self) -> ServiceHealth {
        ServiceHealth {
            status: "ok",
            models: self.registry.names(),
        }
    }
}
