//! Tolerant checkpoint deserialization.
//!
//! Training runs from different eras of the project saved their parameters
//! in different container layouts. Rather than sniffing field names inline
//! at every call site, the known layouts form an ordered chain of adapters;
//! each adapter either recognizes the container and extracts the canonical
//! parameter map, or passes. The first match wins.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One serialized tensor: row-major data plus its shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TensorEntry {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl TensorEntry {
    /// Number of elements the shape describes.
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether `data` actually holds the number of elements `shape` claims.
    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.element_count()
    }
}

/// Canonical parameter mapping extracted from any supported container.
pub type ParamMap = BTreeMap<String, TensorEntry>;

/// A checkpoint container layout this loader knows how to unpack.
trait CheckpointAdapter {
    fn name(&self) -> &'static str;

    /// Returns the canonical parameter map if the container matches this
    /// layout, `None` if the structural precondition does not hold.
    fn extract(&self, raw: &Value) -> Option<ParamMap>;
}

/// `{"model": {<param>: tensor, ...}}`
struct NestedModel;

/// `{"state_dict": {<param>: tensor, ...}}`
struct NestedStateDict;

/// A self-describing export record that carries its own weights entry:
/// `{"arch": ..., "weights": {<param>: tensor, ...}}`
struct ExportRecord;

/// A bare parameter map, optionally namespaced with a `module.` prefix by
/// a data-parallel training wrapper. The prefix is stripped.
struct FlatStateDict;

impl CheckpointAdapter for NestedModel {
    fn name(&self) -> &'static str {
        "nested-model"
    }

    fn extract(&self, raw: &Value) -> Option<ParamMap> {
        parse_tensor_map(raw.get("model")?.as_object()?)
    }
}

impl CheckpointAdapter for NestedStateDict {
    fn name(&self) -> &'static str {
        "nested-state-dict"
    }

    fn extract(&self, raw: &Value) -> Option<ParamMap> {
        parse_tensor_map(raw.get("state_dict")?.as_object()?)
    }
}

impl CheckpointAdapter for ExportRecord {
    fn name(&self) -> &'static str {
        "export-record"
    }

    fn extract(&self, raw: &Value) -> Option<ParamMap> {
        let container = raw.as_object()?;
        if !container.contains_key("arch") {
            return None;
        }
        parse_tensor_map(container.get("weights")?.as_object()?)
    }
}

impl CheckpointAdapter for FlatStateDict {
    fn name(&self) -> &'static str {
        "flat-state-dict"
    }

    fn extract(&self, raw: &Value) -> Option<ParamMap> {
        let container = raw.as_object()?;
        if container.is_empty() {
            return None;
        }
        let params = parse_tensor_map(container)?;
        Some(
            params
                .into_iter()
                .map(|(key, tensor)| {
                    let key = key.strip_prefix("module.").unwrap_or(&key).to_string();
                    (key, tensor)
                })
                .collect(),
        )
    }
}

fn parse_tensor_map(object: &Map<String, Value>) -> Option<ParamMap> {
    if object.is_empty() {
        return None;
    }
    let mut params = ParamMap::new();
    for (key, value) in object {
        let tensor: TensorEntry = serde_json::from_value(value.clone()).ok()?;
        if !tensor.is_consistent() {
            return None;
        }
        params.insert(key.clone(), tensor);
    }
    Some(params)
}

/// Extracts the canonical parameter map from a deserialized checkpoint,
/// trying each known container layout in order.
pub fn extract_params(raw: &Value) -> Option<(ParamMap, &'static str)> {
    let adapters: [&dyn CheckpointAdapter; 4] =
        [&NestedModel, &NestedStateDict, &ExportRecord, &FlatStateDict];
    for adapter in adapters {
        if let Some(params) = adapter.extract(raw) {
            log::debug!("checkpoint matched {} layout", adapter.name());
            return Some((params, adapter.name()));
        }
    }
    None
}
