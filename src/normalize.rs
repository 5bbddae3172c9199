//! Result normalization.
//!
//! The serving layer has, over time, been fed by more than one predictor
//! implementation, and each shipped a slightly different payload shape.
//! This module coerces any of the historical shapes into the single
//! canonical response schema. It never errors: an unrecognizable payload
//! degrades to the `"unknown"` sentinel instead of a response that claims
//! false confidence. Pure value-to-value mapping, no I/O.

use serde_json::{json, Map, Value};

use crate::classes::{class_info, is_malignant, ClassLabel, Risk};

/// Coerces a possibly-absent, possibly-garbage value into a finite float,
/// falling back to `default` instead of propagating a parse failure.
pub fn safe_float(value: Option<&Value>, default: f64) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() => f,
        _ => default,
    }
}

/// Risk tier for payloads that did not supply one. The thresholds are
/// asymmetric: a low-confidence benign call must not read as reassuring.
pub fn compute_risk(class_name: &str, confidence: f64) -> Risk {
    if is_malignant(class_name) {
        if confidence >= 0.6 {
            Risk::High
        } else if confidence >= 0.35 {
            Risk::Medium
        } else {
            Risk::Low
        }
    } else if confidence >= 0.8 {
        Risk::Low
    } else {
        Risk::Medium
    }
}

/// The closed set of raw payload shapes the normalizer recognizes. The
/// classification step is separate from the coercion so each variant stays
/// auditable on its own.
#[derive(Debug, Clone, PartialEq)]
enum PayloadShape {
    /// Already carries `prediction` + `class_probabilities`; only missing
    /// display fields get filled in.
    Canonical,
    /// Anything else: a partial payload rebuilt field by field around
    /// whatever top (label, confidence) source it carries.
    Partial(TopSource),
    /// Not even an object.
    Opaque,
}

/// Where a partial payload's top (label, confidence) pair comes from.
#[derive(Debug, Clone, PartialEq)]
enum TopSource {
    /// An explicit `top` record.
    Record { label: String, confidence: f64 },
    /// First entry of a ranked `pred` list of (label, score) pairs.
    Ranked { label: String, confidence: f64 },
    /// Flat `class_name` + `confidence` at the payload root.
    Flat { label: String, confidence: f64 },
    /// Argmax of the probability mapping.
    FromProbabilities,
    /// Nothing resolvable; the sentinel applies.
    Unresolved,
}

fn classify(raw: &Value) -> PayloadShape {
    let object = match raw.as_object() {
        Some(object) => object,
        None => return PayloadShape::Opaque,
    };
    // The fill-only path requires a structured prediction object; a bare
    // scalar under the key is a partial payload, not a canonical one.
    if object.get("prediction").map_or(false, Value::is_object)
        && object.contains_key("class_probabilities")
    {
        return PayloadShape::Canonical;
    }

    let top = if let Some(Value::Object(top)) = object.get("top") {
        let label = top
            .get("class_name")
            .or_else(|| top.get("label"))
            .or_else(|| top.get("class"))
            .and_then(Value::as_str);
        match label {
            Some(label) => TopSource::Record {
                label: label.to_string(),
                confidence: safe_float(top.get("confidence").or_else(|| top.get("score")), 0.0),
            },
            None => TopSource::Unresolved,
        }
    } else if let Some(Value::Array(ranked)) = object.get("pred") {
        match ranked.first() {
            Some(Value::Array(pair)) if pair.len() >= 2 => match pair[0].as_str() {
                Some(label) => TopSource::Ranked {
                    label: label.to_string(),
                    confidence: safe_float(pair.get(1), 0.0),
                },
                None => TopSource::Unresolved,
            },
            _ => TopSource::Unresolved,
        }
    } else if let (Some(Value::String(label)), Some(confidence)) =
        (object.get("class_name"), object.get("confidence"))
    {
        TopSource::Flat {
            label: label.clone(),
            confidence: safe_float(Some(confidence), 0.0),
        }
    } else {
        TopSource::Unresolved
    };

    let top = match top {
        TopSource::Unresolved if probability_map(object).is_some() => TopSource::FromProbabilities,
        other => other,
    };
    PayloadShape::Partial(top)
}

/// The probability mapping under either of its two conventional names.
fn probability_map(object: &Map<String, Value>) -> Option<&Map<String, Value>> {
    object
        .get("class_probabilities")
        .or_else(|| object.get("probs"))
        .and_then(Value::as_object)
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Python-style title case used as the display-name fallback for labels
/// outside the knowledge base.
fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Maps a raw prediction payload of any recognized shape into the
/// canonical response. Fields already present are never overwritten, so
/// canonical input is a fixpoint; passthrough fields (`user_id`, `meta`)
/// survive untouched.
pub fn normalize(raw: Value) -> Value {
    match classify(&raw) {
        PayloadShape::Canonical => fill_canonical(raw),
        PayloadShape::Partial(top) => build_canonical(raw, top),
        PayloadShape::Opaque => build_canonical(Value::Null, TopSource::Unresolved),
    }
}

/// Rule 1: the upstream payload already carries the ensemble statistics.
/// Only absent display fields are inferred; confidence, agreement and the
/// probability map pass through unchanged.
fn fill_canonical(mut raw: Value) -> Value {
    let object = match raw.as_object_mut() {
        Some(object) => object,
        None => return raw,
    };

    if let Some(Value::Object(pred)) = object.get_mut("prediction") {
        let class_name = pred
            .get("class_name")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let known = ClassLabel::parse(&class_name).map(class_info);

        if is_missing(pred.get("display_name")) {
            let display = known
                .map(|info| info.display.to_string())
                .unwrap_or_else(|| {
                    if class_name.is_empty() {
                        "Unknown".to_string()
                    } else {
                        class_name.clone()
                    }
                });
            pred.insert("display_name".to_string(), Value::String(display));
        }
        if is_missing(pred.get("risk")) {
            let confidence = safe_float(pred.get("confidence"), 0.0);
            let risk = compute_risk(&class_name, confidence);
            pred.insert("risk".to_string(), Value::String(risk.as_str().to_string()));
        }
        if is_missing(pred.get("description")) {
            let description = known.map(|info| info.description).unwrap_or_default();
            pred.insert(
                "description".to_string(),
                Value::String(description.to_string()),
            );
        }
        if is_missing(pred.get("recommendation")) {
            let recommendation = known.map(|info| info.recommendation).unwrap_or_default();
            pred.insert(
                "recommendation".to_string(),
                Value::String(recommendation.to_string()),
            );
        }
    }

    if !object.contains_key("model_predictions") {
        object.insert("model_predictions".to_string(), json!({}));
    }
    raw
}

/// Rules 2-6: rebuild the canonical payload from whatever a partial or
/// foreign payload supplied.
fn build_canonical(raw: Value, top: TopSource) -> Value {
    let object = raw.as_object().cloned().unwrap_or_default();

    let (label, confidence) = match top {
        TopSource::Record { label, confidence }
        | TopSource::Ranked { label, confidence }
        | TopSource::Flat { label, confidence } => (label, confidence),
        TopSource::FromProbabilities => probability_map(&object)
            .and_then(|probs| {
                // Ties resolve to the first entry, like the ensemble argmax.
                let mut best: Option<(String, f64)> = None;
                for (name, value) in probs {
                    let score = safe_float(Some(value), 0.0);
                    if best.as_ref().map_or(true, |(_, top)| score > *top) {
                        best = Some((name.clone(), score));
                    }
                }
                best
            })
            .unwrap_or_else(|| ("unknown".to_string(), 0.0)),
        TopSource::Unresolved => ("unknown".to_string(), 0.0),
    };

    let class_name = label.to_ascii_lowercase();
    let confidence = if confidence.is_finite() { confidence } else { 0.0 };

    let known = ClassLabel::parse(&class_name);
    let class_id = known.map(|l| l.index() as i64).unwrap_or(-1);
    let info = known.map(class_info);

    let display_name = info
        .map(|i| i.display.to_string())
        .unwrap_or_else(|| title_case(&class_name));
    let description = info.map(|i| i.description).unwrap_or_default();
    let recommendation = info.map(|i| i.recommendation).unwrap_or_default();

    // Rule 4: an explicit upstream risk tier wins; otherwise derive one.
    let risk = match object.get("risk").and_then(Value::as_str) {
        Some(risk) if !risk.is_empty() => risk.to_string(),
        _ => compute_risk(&class_name, confidence).as_str().to_string(),
    };

    let class_probabilities = probability_map(&object)
        .map(|probs| Value::Object(probs.clone()))
        .unwrap_or_else(|| json!({}));
    let model_predictions = match object.get("model_predictions") {
        Some(Value::Object(preds)) => Value::Object(preds.clone()),
        _ => json!({}),
    };
    let agreement = safe_float(object.get("agreement"), 0.0);

    json!({
        "prediction": {
            "class_id": class_id,
            "class_name": class_name,
            "display_name": display_name,
            "risk": risk,
            "description": description,
            "recommendation": recommendation,
            "confidence": confidence,
            "agreement": agreement,
        },
        "model_predictions": model_predictions,
        "class_probabilities": class_probabilities,
    })
}
