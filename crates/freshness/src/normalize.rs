//! Normalization of untrusted model output into [`ItemAnalysis`] records.
//!
//! The raw text is parsed into a loose `serde_json::Value` first and then
//! mapped field by field. Every field has a default path; the only failure
//! is a payload with no JSON in it at all.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::{
    Characteristics, ItemAnalysis, NutritionInfo, Position, Recommendation, DEFAULT_BLEMISHES,
    DEFAULT_COLOR, DEFAULT_DETAILS, DEFAULT_LABEL, DEFAULT_RIPENESS, DEFAULT_TEXTURE,
};

pub const DEFAULT_FRESHNESS: u8 = 50;
pub const DEFAULT_CONFIDENCE: u8 = 75;

/// Keys that mark a multi-item response, in lookup order.
const COLLECTION_KEYS: [&str; 2] = ["fruits", "items"];

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, NormalizeError>;

pub fn normalize(raw: &str) -> Result<Vec<ItemAnalysis>> {
    let root = parse_payload(raw)?;
    let items = item_values(root)?;
    Ok(items.iter().map(item_from_value).collect())
}

/// Body of the first Markdown code fence, or the whole text when unfenced.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };

    let after_open = &trimmed[open + 3..];
    let body = match after_open.find('\n') {
        Some(nl) if after_open[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            &after_open[nl + 1..]
        }
        _ => after_open,
    };

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

fn parse_payload(raw: &str) -> Result<Value> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(NormalizeError::MalformedResponse("empty response".to_string()));
    }

    match serde_json::from_str::<Value>(body) {
        Ok(v) => Ok(v),
        Err(first_err) => {
            // Models sometimes wrap the object in prose.
            let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
                return Err(NormalizeError::MalformedResponse(first_err.to_string()));
            };
            if end <= start {
                return Err(NormalizeError::MalformedResponse(first_err.to_string()));
            }
            serde_json::from_str::<Value>(&body[start..=end])
                .map_err(|_| NormalizeError::MalformedResponse(first_err.to_string()))
        }
    }
}

fn item_values(root: Value) -> Result<Vec<Value>> {
    match root {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in COLLECTION_KEYS {
                if matches!(map.get(key), Some(Value::Array(_))) {
                    if let Some(Value::Array(items)) = map.remove(key) {
                        return Ok(items);
                    }
                }
            }
            Ok(vec![Value::Object(map)])
        }
        other => Err(NormalizeError::MalformedResponse(format!(
            "expected an object or array, got {}",
            kind(&other)
        ))),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| !v.is_null())
}

/// Leading numeric prefix of a string, so "85%" reads as 85.
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if let Ok(v) = s.parse::<f64>() {
        return Some(v);
    }
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse::<f64>().ok()
}

fn as_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn percent(obj: &Map<String, Value>, keys: &[&str], default: u8) -> u8 {
    field(obj, keys)
        .and_then(as_number)
        .map(|n| n.round().clamp(0.0, 100.0) as u8)
        .unwrap_or(default)
}

fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(obj, keys).and_then(as_text)
}

fn position(obj: &Map<String, Value>) -> Option<Position> {
    let pos = field(obj, &["position"])?.as_object()?;
    Some(Position {
        x: pos.get("x").and_then(as_number)?,
        y: pos.get("y").and_then(as_number)?,
        width: pos.get("width").and_then(as_number)?,
        height: pos.get("height").and_then(as_number)?,
    })
}

fn characteristics(obj: &Map<String, Value>) -> Characteristics {
    let empty = Map::new();
    let c = field(obj, &["characteristics"])
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    Characteristics {
        color: text(c, &["color", "colour"]).unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        texture: text(c, &["texture"]).unwrap_or_else(|| DEFAULT_TEXTURE.to_string()),
        blemishes: text(c, &["blemishes"]).unwrap_or_else(|| DEFAULT_BLEMISHES.to_string()),
        ripeness: text(c, &["ripeness"]).unwrap_or_else(|| DEFAULT_RIPENESS.to_string()),
    }
}

fn nutrition(obj: &Map<String, Value>) -> Option<NutritionInfo> {
    let n = field(obj, &["nutritionInfo", "nutrition_info", "nutrition"])?.as_object()?;
    let info = NutritionInfo {
        calories: text(n, &["calories"]),
        vitamins: text(n, &["vitamins"]),
        fiber: text(n, &["fiber", "fibre"]),
        minerals: text(n, &["minerals"]),
        benefits: text(n, &["benefits"]),
    };
    (!info.is_empty()).then_some(info)
}

fn days_remaining(obj: &Map<String, Value>) -> Option<u32> {
    let n = field(obj, &["daysRemaining", "days_remaining"]).and_then(as_number)?;
    (n >= 0.0).then(|| n.round() as u32)
}

fn item_from_value(value: &Value) -> ItemAnalysis {
    let empty = Map::new();
    let obj = match value {
        Value::Object(map) => map,
        Value::String(label) => {
            let mut item = ItemAnalysis::new(label.trim(), DEFAULT_FRESHNESS, Recommendation::Check);
            if item.label.is_empty() {
                item.label = DEFAULT_LABEL.to_string();
            }
            return item;
        }
        _ => &empty,
    };

    let recommendation = field(obj, &["recommendation"])
        .and_then(Value::as_str)
        .map(Recommendation::parse_lenient)
        .unwrap_or(Recommendation::Check);

    ItemAnalysis {
        label: text(obj, &["item", "label", "name"]).unwrap_or_else(|| DEFAULT_LABEL.to_string()),
        freshness_score: percent(obj, &["freshness", "freshnessScore", "freshness_score"], DEFAULT_FRESHNESS),
        recommendation,
        confidence: percent(obj, &["confidence"], DEFAULT_CONFIDENCE),
        details: text(obj, &["details"]).unwrap_or_else(|| DEFAULT_DETAILS.to_string()),
        characteristics: characteristics(obj),
        position: position(obj),
        storage_recommendation: text(obj, &["storageRecommendation", "storage_recommendation"]),
        days_remaining: days_remaining(obj),
        nutrition_info: nutrition(obj),
        selection_tips: text(obj, &["selectionTips", "selection_tips"]),
        season_info: text(obj, &["seasonInfo", "season_info"]),
        common_uses: text(obj, &["commonUses", "common_uses"]),
        ripe_timing: text(obj, &["ripeTiming", "ripe_timing"]),
        pairings: text(obj, &["pairings"]),
        medicinal_uses: text(obj, &["medicinalUses", "medicinal_uses"]),
    }
}
