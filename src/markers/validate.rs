//! Shape checks for incoming marker payloads. Nothing here touches storage.

use serde_json::{Value, json};

use crate::model::{DEFAULT_MARKER_TYPE, NewMarker};

pub const MAX_TYPE_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub message: &'static str,
    pub received: Value,
}

fn field<'v>(body: &'v Value, key: &str) -> &'v Value {
    body.get(key).unwrap_or(&Value::Null)
}

/// `lat`/`lng` must be JSON numbers; strings such as `"40"` are rejected.
fn coordinates(body: &Value) -> Option<(f64, f64)> {
    Some((field(body, "lat").as_f64()?, field(body, "lng").as_f64()?))
}

pub fn new_marker(body: &Value) -> Result<NewMarker, ValidationError> {
    let received = json!({
        "lat": field(body, "lat"),
        "lng": field(body, "lng"),
        "name": field(body, "name"),
        "type": field(body, "type"),
    });

    let name = field(body, "name").as_str().map(str::trim).unwrap_or_default();
    let (lat, lng) = match coordinates(body) {
        Some(coords) if !name.is_empty() => coords,
        _ => {
            return Err(ValidationError {
                message: "Invalid marker data",
                received,
            });
        }
    };

    let marker_type = match field(body, "type") {
        Value::Null => DEFAULT_MARKER_TYPE.to_owned(),
        Value::String(s) if s.trim().is_empty() => DEFAULT_MARKER_TYPE.to_owned(),
        Value::String(s) if s.trim().chars().count() <= MAX_TYPE_LEN => s.trim().to_owned(),
        _ => {
            return Err(ValidationError {
                message: "Invalid marker type",
                received,
            });
        }
    };

    Ok(NewMarker {
        name: name.to_owned(),
        lat,
        lng,
        marker_type: Some(marker_type),
    })
}

pub fn position(body: &Value) -> Result<(f64, f64), ValidationError> {
    coordinates(body).ok_or_else(|| ValidationError {
        message: "Invalid coordinates",
        received: json!({ "lat": field(body, "lat"), "lng": field(body, "lng") }),
    })
}
