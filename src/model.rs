use serde::{Deserialize, Serialize};

/// Tag used when a marker is created without a `type`.
pub const DEFAULT_MARKER_TYPE: &str = "📍";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub marker_type: Option<String>,
}

/// A validated create request. `name` is already trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMarker {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub marker_type: Option<String>,
}
