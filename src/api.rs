use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Ack { success: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    pub endpoint: String,
    pub message: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_values: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: ErrorDetails,
}

impl ErrorBody {
    pub fn new(error: &str, endpoint: &str, message: impl Into<String>) -> Self {
        ErrorBody {
            error: error.to_owned(),
            details: ErrorDetails {
                endpoint: endpoint.to_owned(),
                message: message.into(),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                stack: None,
                received_values: None,
            },
        }
    }

    /// Builds the body from an error, recording its source chain as `stack`.
    pub fn from_error(error: &str, endpoint: &str, err: &(dyn std::error::Error + 'static)) -> Self {
        let mut body = ErrorBody::new(error, endpoint, crate::unpack_error(err));
        body.details.stack = source_chain(err);
        body
    }

    pub fn with_received(mut self, received: Value) -> Self {
        self.details.received_values = Some(received);
        self
    }

    pub fn into_response(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

fn source_chain(err: &(dyn std::error::Error + 'static)) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        lines.push(format!("{}: {}", lines.len(), source));
        current = source.source();
    }
    if lines.is_empty() { None } else { Some(lines.join("\n")) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn error_body_serializes_camel_case_details() {
        let body = ErrorBody::new("Invalid coordinates", "PATCH /markers/:id", "Invalid coordinates")
            .with_received(serde_json::json!({ "lat": "1", "lng": null }));
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["error"], "Invalid coordinates");
        assert_eq!(json["details"]["endpoint"], "PATCH /markers/:id");
        assert_eq!(json["details"]["receivedValues"]["lat"], "1");
        assert!(json["details"].get("stack").is_none());
        assert!(json["details"]["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn stack_is_omitted_without_a_cause() {
        let err = StoreError::NotFound("abc".to_owned());
        let body = ErrorBody::from_error("Failed to delete marker", "DELETE /markers/:id", &err);
        assert_eq!(body.details.message, "marker not found: abc");
        assert!(body.details.stack.is_none());
    }
}
