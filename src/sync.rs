//! Client-side view of the shared marker set.
//!
//! [`MarkerBoard`] keeps a local copy of the markers and talks to the service
//! through a [`MarkerApi`]. Moves and deletes are applied locally before the
//! request is sent; when a request fails the local copy is thrown away and the
//! full list is fetched again. There is no per-mutation rollback.

use axum::{
    Router,
    body::{Body, Bytes},
    http::{Method, Request, StatusCode, header},
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::api::ErrorBody;
use crate::model::Marker;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ApiFailure {
    /// `None` when no response was received.
    pub status: Option<StatusCode>,
    pub message: String,
}

impl ApiFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        ApiFailure {
            status: None,
            message: message.into(),
        }
    }

    /// Prefers `details.message`, then `error`, then `fallback`.
    pub fn from_response(status: StatusCode, body: &[u8], fallback: &str) -> Self {
        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .map(|b| {
                if b.details.message.is_empty() {
                    b.error
                } else {
                    b.details.message
                }
            })
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_owned());

        ApiFailure {
            status: Some(status),
            message,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait MarkerApi {
    async fn list(&self) -> Result<Vec<Marker>, ApiFailure>;
    async fn create(&self, lat: f64, lng: f64, name: &str, marker_type: Option<&str>) -> Result<Marker, ApiFailure>;
    async fn update_position(&self, id: &str, lat: f64, lng: f64) -> Result<(), ApiFailure>;
    async fn delete(&self, id: &str) -> Result<(), ApiFailure>;
}

/// Calls the service's router in-process.
#[derive(Clone)]
pub struct RouterApi {
    router: Router,
}

impl RouterApi {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>, fallback: &str) -> Result<Bytes, ApiFailure> {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let request = request.body(body).map_err(|e| ApiFailure::transport(e.to_string()))?;

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .map_err(|e| ApiFailure::transport(e.to_string()))?;

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| ApiFailure::transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiFailure::from_response(status, &bytes, fallback));
        }
        Ok(bytes)
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiFailure> {
        serde_json::from_slice(bytes).map_err(|e| ApiFailure::transport(format!("malformed response: {e}")))
    }
}

impl MarkerApi for RouterApi {
    async fn list(&self) -> Result<Vec<Marker>, ApiFailure> {
        let bytes = self.send(Method::GET, "/markers", None, "Failed to fetch markers").await?;
        Self::decode(&bytes)
    }

    async fn create(&self, lat: f64, lng: f64, name: &str, marker_type: Option<&str>) -> Result<Marker, ApiFailure> {
        let body = json!({ "lat": lat, "lng": lng, "name": name, "type": marker_type });
        let bytes = self
            .send(Method::POST, "/markers", Some(body), "Failed to add marker")
            .await?;
        Self::decode(&bytes)
    }

    async fn update_position(&self, id: &str, lat: f64, lng: f64) -> Result<(), ApiFailure> {
        let uri = format!("/markers/{id}");
        self.send(
            Method::PATCH,
            &uri,
            Some(json!({ "lat": lat, "lng": lng })),
            "Failed to update marker position",
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), ApiFailure> {
        let uri = format!("/markers/{id}");
        self.send(Method::DELETE, &uri, None, "Failed to delete marker").await?;
        Ok(())
    }
}

pub struct MarkerBoard<A> {
    api: A,
    markers: Vec<Marker>,
    error: Option<String>,
    loading: bool,
}

impl<A: MarkerApi> MarkerBoard<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            markers: vec![],
            error: None,
            loading: false,
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Text of the error banner, if one is showing.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True while a reload of the full list is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn refresh(&mut self) -> Result<(), ApiFailure> {
        self.loading = true;
        let result = self.api.list().await;
        self.loading = false;

        match result {
            Ok(markers) => {
                tracing::debug!(count = markers.len(), "loaded markers");
                self.markers = markers;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(format!("Failed to load markers: {}", e.message));
                Err(e)
            }
        }
    }

    /// The id is assigned by the server, so nothing is shown until it answers.
    pub async fn add(&mut self, lat: f64, lng: f64, name: &str, marker_type: Option<&str>) -> Result<(), ApiFailure> {
        match self.api.create(lat, lng, name, marker_type).await {
            Ok(marker) => {
                self.markers.push(marker);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(format!("Failed to add marker: {}", e.message));
                Err(e)
            }
        }
    }

    pub async fn move_marker(&mut self, id: &str, lat: f64, lng: f64) -> Result<(), ApiFailure> {
        if let Some(marker) = self.markers.iter_mut().find(|m| m.id == id) {
            marker.lat = lat;
            marker.lng = lng;
        }

        let result = self.api.update_position(id, lat, lng).await;
        self.reconcile(result, "Failed to update marker position").await
    }

    pub async fn remove(&mut self, id: &str) -> Result<(), ApiFailure> {
        self.markers.retain(|m| m.id != id);

        let result = self.api.delete(id).await;
        self.reconcile(result, "Failed to delete marker").await
    }

    async fn reconcile(&mut self, result: Result<(), ApiFailure>, context: &str) -> Result<(), ApiFailure> {
        match result {
            Ok(()) => {
                self.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "{context}, reloading markers");
                let banner = format!("{context}: {}", e.message);
                // A failed reload leaves its own banner; the mutation error wins.
                if let Err(reload) = self.refresh().await {
                    tracing::warn!(error = %reload, "reload after failed mutation also failed");
                }
                self.error = Some(banner);
                Err(e)
            }
        }
    }
}
