//! HTTP handlers for `/markers`

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use super::store::MarkerStore;
use super::validate::{self, ValidationError};
use crate::api::{Ack, ErrorBody};
use crate::config::ListFailure;
use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::handler::AppState;
use crate::model::{Marker, NewMarker};

const LIST: &str = "GET /markers";
const CREATE: &str = "POST /markers";
const UPDATE: &str = "PATCH /markers/:id";
const DELETE: &str = "DELETE /markers/:id";

fn invalid(endpoint: &str, err: ValidationError) -> Response {
    tracing::warn!(endpoint, received = %err.received, "validation error: {}", err.message);
    ErrorBody::new(err.message, endpoint, err.message)
        .with_received(err.received)
        .into_response(StatusCode::BAD_REQUEST)
}

fn unreadable(endpoint: &str, rejection: JsonRejection) -> Response {
    tracing::warn!(endpoint, "rejected request body: {}", rejection.body_text());
    // The body never decoded, so there are no field values to echo back.
    ErrorBody::new("Invalid request body", endpoint, rejection.body_text())
        .with_received(Value::Null)
        .into_response(StatusCode::BAD_REQUEST)
}

fn store_failure(error: &str, endpoint: &str, err: StoreError) -> Response {
    if err.is_not_found() {
        tracing::warn!(endpoint, "{}", err);
        return ErrorBody::from_error("Marker not found", endpoint, &err).into_response(StatusCode::NOT_FOUND);
    }
    tracing::error!(endpoint, error = %crate::unpack_error(&err), "{}", error);
    ErrorBody::from_error(error, endpoint, &err).into_response(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn fetch_all(db: &Database) -> StoreResult<Vec<Marker>> {
    MarkerStore::new(db.connection().await?).list().await
}

async fn insert(db: &Database, input: NewMarker) -> StoreResult<Marker> {
    MarkerStore::new(db.connection().await?).create(input).await
}

async fn move_to(db: &Database, id: &str, lat: f64, lng: f64) -> StoreResult<()> {
    MarkerStore::new(db.connection().await?)
        .update_position(id, lat, lng)
        .await
}

async fn remove(db: &Database, id: &str) -> StoreResult<()> {
    MarkerStore::new(db.connection().await?).delete(id).await
}

pub async fn list_markers(State(state): State<AppState>) -> Response {
    match fetch_all(&state.db).await {
        Ok(markers) => (StatusCode::OK, Json(markers)).into_response(),
        Err(e) if state.list_failure == ListFailure::Empty => {
            tracing::error!(endpoint = LIST, error = %crate::unpack_error(&e), "read failed, answering empty list");
            (StatusCode::OK, Json(Vec::<Marker>::new())).into_response()
        }
        Err(e) => store_failure("Failed to fetch markers", LIST, e),
    }
}

pub async fn create_marker(State(state): State<AppState>, payload: Result<Json<Value>, JsonRejection>) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return unreadable(CREATE, rejection),
    };
    let input = match validate::new_marker(&body) {
        Ok(input) => input,
        Err(e) => return invalid(CREATE, e),
    };

    match insert(&state.db, input).await {
        Ok(marker) => (StatusCode::CREATED, Json(marker)).into_response(),
        Err(e) => store_failure("Failed to add marker", CREATE, e),
    }
}

pub async fn update_marker_position(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return unreadable(UPDATE, rejection),
    };
    let (lat, lng) = match validate::position(&body) {
        Ok(coords) => coords,
        Err(e) => return invalid(UPDATE, e),
    };

    match move_to(&state.db, &id, lat, lng).await {
        Ok(()) => (StatusCode::OK, Json(Ack::ok())).into_response(),
        Err(e) => store_failure("Failed to update marker", UPDATE, e),
    }
}

pub async fn delete_marker(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match remove(&state.db, &id).await {
        Ok(()) => (StatusCode::OK, Json(Ack::ok())).into_response(),
        Err(e) => store_failure("Failed to delete marker", DELETE, e),
    }
}
