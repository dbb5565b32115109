use std::sync::Arc;

use axum::{Json, response::IntoResponse};
use tracing::info;

use crate::api::HealthResponse;
use crate::config::{App, ListFailure};
use crate::db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub list_failure: ListFailure,
}

impl AppState {
    pub fn new(db: Arc<Database>, cfg: &App) -> Self {
        AppState {
            db,
            list_failure: cfg.list_failure,
        }
    }
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(HealthResponse { status: "ok".to_owned() })
}
