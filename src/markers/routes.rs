use axum::{
    Router,
    routing::{get, patch},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::list_markers).post(handler::create_marker))
        .route(
            "/:id",
            patch(handler::update_marker_position).delete(handler::delete_marker),
        )
}
