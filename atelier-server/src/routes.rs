use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{api, artifacts, ui};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::index))
        .route("/generate", post(ui::generate))
        .route("/artifacts/{file_name}", get(artifacts::get_artifact))
        .route("/v1/images/generations", post(api::generate_images))
        .route("/health", get(api::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
