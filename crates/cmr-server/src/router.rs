use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::state::AppState;

/// Build the axum router with all resolver endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handler::health_handler))
        .route("/info", get(handler::info_handler))
        .route("/all-cars", get(handler::list_handler))
        .route("/delete-all", delete(handler::clear_handler).post(handler::clear_handler))
        .route("/add/:wheel/:engine/:build/:wrapping", post(handler::register_handler))
        .route("/:wheel/:engine/:build/:wrapping", get(handler::resolve_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
