//! HTTP surface: status endpoints, the REST API, and the bundled web UI.

pub mod api;
pub mod status;

use std::sync::Arc;

use axum::response::Html;
use axum::routing::get;
use axum::Router;

use crate::cors::cors_layer;

pub use api::{api_routes, ApiError, ApiInfo, BatchResponse};
pub use status::{status_routes, ActivityKind, ActivityRecord, AppState, StatusResponse};

const UI_PAGE: &str = include_str!("ui.html");

/// Single-page UI calling the REST API
pub async fn ui_handler() -> Html<&'static str> {
    Html(UI_PAGE)
}

/// Full application router with localhost-only CORS
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(ui_handler))
        .merge(status_routes())
        .merge(api_routes())
        .layer(cors_layer())
        .with_state(state)
}
