// HTTP API: status stream, ingestion and the diagram page

mod index;
mod ingestion;
mod stream;

pub use index::LIVE_VIEW_JS;

use crate::state::StatusBoard;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub board: Arc<StatusBoard>,
    /// Period between snapshot writes on each open status stream
    pub emit_interval: Duration,
    /// Rendered diagram shown on the index page
    pub diagram_svg: Option<String>,
}

/// Create API router with all bt-live endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index::index_page))
        .route("/msg", get(stream::status_stream))
        .route("/api/entities", get(index::list_entities))
        .route("/api/log", post(ingestion::ingest_log))
        .route("/api/snapshot", post(ingestion::ingest_snapshot))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Application error types
enum AppError {
    ValidationError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
