use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod conversations;
pub mod recommendations;
pub mod titles;

use crate::middleware::request_id;
use crate::state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(request_id::make_span_with_request_id))
        .layer(middleware::from_fn(request_id::request_id_middleware))
}

/// API routes under /api/v1
fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/conversations", post(conversations::start))
        .route("/conversations/:id", get(conversations::get))
        .route(
            "/conversations/:id/messages",
            post(conversations::continue_conversation),
        )
        .route("/conversations/:id/exclusions", post(conversations::exclude))
        .route("/conversations/:id/likes", post(conversations::like))
        .route("/recommendations", post(recommendations::recommend))
        .route("/titles/:kind/:id", get(titles::details))
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
