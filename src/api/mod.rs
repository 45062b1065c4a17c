//! HTTP surface
//!
//! Thin axum layer over the collection store, entity gateway and dashboard
//! aggregation. Handlers validate input and map errors to status codes;
//! nothing else lives here.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value as JsonValue};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod collection_routes;
pub mod dashboard_routes;
pub mod entity_routes;
pub mod error;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

async fn health() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}

/// Build the full router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(collection_routes::collection_router())
        .merge(entity_routes::entity_router())
        .merge(dashboard_routes::dashboard_router())
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
