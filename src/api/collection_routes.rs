//! Collection API Routes
//!
//! GET    /api/collections      - list, newest first
//! POST   /api/collections      - create `{name, color?}`
//! DELETE /api/collections/:id  - delete (idempotent)

use std::sync::{Arc, LazyLock};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get},
    Json, Router,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ApiError;
use super::state::AppState;
use crate::database::{Collection, DEFAULT_COLLECTION_COLOR};

pub const MAX_COLLECTION_NAME: usize = 64;

pub fn collection_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/collections", get(list_collections).post(create_collection))
        .route("/api/collections/:id", delete(delete_collection))
}

// ============================================================================
// Validation
// ============================================================================

static HEX_COLOR: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^#([0-9a-fA-F]{6}|[0-9a-fA-F]{3})$"));

/// Trimmed name and color, or the reason they were rejected
pub fn validate_collection(name: &str, color: Option<&str>) -> Result<(String, String), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Collection name is required".to_string());
    }
    if name.chars().count() > MAX_COLLECTION_NAME {
        return Err(format!(
            "Collection name must be at most {} characters",
            MAX_COLLECTION_NAME
        ));
    }
    // the name is embedded in a quoted filter literal, which has no escapes
    if name.contains(['"', '\\']) {
        return Err("Collection name must not contain quotes or backslashes".to_string());
    }
    let color = color.unwrap_or(DEFAULT_COLLECTION_COLOR);
    let hex_color = HEX_COLOR
        .as_ref()
        .map_err(|e| format!("Invalid color pattern: {}", e))?;
    if !hex_color.is_match(color) {
        return Err("Invalid color".to_string());
    }
    Ok((name.to_string(), color.to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionList {
    pub items: Vec<Collection>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCollectionRequest {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

async fn list_collections(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CollectionList>, ApiError> {
    let items = state.collections.list().await?;
    debug!("listing {} collections", items.len());
    Ok(Json(CollectionList { items }))
}

async fn create_collection(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateCollectionRequest>, JsonRejection>,
) -> Result<Json<Collection>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let (name, color) =
        validate_collection(&req.name, req.color.as_deref()).map_err(ApiError::BadRequest)?;

    let created = state
        .collections
        .create(&name, Some(&color))
        .await
        .map_err(ApiError::client)?;
    Ok(Json(created))
}

async fn delete_collection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state
        .collections
        .delete(&id)
        .await
        .map_err(ApiError::client)?;
    Ok(Json(DeleteResponse { ok: true }))
}
