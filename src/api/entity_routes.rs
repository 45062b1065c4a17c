//! Entity API Routes
//!
//! GET    /api/entities          - query (`collection`, `q`, `limit`, `includeMeta`)
//! POST   /api/entities          - create one
//! POST   /api/entities/batch    - create many under one batch id
//! PATCH  /api/entities/:key     - full replace
//! DELETE /api/entities/:key     - delete

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use super::error::ApiError;
use super::state::AppState;
use crate::gateway::{
    BatchCreateInput, BatchCreated, CreateEntityInput, CreatedEntity, EntityQuery, EntityRow,
    UpdateEntityInput, WriteReceipt, DEFAULT_QUERY_LIMIT, MAX_BATCH_ITEMS,
};

pub fn entity_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/entities", get(list_entities).post(create_entity))
        .route("/api/entities/batch", post(create_batch))
        .route(
            "/api/entities/:key",
            patch(update_entity).delete(delete_entity),
        )
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Query
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityListParams {
    pub collection: Option<String>,
    pub q: Option<String>,
    pub limit: Option<String>,
    pub include_meta: Option<String>,
}

impl EntityListParams {
    pub fn into_query(self) -> Result<EntityQuery, ApiError> {
        let limit = match self.limit.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_QUERY_LIMIT,
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| ApiError::bad_request(format!("Invalid 'limit': {}", raw)))?,
        };
        Ok(EntityQuery {
            collection: self.collection,
            q: self.q,
            limit,
            // only the literal "false" turns metadata off
            include_meta: self.include_meta.as_deref() != Some("false"),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EntityList {
    pub items: Vec<EntityRow>,
}

async fn list_entities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EntityListParams>,
) -> Result<Json<EntityList>, ApiError> {
    let query = params.into_query()?;
    let items = state.gateway.query(&query).await?;
    Ok(Json(EntityList { items }))
}

// ============================================================================
// Create
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateEntityRequest {
    pub collection: Option<String>,
    pub data: Option<JsonValue>,
    pub btl: Option<u64>,
    #[serde(default)]
    pub extra: BTreeMap<String, JsonValue>,
}

async fn create_entity(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateEntityRequest>, JsonRejection>,
) -> Result<Json<CreatedEntity>, ApiError> {
    let req = json_body(payload)?;
    let collection = present(req.collection)
        .ok_or_else(|| ApiError::bad_request("Field 'collection' is required."))?;

    let created = state
        .gateway
        .create(CreateEntityInput {
            collection,
            data: req.data.unwrap_or_else(|| json!({})),
            btl: req.btl,
            extra: req.extra,
        })
        .await?;
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreateRequest {
    pub collection: Option<String>,
    pub items: Option<Vec<JsonValue>>,
    pub btl: Option<u64>,
    #[serde(default)]
    pub extra: BTreeMap<String, JsonValue>,
    pub chunk_size: Option<usize>,
}

async fn create_batch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchCreateRequest>, JsonRejection>,
) -> Result<Json<BatchCreated>, ApiError> {
    let req = json_body(payload)?;
    let collection = present(req.collection)
        .ok_or_else(|| ApiError::bad_request("Field 'collection' is required."))?;
    let items = req
        .items
        .filter(|items| !items.is_empty())
        .ok_or_else(|| ApiError::bad_request("Provide non-empty 'items' array."))?;
    if items.len() > MAX_BATCH_ITEMS {
        return Err(ApiError::bad_request(format!(
            "Max {} items per batch.",
            MAX_BATCH_ITEMS
        )));
    }

    let created = state
        .gateway
        .create_batch(BatchCreateInput {
            collection,
            items,
            btl: req.btl,
            extra: req.extra,
            chunk_size: req.chunk_size,
        })
        .await?;
    Ok(Json(created))
}

// ============================================================================
// Update / delete
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateEntityRequest {
    pub id: Option<String>,
    pub data: Option<JsonValue>,
    pub btl: Option<u64>,
    pub collection: Option<String>,
    pub version: Option<u64>,
}

async fn update_entity(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    payload: Result<Json<UpdateEntityRequest>, JsonRejection>,
) -> Result<Json<WriteReceipt>, ApiError> {
    let req = json_body(payload)?;
    let id = present(req.id).ok_or_else(|| {
        ApiError::bad_request("Field 'id' (annotation) is required to update the entity.")
    })?;

    let receipt = state
        .gateway
        .update(UpdateEntityInput {
            entity_key: key,
            id,
            collection: req.collection,
            version: req.version,
            btl: req.btl,
            data: req.data.unwrap_or_else(|| json!({})),
        })
        .await?;
    Ok(Json(receipt))
}

async fn delete_entity(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<WriteReceipt>, ApiError> {
    let receipt = state.gateway.delete(&key).await?;
    Ok(Json(receipt))
}
