//! Dashboard and chain routes
//!
//! GET /api/dashboard  - sample-based summary
//! GET /api/chain      - current head block and block time

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::state::AppState;
use crate::analytics::{dashboard_summary, DashboardSummary};
use crate::gateway::BLOCK_SECONDS;

pub fn dashboard_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/chain", get(get_chain))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainInfo {
    pub current_block: u64,
    pub block_seconds: u64,
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let summary = dashboard_summary(&state.collections, &state.gateway).await?;
    Ok(Json(summary))
}

async fn get_chain(State(state): State<Arc<AppState>>) -> Result<Json<ChainInfo>, ApiError> {
    let current_block = state.gateway.head_block().await?;
    Ok(Json(ChainInfo {
        current_block,
        block_seconds: BLOCK_SECONDS,
    }))
}
