//! Dashboard aggregation
//!
//! Re-runs the gateway read path once per known collection and folds the
//! samples into counts, a recent-items list and an expiring-soon figure.
//! Counts are capped samples, never exact totals; `capped` / `approximate`
//! say so explicitly.

use std::collections::HashSet;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::database::{Collection, CollectionRepository};
use crate::error::{StudioError, StudioResult};
use crate::gateway::{EntityGateway, EntityQuery, EntityRow, APP_TAG};
use crate::ledger::EntityKey;

/// Sample cap for each collection's query
pub const PER_COLLECTION_LIMIT: usize = 200;
pub const RECENT_PER_COLLECTION: usize = 5;
pub const RECENT_LIMIT: usize = 30;
/// Entities expiring within this many blocks of the head count as "soon"
pub const EXPIRING_SOON_BLOCKS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub head_block: u64,
    pub sample_limit: usize,
    pub totals: DashboardTotals,
    pub by_collection: Vec<CollectionCount>,
    pub recent: Vec<RecentEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTotals {
    pub total_entities: usize,
    pub total_collections: usize,
    pub expiring_soon: usize,
    /// True when any per-collection count hit the sample cap
    pub approximate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCount {
    pub name: String,
    pub color: String,
    pub count: usize,
    /// The real count is at least `count`
    pub capped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentEntity {
    pub entity_key: EntityKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    pub value: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_block: Option<u64>,
}

impl From<&EntityRow> for RecentEntity {
    fn from(row: &EntityRow) -> Self {
        Self {
            entity_key: row.entity_key.clone(),
            collection: row.collection(),
            version: row.version(),
            value: row.value.clone(),
            expires_at_block: row.expires_at_block,
        }
    }
}

/// Whether an entity counts as expiring soon. Nothing does without a head block.
pub fn is_expiring_soon(expires_at_block: Option<u64>, head_block: u64) -> bool {
    if head_block == 0 {
        return false;
    }
    match expires_at_block {
        Some(expires) => expires.saturating_sub(head_block) <= EXPIRING_SOON_BLOCKS,
        None => false,
    }
}

/// Fold per-collection samples into a summary. `samples` pairs each collection
/// with its rows, in store order.
pub fn summarize(head_block: u64, samples: &[(Collection, Vec<EntityRow>)]) -> DashboardSummary {
    let mut by_collection: Vec<CollectionCount> = samples
        .iter()
        .map(|(collection, rows)| CollectionCount {
            name: collection.name.clone(),
            color: collection.color.clone(),
            count: rows.len(),
            capped: rows.len() >= PER_COLLECTION_LIMIT,
        })
        .collect();
    // sort_by is stable: ties keep store order
    by_collection.sort_by(|a, b| b.count.cmp(&a.count));

    let mut seen: HashSet<&str> = HashSet::new();
    let recent: Vec<RecentEntity> = samples
        .iter()
        .flat_map(|(_, rows)| rows.iter().take(RECENT_PER_COLLECTION))
        .filter(|row| seen.insert(row.entity_key.as_str()))
        .take(RECENT_LIMIT)
        .map(RecentEntity::from)
        .collect();

    let expiring_soon = recent
        .iter()
        .filter(|r| is_expiring_soon(r.expires_at_block, head_block))
        .count();

    DashboardSummary {
        head_block,
        sample_limit: PER_COLLECTION_LIMIT,
        totals: DashboardTotals {
            total_entities: by_collection.iter().map(|c| c.count).sum(),
            total_collections: samples.len(),
            expiring_soon,
            approximate: by_collection.iter().any(|c| c.capped),
        },
        by_collection,
        recent,
    }
}

/// Build the dashboard summary. The head block fails open to 0; any
/// collection query failure aborts the whole summary.
pub async fn dashboard_summary(
    collections: &CollectionRepository,
    gateway: &EntityGateway,
) -> StudioResult<DashboardSummary> {
    let head_block = match gateway.head_block().await {
        Ok(head) => head,
        Err(e) => {
            warn!("head block unavailable, expiring-soon disabled: {}", e);
            0
        }
    };

    let known = collections.list().await?;
    debug!(
        "dashboard: sampling {} collections at head {}",
        known.len(),
        head_block
    );

    let app_filter = format!("app = \"{}\"", APP_TAG);
    let samples = try_join_all(known.into_iter().map(|collection| {
        let query = EntityQuery {
            collection: Some(collection.name.clone()),
            q: Some(app_filter.clone()),
            limit: PER_COLLECTION_LIMIT,
            include_meta: true,
        };
        async move {
            let rows = gateway.query(&query).await?;
            Ok::<_, StudioError>((collection, rows))
        }
    }))
    .await?;

    Ok(summarize(head_block, &samples))
}
