//! Entity gateway
//!
//! Marshals Studio operations into ledger calls:
//! - write path: standard tags + caller extras, payload envelope, one create
//! - batch path: the write path for many items, chunked, sharing a `batchId`
//! - read path: collection scope + free-text filter, normalization, optional
//!   per-row metadata
//! - update path: full replace, tags reasserted from scratch
//! - delete path: single delete
//!
//! The filter text is handed to the ledger as-is; its syntax is the ledger's
//! business.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{StudioError, StudioResult};
use crate::ledger::{EntityCreate, EntityKey, EntityReceipt, EntityUpdate, LedgerClient};

pub mod annotations;
pub mod envelope;
pub mod row;

pub use annotations::{resolve_tag, AnnotationSet, TagValue};
pub use envelope::{EnvelopeMeta, PayloadEnvelope};
pub use row::EntityRow;

use annotations::{
    parse_extra_tags, TagList, TAG_APP, TAG_BATCH_ID, TAG_COLLECTION, TAG_ID, TAG_VERSION,
};

/// Value of the `app` tag on everything Studio writes
pub const APP_TAG: &str = "studio";
/// Lifetime in blocks when the caller gives none
pub const DEFAULT_BTL: u64 = 1200;
pub const DEFAULT_QUERY_LIMIT: usize = 100;
pub const MAX_BATCH_ITEMS: usize = 1000;
pub const DEFAULT_BATCH_CHUNK: usize = 100;
/// Approximate block time of the target chain
pub const BLOCK_SECONDS: u64 = 2;

// ============================================================================
// Inputs and results
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct CreateEntityInput {
    pub collection: String,
    pub data: JsonValue,
    pub btl: Option<u64>,
    pub extra: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedEntity {
    pub id: String,
    pub receipt: Vec<EntityReceipt>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchCreateInput {
    pub collection: String,
    pub items: Vec<JsonValue>,
    pub btl: Option<u64>,
    pub extra: BTreeMap<String, JsonValue>,
    pub chunk_size: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCreated {
    pub batch_id: String,
    pub total: usize,
    pub entity_keys: Vec<EntityKey>,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EntityQuery {
    pub collection: Option<String>,
    pub q: Option<String>,
    pub limit: usize,
    pub include_meta: bool,
}

impl Default for EntityQuery {
    fn default() -> Self {
        Self {
            collection: None,
            q: None,
            limit: DEFAULT_QUERY_LIMIT,
            include_meta: true,
        }
    }
}

impl EntityQuery {
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: Some(name.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateEntityInput {
    pub entity_key: EntityKey,
    /// Stable logical id tag
    pub id: String,
    pub collection: Option<String>,
    pub version: Option<u64>,
    pub btl: Option<u64>,
    pub data: JsonValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteReceipt {
    pub receipt: Vec<EntityReceipt>,
}

// ============================================================================
// Filter composition
// ============================================================================

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `collection = "<name>" && <q>`, either part optional; `app = "studio"` when both are absent
pub fn compose_filter(collection: Option<&str>, q: Option<&str>) -> String {
    let mut parts = Vec::with_capacity(2);
    if let Some(collection) = non_blank(collection) {
        parts.push(format!("{} = \"{}\"", TAG_COLLECTION, collection));
    }
    if let Some(q) = non_blank(q) {
        parts.push(q.to_string());
    }
    if parts.is_empty() {
        format!("{} = \"{}\"", TAG_APP, APP_TAG)
    } else {
        parts.join(" && ")
    }
}

fn effective_btl(btl: Option<u64>) -> StudioResult<u64> {
    match btl {
        Some(0) => Err(StudioError::validation("btl must be greater than zero")),
        Some(btl) => Ok(btl),
        None => Ok(DEFAULT_BTL),
    }
}

fn required_text<'a>(value: &'a str, field: &str) -> StudioResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StudioError::validation(format!("Field '{}' is required.", field)));
    }
    Ok(trimmed)
}

// ============================================================================
// Gateway
// ============================================================================

/// Entry point for all entity operations
#[derive(Clone)]
pub struct EntityGateway {
    ledger: Arc<dyn LedgerClient>,
}

impl EntityGateway {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    /// Build the create request for one item. Returns the generated id.
    fn build_create(
        &self,
        collection: &str,
        data: JsonValue,
        btl: u64,
        extras: &[(String, TagValue)],
        batch_id: Option<&str>,
    ) -> StudioResult<(String, EntityCreate)> {
        let id = Uuid::new_v4().to_string();

        let mut tags = TagList::default()
            .text(TAG_COLLECTION, collection)
            .text(TAG_APP, APP_TAG)
            .text(TAG_ID, id.as_str())
            .number(TAG_VERSION, 1);
        if let Some(batch_id) = batch_id {
            tags = tags.text(TAG_BATCH_ID, batch_id);
        }
        for (key, value) in extras {
            tags.push(key, value.clone());
        }

        let envelope = PayloadEnvelope {
            meta: EnvelopeMeta {
                id: id.clone(),
                collection: Some(collection.to_string()),
                version: Some(1),
                app: APP_TAG.to_string(),
            },
            data,
        };

        let create = EntityCreate {
            data: envelope.to_bytes()?,
            btl,
            string_annotations: tags.strings,
            numeric_annotations: tags.numbers,
        };
        Ok((id, create))
    }

    /// Create a single entity
    pub async fn create(&self, input: CreateEntityInput) -> StudioResult<CreatedEntity> {
        let collection = required_text(&input.collection, "collection")?;
        let btl = effective_btl(input.btl)?;
        let extras = parse_extra_tags(&input.extra)?;

        let (id, create) = self.build_create(collection, input.data, btl, &extras, None)?;
        let receipt = self.ledger.create_entities(vec![create]).await?;

        info!(
            "Created entity {} in collection '{}' (btl={})",
            id, collection, btl
        );
        Ok(CreatedEntity { id, receipt })
    }

    /// Create many entities under one `batchId`, submitting `chunk_size` creates per ledger call
    pub async fn create_batch(&self, input: BatchCreateInput) -> StudioResult<BatchCreated> {
        let collection = required_text(&input.collection, "collection")?.to_string();
        if input.items.is_empty() {
            return Err(StudioError::validation("Provide non-empty 'items' array."));
        }
        if input.items.len() > MAX_BATCH_ITEMS {
            return Err(StudioError::validation(format!(
                "Max {} items per batch.",
                MAX_BATCH_ITEMS
            )));
        }
        let btl = effective_btl(input.btl)?;
        let extras = parse_extra_tags(&input.extra)?;
        let chunk_size = input
            .chunk_size
            .unwrap_or(DEFAULT_BATCH_CHUNK)
            .clamp(1, DEFAULT_BATCH_CHUNK);

        let batch_id = Uuid::new_v4().to_string();
        let total = input.items.len();
        let mut ids = Vec::with_capacity(total);
        let mut entity_keys = Vec::with_capacity(total);

        let mut items = input.items.into_iter().peekable();
        while items.peek().is_some() {
            let mut creates = Vec::with_capacity(chunk_size);
            for data in items.by_ref().take(chunk_size) {
                let (id, create) =
                    self.build_create(&collection, data, btl, &extras, Some(&batch_id))?;
                ids.push(id);
                creates.push(create);
            }
            let receipts = self.ledger.create_entities(creates).await?;
            entity_keys.extend(receipts.into_iter().map(|r| r.entity_key));
            debug!("batch {}: {}/{} submitted", batch_id, entity_keys.len(), total);
        }

        info!(
            "Created batch {} with {} entities in collection '{}'",
            batch_id, total, collection
        );
        Ok(BatchCreated {
            batch_id,
            total,
            entity_keys,
            ids,
        })
    }

    /// Query, normalize and optionally enrich rows with per-entity metadata
    pub async fn query(&self, query: &EntityQuery) -> StudioResult<Vec<EntityRow>> {
        let filter = compose_filter(query.collection.as_deref(), query.q.as_deref());
        debug!("entity query: {} (limit {})", filter, query.limit);

        let hits = self.ledger.query_entities(&filter).await?;
        let rows: Vec<EntityRow> = hits
            .into_iter()
            .take(query.limit)
            .map(EntityRow::from_query)
            .collect();

        if !query.include_meta || rows.is_empty() {
            return Ok(rows);
        }

        let metas = join_all(
            rows.iter()
                .map(|row| self.ledger.entity_metadata(&row.entity_key)),
        )
        .await;

        Ok(rows
            .into_iter()
            .zip(metas)
            .map(|(row, meta)| match meta {
                Ok(meta) => row.merge_metadata(meta),
                Err(e) => {
                    warn!("metadata fetch failed for {}: {}", row.entity_key, e);
                    row
                }
            })
            .collect())
    }

    /// Replace an entity's payload, tags and lifetime. Tags not given here are dropped.
    pub async fn update(&self, input: UpdateEntityInput) -> StudioResult<WriteReceipt> {
        let entity_key = required_text(&input.entity_key, "entityKey")?.to_string();
        let id = required_text(&input.id, "id")?.to_string();
        let btl = effective_btl(input.btl)?;
        let collection = non_blank(input.collection.as_deref()).map(str::to_string);

        let mut tags = TagList::default()
            .text(TAG_ID, id.as_str())
            .text(TAG_APP, APP_TAG);
        if let Some(collection) = &collection {
            tags = tags.text(TAG_COLLECTION, collection.as_str());
        }
        if let Some(version) = input.version {
            tags = tags.number(TAG_VERSION, version);
        }

        let envelope = PayloadEnvelope {
            meta: EnvelopeMeta {
                id,
                collection,
                version: input.version,
                app: APP_TAG.to_string(),
            },
            data: input.data,
        };

        let update = EntityUpdate {
            entity_key: entity_key.clone(),
            data: envelope.to_bytes()?,
            btl,
            string_annotations: tags.strings,
            numeric_annotations: tags.numbers,
        };
        let receipt = self.ledger.update_entities(vec![update]).await?;

        info!("Updated entity {}", entity_key);
        Ok(WriteReceipt { receipt })
    }

    pub async fn delete(&self, entity_key: &str) -> StudioResult<WriteReceipt> {
        let entity_key = required_text(entity_key, "entityKey")?;
        let receipt = self
            .ledger
            .delete_entities(vec![entity_key.to_string()])
            .await?;

        info!("Deleted entity {}", entity_key);
        Ok(WriteReceipt { receipt })
    }

    /// Current chain head
    pub async fn head_block(&self) -> StudioResult<u64> {
        Ok(self.ledger.block_number().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_defaults_to_app_scope() {
        assert_eq!(compose_filter(None, None), r#"app = "studio""#);
        assert_eq!(compose_filter(Some(" "), Some("")), r#"app = "studio""#);
    }

    #[test]
    fn filter_conjoins_collection_and_expression() {
        assert_eq!(
            compose_filter(Some("notes"), None),
            r#"collection = "notes""#
        );
        assert_eq!(compose_filter(None, Some("version >= 2")), "version >= 2");
        assert_eq!(
            compose_filter(Some("notes"), Some(r#"app = "studio""#)),
            r#"collection = "notes" && app = "studio""#
        );
    }

    #[test]
    fn btl_defaults_and_rejects_zero() {
        assert_eq!(effective_btl(None).unwrap(), DEFAULT_BTL);
        assert_eq!(effective_btl(Some(30)).unwrap(), 30);
        assert!(effective_btl(Some(0)).unwrap_err().is_client_error());
    }
}
