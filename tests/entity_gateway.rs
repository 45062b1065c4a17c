//! Entity gateway behavior against the in-memory ledger.

use std::collections::BTreeMap;
use std::sync::Arc;

use golem_studio::gateway::{
    BatchCreateInput, CreateEntityInput, EntityGateway, EntityQuery, UpdateEntityInput,
    DEFAULT_BTL,
};
use golem_studio::ledger::{InMemoryLedger, LedgerClient};
use golem_studio::{LedgerError, StudioError};
use serde_json::{json, Value as JsonValue};

fn gateway_with(ledger: InMemoryLedger) -> (Arc<InMemoryLedger>, EntityGateway) {
    let ledger = Arc::new(ledger);
    let gateway = EntityGateway::new(ledger.clone() as Arc<dyn LedgerClient>);
    (ledger, gateway)
}

fn note(data: JsonValue) -> CreateEntityInput {
    CreateEntityInput {
        collection: "notes".to_string(),
        data,
        ..CreateEntityInput::default()
    }
}

async fn create_key(gateway: &EntityGateway, input: CreateEntityInput) -> String {
    let created = gateway.create(input).await.unwrap();
    assert_eq!(created.receipt.len(), 1);
    created.receipt[0].entity_key.clone()
}

#[tokio::test]
async fn created_note_round_trips_through_query() {
    let (_ledger, gateway) = gateway_with(InMemoryLedger::new());

    let created = gateway.create(note(json!({"title": "x"}))).await.unwrap();
    assert!(!created.id.is_empty());

    let rows = gateway.query(&EntityQuery::collection("notes")).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.value["data"], json!({"title": "x"}));
    assert_eq!(row.value["meta"]["id"], json!(created.id));
    assert_eq!(row.annotations.string("collection"), Some("notes"));
    assert_eq!(row.annotations.string("app"), Some("studio"));
    assert_eq!(row.annotations.string("id"), Some(created.id.as_str()));
    assert_eq!(row.annotations.number("version"), Some(1));
    assert_eq!(row.expires_at_block, Some(1 + DEFAULT_BTL));
}

#[tokio::test]
async fn default_filter_scopes_to_studio_entities() {
    let (_ledger, gateway) = gateway_with(InMemoryLedger::new());
    create_key(&gateway, note(json!({}))).await;
    create_key(
        &gateway,
        CreateEntityInput {
            collection: "tickets".into(),
            ..CreateEntityInput::default()
        },
    )
    .await;

    let all = gateway.query(&EntityQuery::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let limited = gateway
        .query(&EntityQuery {
            limit: 1,
            ..EntityQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn extra_tags_are_queryable() {
    let (_ledger, gateway) = gateway_with(InMemoryLedger::new());
    let mut extra = BTreeMap::new();
    extra.insert("priority".to_string(), json!(3));
    extra.insert("owner".to_string(), json!("ada"));
    create_key(
        &gateway,
        CreateEntityInput {
            extra,
            ..note(json!({"title": "urgent"}))
        },
    )
    .await;
    create_key(&gateway, note(json!({"title": "calm"}))).await;

    let rows = gateway
        .query(&EntityQuery {
            q: Some("priority >= 2".into()),
            ..EntityQuery::collection("notes")
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].annotations.number("priority"), Some(3));
    assert_eq!(rows[0].annotations.string("owner"), Some("ada"));
}

#[tokio::test]
async fn reserved_extra_tag_is_a_validation_error() {
    let (ledger, gateway) = gateway_with(InMemoryLedger::new());
    let mut extra = BTreeMap::new();
    extra.insert("collection".to_string(), json!("other"));

    let err = gateway
        .create(CreateEntityInput {
            extra,
            ..note(json!({}))
        })
        .await
        .unwrap_err();
    assert!(err.is_client_error());
    assert!(ledger.is_empty().await);
}

#[tokio::test]
async fn update_replaces_the_whole_annotation_set() {
    let (_ledger, gateway) = gateway_with(InMemoryLedger::new());
    let mut extra = BTreeMap::new();
    extra.insert("priority".to_string(), json!(5));
    extra.insert("owner".to_string(), json!("grace"));
    let created = gateway
        .create(CreateEntityInput {
            extra,
            ..note(json!({"title": "before"}))
        })
        .await
        .unwrap();
    let key = created.receipt[0].entity_key.clone();

    let updated = gateway
        .update(UpdateEntityInput {
            entity_key: key.clone(),
            id: created.id.clone(),
            collection: Some("notes".into()),
            version: Some(2),
            btl: Some(50),
            data: json!({"title": "after"}),
        })
        .await
        .unwrap();
    assert_eq!(updated.receipt[0].entity_key, key);

    let rows = gateway.query(&EntityQuery::collection("notes")).await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.value["data"]["title"], "after");
    assert_eq!(row.annotations.number("version"), Some(2));
    assert_eq!(row.annotations.number("priority"), None);
    assert_eq!(row.annotations.string("owner"), None);
    assert_eq!(row.expires_at_block, Some(1 + 50));
}

#[tokio::test]
async fn update_without_collection_drops_the_tag() {
    let (_ledger, gateway) = gateway_with(InMemoryLedger::new());
    let created = gateway.create(note(json!({}))).await.unwrap();

    gateway
        .update(UpdateEntityInput {
            entity_key: created.receipt[0].entity_key.clone(),
            id: created.id,
            data: json!({"moved": true}),
            ..UpdateEntityInput::default()
        })
        .await
        .unwrap();

    assert!(gateway
        .query(&EntityQuery::collection("notes"))
        .await
        .unwrap()
        .is_empty());
    let rows = gateway.query(&EntityQuery::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].annotations.string("collection"), None);
    assert!(rows[0].value["meta"].get("collection").is_none());
}

#[tokio::test]
async fn metadata_failure_degrades_only_that_row() {
    let (ledger, gateway) = gateway_with(InMemoryLedger::new());
    let broken = create_key(&gateway, note(json!({"n": 1}))).await;
    let healthy = create_key(&gateway, note(json!({"n": 2}))).await;
    ledger.fail_metadata_for(&broken).await;

    let rows = gateway.query(&EntityQuery::collection("notes")).await.unwrap();
    assert_eq!(rows.len(), 2);
    let by_key = |key: &str| rows.iter().find(|r| r.entity_key == key).unwrap();
    assert_eq!(by_key(&broken).expires_at_block, None);
    assert_eq!(by_key(&broken).annotations.string("collection"), Some("notes"));
    assert_eq!(by_key(&healthy).expires_at_block, Some(1 + DEFAULT_BTL));
}

#[tokio::test]
async fn bare_hits_fall_back_to_the_envelope() {
    let (_ledger, gateway) = gateway_with(InMemoryLedger::new().without_inline_annotations());
    create_key(&gateway, note(json!({"title": "x"}))).await;

    let bare = gateway
        .query(&EntityQuery {
            include_meta: false,
            ..EntityQuery::collection("notes")
        })
        .await
        .unwrap();
    assert_eq!(bare.len(), 1);
    assert_eq!(bare[0].annotations.string("collection"), Some("notes"));
    assert_eq!(bare[0].annotations.number("version"), Some(1));
    assert_eq!(bare[0].annotations.string("app"), None);
    assert_eq!(bare[0].expires_at_block, None);

    let enriched = gateway.query(&EntityQuery::collection("notes")).await.unwrap();
    assert_eq!(enriched[0].annotations.string("app"), Some("studio"));
    assert!(enriched[0].expires_at_block.is_some());
}

#[tokio::test]
async fn delete_and_expiry_remove_entities() {
    let (ledger, gateway) = gateway_with(InMemoryLedger::new());
    let doomed = create_key(&gateway, note(json!({}))).await;
    create_key(
        &gateway,
        CreateEntityInput {
            btl: Some(10),
            ..note(json!({}))
        },
    )
    .await;

    let deleted = gateway.delete(&doomed).await.unwrap();
    assert_eq!(deleted.receipt[0].entity_key, doomed);
    assert_eq!(ledger.len().await, 1);

    ledger.advance_blocks(10).await;
    assert!(gateway
        .query(&EntityQuery::collection("notes"))
        .await
        .unwrap()
        .is_empty());

    let err = gateway.delete(&doomed).await.unwrap_err();
    assert!(matches!(
        err,
        StudioError::Ledger(LedgerError::EntityNotFound(_))
    ));
}

#[tokio::test]
async fn zero_btl_and_blank_collection_are_rejected() {
    let (_ledger, gateway) = gateway_with(InMemoryLedger::new());
    let zero = gateway
        .create(CreateEntityInput {
            btl: Some(0),
            ..note(json!({}))
        })
        .await
        .unwrap_err();
    assert!(zero.is_client_error());

    let blank = gateway
        .create(CreateEntityInput {
            collection: "  ".into(),
            ..CreateEntityInput::default()
        })
        .await
        .unwrap_err();
    assert!(blank.is_client_error());
}

#[tokio::test]
async fn malformed_filter_is_passed_through_and_fails() {
    let (_ledger, gateway) = gateway_with(InMemoryLedger::new());
    let err = gateway
        .query(&EntityQuery {
            q: Some("collection ==".into()),
            ..EntityQuery::default()
        })
        .await
        .unwrap_err();
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn batch_tags_every_item_with_one_batch_id() {
    let (ledger, gateway) = gateway_with(InMemoryLedger::new());
    let items: Vec<JsonValue> = (0..5).map(|i| json!({"n": i})).collect();

    let batch = gateway
        .create_batch(BatchCreateInput {
            collection: "events".into(),
            items,
            btl: Some(100),
            chunk_size: Some(2),
            ..BatchCreateInput::default()
        })
        .await
        .unwrap();
    assert_eq!(batch.total, 5);
    assert_eq!(batch.entity_keys.len(), 5);
    assert_eq!(batch.ids.len(), 5);
    assert_eq!(ledger.len().await, 5);

    let rows = gateway
        .query(&EntityQuery {
            q: Some(format!("batchId = \"{}\"", batch.batch_id)),
            ..EntityQuery::collection("events")
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 5);
    let keys: Vec<&str> = rows.iter().map(|r| r.entity_key.as_str()).collect();
    let expected: Vec<&str> = batch.entity_keys.iter().map(String::as_str).collect();
    assert_eq!(keys, expected);
}

#[tokio::test]
async fn batch_bounds_are_enforced() {
    let (_ledger, gateway) = gateway_with(InMemoryLedger::new());
    let empty = gateway
        .create_batch(BatchCreateInput {
            collection: "events".into(),
            ..BatchCreateInput::default()
        })
        .await
        .unwrap_err();
    assert!(empty.is_client_error());

    let too_many = gateway
        .create_batch(BatchCreateInput {
            collection: "events".into(),
            items: vec![json!({}); 1001],
            ..BatchCreateInput::default()
        })
        .await
        .unwrap_err();
    assert!(too_many.is_client_error());
}

#[tokio::test]
async fn head_block_reports_ledger_height() {
    let (ledger, gateway) = gateway_with(InMemoryLedger::with_head(42));
    assert_eq!(gateway.head_block().await.unwrap(), 42);
    ledger.advance_blocks(8).await;
    assert_eq!(gateway.head_block().await.unwrap(), ledger.head().await);
    ledger.set_head_available(false);
    assert!(gateway.head_block().await.is_err());
}
