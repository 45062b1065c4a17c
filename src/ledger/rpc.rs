//! JSON-RPC ledger client
//!
//! Talks JSON-RPC 2.0 over HTTP to the ledger node. Reads use the node's
//! query and metadata methods; writes are submitted as a single storage
//! transaction to the endpoint, which signs on behalf of the configured
//! account. One `reqwest::Client` is reused for the life of the process.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::{
    EntityCreate, EntityKey, EntityMetadata, EntityReceipt, EntityUpdate, LedgerClient,
    LedgerResult, NumericAnnotation, QueryEntity, StringAnnotation,
};
use crate::config::LedgerConfig;
use crate::error::LedgerError;

const METHOD_QUERY: &str = "golembase_queryEntities";
const METHOD_METADATA: &str = "golembase_getEntityMetaData";
const METHOD_SEND_TX: &str = "golembase_sendStorageTransaction";
const METHOD_BLOCK_NUMBER: &str = "eth_blockNumber";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct RpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireCreate<'a> {
    data: String,
    btl: u64,
    string_annotations: &'a [StringAnnotation],
    numeric_annotations: &'a [NumericAnnotation],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireUpdate<'a> {
    entity_key: &'a str,
    data: String,
    btl: u64,
    string_annotations: &'a [StringAnnotation],
    numeric_annotations: &'a [NumericAnnotation],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StorageTransaction<'a> {
    chain_id: u64,
    creates: Vec<WireCreate<'a>>,
    updates: Vec<WireUpdate<'a>>,
    deletes: &'a [EntityKey],
}

#[derive(Debug, Default, Deserialize)]
struct StorageTransactionReceipt {
    #[serde(default)]
    creates: Vec<EntityReceipt>,
    #[serde(default)]
    updates: Vec<EntityReceipt>,
    #[serde(default)]
    deletes: Vec<EntityReceipt>,
}

#[derive(Debug, Deserialize)]
struct WireQueryHit {
    key: EntityKey,
    #[serde(default)]
    value: String,
}

impl StorageTransaction<'_> {
    fn empty(chain_id: u64) -> Self {
        Self {
            chain_id,
            creates: Vec::new(),
            updates: Vec::new(),
            deletes: &[],
        }
    }
}

fn wire_create(create: &EntityCreate) -> WireCreate<'_> {
    WireCreate {
        data: STANDARD.encode(&create.data),
        btl: create.btl,
        string_annotations: &create.string_annotations,
        numeric_annotations: &create.numeric_annotations,
    }
}

fn wire_update(update: &EntityUpdate) -> WireUpdate<'_> {
    WireUpdate {
        entity_key: &update.entity_key,
        data: STANDARD.encode(&update.data),
        btl: update.btl,
        string_annotations: &update.string_annotations,
        numeric_annotations: &update.numeric_annotations,
    }
}

fn decode_hit(hit: WireQueryHit) -> LedgerResult<QueryEntity> {
    let storage_value = STANDARD
        .decode(hit.value.as_bytes())
        .map_err(|e| LedgerError::Decode(format!("payload of {}: {}", hit.key, e)))?;
    Ok(QueryEntity {
        entity_key: hit.key,
        storage_value,
        string_annotations: Vec::new(),
        numeric_annotations: Vec::new(),
    })
}

/// Parse an Ethereum-style hex quantity such as `"0x1a2b"`
fn parse_hex_quantity(raw: &str) -> LedgerResult<u64> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| LedgerError::Decode(format!("not a hex quantity: {}", raw)))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::Decode(format!("bad hex quantity {}: {}", raw, e)))
}

fn expect_receipts(
    method: &str,
    receipts: Vec<EntityReceipt>,
    expected: usize,
) -> LedgerResult<Vec<EntityReceipt>> {
    if receipts.len() != expected {
        return Err(LedgerError::Decode(format!(
            "{} returned {} receipts for {} operations",
            method,
            receipts.len(),
            expected
        )));
    }
    Ok(receipts)
}

// ============================================================================
// Client
// ============================================================================

/// JSON-RPC implementation of `LedgerClient`
pub struct RpcLedgerClient {
    http: Client,
    rpc_url: Url,
    chain_id: u64,
    next_id: AtomicU64,
}

impl RpcLedgerClient {
    pub fn new(config: &LedgerConfig) -> LedgerResult<Self> {
        let http = Client::builder().timeout(config.request_timeout).build()?;

        info!(
            chain_id = config.chain_id,
            rpc = %config.rpc_url,
            ws = %config.ws_url,
            account = %config.private_key.fingerprint(),
            "Ledger client ready"
        );

        Ok(Self {
            http,
            rpc_url: config.rpc_url.clone(),
            chain_id: config.chain_id,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call_optional<P, R>(&self, method: &str, params: P) -> LedgerResult<Option<R>>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        debug!(id, method, "ledger rpc call");

        let envelope: RpcResponse<R> = self
            .http
            .post(self.rpc_url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = envelope.error {
            return Err(LedgerError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(envelope.result)
    }

    async fn call<P, R>(&self, method: &str, params: P) -> LedgerResult<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| LedgerError::Decode(format!("{} returned no result", method)))
    }

    async fn send_transaction(
        &self,
        tx: StorageTransaction<'_>,
    ) -> LedgerResult<StorageTransactionReceipt> {
        self.call(METHOD_SEND_TX, [tx]).await
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn create_entities(&self, creates: Vec<EntityCreate>) -> LedgerResult<Vec<EntityReceipt>> {
        let tx = StorageTransaction {
            creates: creates.iter().map(wire_create).collect(),
            ..StorageTransaction::empty(self.chain_id)
        };
        let receipt = self.send_transaction(tx).await?;
        expect_receipts(METHOD_SEND_TX, receipt.creates, creates.len())
    }

    async fn update_entities(&self, updates: Vec<EntityUpdate>) -> LedgerResult<Vec<EntityReceipt>> {
        let tx = StorageTransaction {
            updates: updates.iter().map(wire_update).collect(),
            ..StorageTransaction::empty(self.chain_id)
        };
        let receipt = self.send_transaction(tx).await?;
        expect_receipts(METHOD_SEND_TX, receipt.updates, updates.len())
    }

    async fn delete_entities(&self, keys: Vec<EntityKey>) -> LedgerResult<Vec<EntityReceipt>> {
        let tx = StorageTransaction {
            deletes: &keys,
            ..StorageTransaction::empty(self.chain_id)
        };
        let receipt = self.send_transaction(tx).await?;
        if receipt.deletes.is_empty() {
            // some nodes acknowledge deletes without per-key receipts
            return Ok(keys
                .iter()
                .map(|k| EntityReceipt {
                    entity_key: k.clone(),
                    expiration_block: None,
                })
                .collect());
        }
        expect_receipts(METHOD_SEND_TX, receipt.deletes, keys.len())
    }

    async fn query_entities(&self, filter: &str) -> LedgerResult<Vec<QueryEntity>> {
        let hits: Option<Vec<WireQueryHit>> = self.call_optional(METHOD_QUERY, [filter]).await?;
        hits.unwrap_or_default().into_iter().map(decode_hit).collect()
    }

    async fn entity_metadata(&self, key: &str) -> LedgerResult<EntityMetadata> {
        self.call_optional(METHOD_METADATA, [key])
            .await?
            .ok_or_else(|| LedgerError::EntityNotFound(key.to_string()))
    }

    async fn block_number(&self) -> LedgerResult<u64> {
        let raw: String = self.call(METHOD_BLOCK_NUMBER, [(); 0]).await?;
        parse_hex_quantity(&raw)
    }
}
