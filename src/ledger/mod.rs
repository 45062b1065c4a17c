//! Ledger client seam
//!
//! The remote ledger owns durable storage, transaction ordering, expiry and
//! query evaluation. Everything in this crate talks to it through the
//! `LedgerClient` trait, constructed once and passed by reference, so the
//! gateway can run against the JSON-RPC client in production and the
//! in-memory ledger in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

pub mod filter;
pub mod memory;
pub mod rpc;

pub use memory::InMemoryLedger;
pub use rpc::RpcLedgerClient;

/// Opaque entity key assigned by the ledger (`0x`-prefixed hex)
pub type EntityKey = String;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// One key/value tag on an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation<V> {
    pub key: String,
    pub value: V,
}

impl<V> Annotation<V> {
    pub fn new(key: impl Into<String>, value: V) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

pub type StringAnnotation = Annotation<String>;
pub type NumericAnnotation = Annotation<u64>;

/// A create request: payload bytes, lifetime in blocks and tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCreate {
    pub data: Vec<u8>,
    pub btl: u64,
    pub string_annotations: Vec<StringAnnotation>,
    pub numeric_annotations: Vec<NumericAnnotation>,
}

/// A full replace of an existing entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityUpdate {
    pub entity_key: EntityKey,
    pub data: Vec<u8>,
    pub btl: u64,
    pub string_annotations: Vec<StringAnnotation>,
    pub numeric_annotations: Vec<NumericAnnotation>,
}

/// Per-entity outcome of a submitted write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityReceipt {
    pub entity_key: EntityKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_block: Option<u64>,
}

/// A raw query hit. Annotation lists may be empty when the ledger does not
/// return them inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEntity {
    pub entity_key: EntityKey,
    pub storage_value: Vec<u8>,
    pub string_annotations: Vec<StringAnnotation>,
    pub numeric_annotations: Vec<NumericAnnotation>,
}

/// Canonical per-entity metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    #[serde(default)]
    pub expires_at_block: Option<u64>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub string_annotations: Vec<StringAnnotation>,
    #[serde(default)]
    pub numeric_annotations: Vec<NumericAnnotation>,
}

/// Client for the remote key-value ledger
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit creates in one transaction; one receipt per create, in order
    async fn create_entities(&self, creates: Vec<EntityCreate>) -> LedgerResult<Vec<EntityReceipt>>;

    /// Submit full replaces in one transaction
    async fn update_entities(&self, updates: Vec<EntityUpdate>) -> LedgerResult<Vec<EntityReceipt>>;

    async fn delete_entities(&self, keys: Vec<EntityKey>) -> LedgerResult<Vec<EntityReceipt>>;

    /// Evaluate a filter expression in the ledger's query language
    async fn query_entities(&self, filter: &str) -> LedgerResult<Vec<QueryEntity>>;

    async fn entity_metadata(&self, key: &str) -> LedgerResult<EntityMetadata>;

    /// Current chain head
    async fn block_number(&self) -> LedgerResult<u64>;
}
