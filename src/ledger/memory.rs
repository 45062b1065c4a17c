//! In-process ledger
//!
//! A complete `LedgerClient` that keeps entities in memory. Block height only
//! moves when the caller advances it, so expiry is deterministic. Used by the
//! integration tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use super::filter::Filter;
use super::{
    EntityCreate, EntityKey, EntityMetadata, EntityReceipt, EntityUpdate, LedgerClient,
    LedgerResult, NumericAnnotation, QueryEntity, StringAnnotation,
};
use crate::error::LedgerError;

#[derive(Debug, Clone)]
struct StoredEntity {
    key: EntityKey,
    data: Vec<u8>,
    expires_at_block: u64,
    string_annotations: Vec<StringAnnotation>,
    numeric_annotations: Vec<NumericAnnotation>,
}

#[derive(Debug, Default)]
struct LedgerState {
    head: u64,
    next_seq: u64,
    /// Insertion order is query order
    entities: Vec<StoredEntity>,
}

impl LedgerState {
    fn live(&self) -> impl Iterator<Item = &StoredEntity> {
        let head = self.head;
        self.entities.iter().filter(move |e| e.expires_at_block > head)
    }

    fn live_position(&self, key: &str) -> Option<usize> {
        let head = self.head;
        self.entities
            .iter()
            .position(|e| e.key == key && e.expires_at_block > head)
    }

    fn mint_key(&mut self) -> EntityKey {
        self.next_seq += 1;
        let mut hasher = Sha256::new();
        hasher.update(b"studio-memory-ledger");
        hasher.update(self.next_seq.to_be_bytes());
        format!("0x{}", hex::encode(hasher.finalize()))
    }
}

/// In-memory ledger with manual block height
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
    inline_annotations: bool,
    head_available: AtomicBool,
    failing_metadata: RwLock<HashSet<EntityKey>>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    /// Ledger at block 1 that returns annotations inline with query hits
    pub fn new() -> Self {
        Self::with_head(1)
    }

    pub fn with_head(head: u64) -> Self {
        Self {
            state: RwLock::new(LedgerState {
                head,
                ..LedgerState::default()
            }),
            inline_annotations: true,
            head_available: AtomicBool::new(true),
            failing_metadata: RwLock::new(HashSet::new()),
        }
    }

    /// Return bare `{key, value}` query hits, as the JSON-RPC endpoint does
    pub fn without_inline_annotations(mut self) -> Self {
        self.inline_annotations = false;
        self
    }

    pub async fn head(&self) -> u64 {
        self.state.read().await.head
    }

    pub async fn advance_blocks(&self, blocks: u64) {
        let mut state = self.state.write().await;
        state.head = state.head.saturating_add(blocks);
        let head = state.head;
        state.entities.retain(|e| e.expires_at_block > head);
    }

    /// Make `block_number` fail (or succeed again)
    pub fn set_head_available(&self, available: bool) {
        self.head_available.store(available, Ordering::SeqCst);
    }

    /// Make metadata lookups for `key` fail
    pub async fn fail_metadata_for(&self, key: &str) {
        self.failing_metadata.write().await.insert(key.to_string());
    }

    /// Number of live entities
    pub async fn len(&self) -> usize {
        self.state.read().await.live().count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn invalid_params(message: impl Into<String>) -> LedgerError {
    LedgerError::Rpc {
        code: -32602,
        message: message.into(),
    }
}

/// Block at which an entity written at `head` with `btl` expires
fn expiry_block(head: u64, btl: u64) -> LedgerResult<u64> {
    if btl == 0 {
        return Err(invalid_params("btl must be greater than zero"));
    }
    head.checked_add(btl)
        .ok_or_else(|| invalid_params(format!("btl {} overflows the block height", btl)))
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn create_entities(&self, creates: Vec<EntityCreate>) -> LedgerResult<Vec<EntityReceipt>> {
        let mut state = self.state.write().await;
        let head = state.head;
        let expiries = creates
            .iter()
            .map(|create| expiry_block(head, create.btl))
            .collect::<LedgerResult<Vec<u64>>>()?;

        let mut receipts = Vec::with_capacity(creates.len());
        for (create, expires_at_block) in creates.into_iter().zip(expiries) {
            let key = state.mint_key();
            state.entities.push(StoredEntity {
                key: key.clone(),
                data: create.data,
                expires_at_block,
                string_annotations: create.string_annotations,
                numeric_annotations: create.numeric_annotations,
            });
            receipts.push(EntityReceipt {
                entity_key: key,
                expiration_block: Some(expires_at_block),
            });
        }
        debug!("memory ledger: created {} entities", receipts.len());
        Ok(receipts)
    }

    async fn update_entities(&self, updates: Vec<EntityUpdate>) -> LedgerResult<Vec<EntityReceipt>> {
        let mut state = self.state.write().await;
        let head = state.head;

        // validate the whole transaction before applying any of it
        let mut targets = Vec::with_capacity(updates.len());
        for update in &updates {
            let expires_at_block = expiry_block(head, update.btl)?;
            let pos = state
                .live_position(&update.entity_key)
                .ok_or_else(|| LedgerError::EntityNotFound(update.entity_key.clone()))?;
            targets.push((pos, expires_at_block));
        }

        let mut receipts = Vec::with_capacity(updates.len());
        for (update, (pos, expires_at_block)) in updates.into_iter().zip(targets) {
            let entity = &mut state.entities[pos];
            entity.data = update.data;
            entity.expires_at_block = expires_at_block;
            entity.string_annotations = update.string_annotations;
            entity.numeric_annotations = update.numeric_annotations;
            receipts.push(EntityReceipt {
                entity_key: update.entity_key,
                expiration_block: Some(entity.expires_at_block),
            });
        }
        Ok(receipts)
    }

    async fn delete_entities(&self, keys: Vec<EntityKey>) -> LedgerResult<Vec<EntityReceipt>> {
        let mut state = self.state.write().await;
        for key in &keys {
            if state.live_position(key).is_none() {
                return Err(LedgerError::EntityNotFound(key.clone()));
            }
        }
        state.entities.retain(|e| !keys.contains(&e.key));
        Ok(keys
            .into_iter()
            .map(|entity_key| EntityReceipt {
                entity_key,
                expiration_block: None,
            })
            .collect())
    }

    async fn query_entities(&self, filter: &str) -> LedgerResult<Vec<QueryEntity>> {
        let parsed = Filter::parse(filter)?;
        let state = self.state.read().await;
        Ok(state
            .live()
            .filter(|e| parsed.matches(&e.string_annotations, &e.numeric_annotations))
            .map(|e| QueryEntity {
                entity_key: e.key.clone(),
                storage_value: e.data.clone(),
                string_annotations: if self.inline_annotations {
                    e.string_annotations.clone()
                } else {
                    Vec::new()
                },
                numeric_annotations: if self.inline_annotations {
                    e.numeric_annotations.clone()
                } else {
                    Vec::new()
                },
            })
            .collect())
    }

    async fn entity_metadata(&self, key: &str) -> LedgerResult<EntityMetadata> {
        if self.failing_metadata.read().await.contains(key) {
            return Err(LedgerError::Unavailable(format!(
                "metadata lookup failed for {}",
                key
            )));
        }
        let state = self.state.read().await;
        let entity = state
            .live()
            .find(|e| e.key == key)
            .ok_or_else(|| LedgerError::EntityNotFound(key.to_string()))?;
        Ok(EntityMetadata {
            expires_at_block: Some(entity.expires_at_block),
            owner: None,
            string_annotations: entity.string_annotations.clone(),
            numeric_annotations: entity.numeric_annotations.clone(),
        })
    }

    async fn block_number(&self) -> LedgerResult<u64> {
        if !self.head_available.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("block number unavailable".into()));
        }
        Ok(self.state.read().await.head)
    }
}
