//! Normalized entity rows
//!
//! Whatever shape the ledger returns, callers see one row type: decoded
//! payload, tag maps, and the expiry block when metadata was fetched.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::annotations::{resolve_tag, AnnotationSet, TAG_COLLECTION, TAG_VERSION};
use super::envelope::{embedded_collection, embedded_version};
use crate::ledger::{EntityKey, EntityMetadata, QueryEntity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRow {
    pub entity_key: EntityKey,
    pub value: JsonValue,
    pub annotations: AnnotationSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_block: Option<u64>,
}

/// Decode stored bytes as UTF-8 text, then JSON; unparseable text stays a string
pub fn decode_payload(bytes: &[u8]) -> JsonValue {
    let text = String::from_utf8_lossy(bytes);
    match serde_json::from_str::<JsonValue>(&text) {
        Ok(value) => value,
        Err(_) => JsonValue::String(text.into_owned()),
    }
}

impl EntityRow {
    pub fn from_query(entity: QueryEntity) -> Self {
        let value = decode_payload(&entity.storage_value);
        let mut annotations =
            AnnotationSet::from_lists(&entity.string_annotations, &entity.numeric_annotations);

        let collection = resolve_tag(
            annotations.string(TAG_COLLECTION).map(str::to_string),
            embedded_collection(&value),
        );
        if let Some(collection) = collection {
            annotations.strings.insert(TAG_COLLECTION.to_string(), collection);
        }

        let version = resolve_tag(annotations.number(TAG_VERSION), embedded_version(&value));
        if let Some(version) = version {
            annotations.numbers.insert(TAG_VERSION.to_string(), version);
        }

        Self {
            entity_key: entity.entity_key,
            value,
            annotations,
            expires_at_block: None,
        }
    }

    /// Metadata tags overwrite the row's; its expiry replaces the row's when present
    pub fn merge_metadata(mut self, meta: EntityMetadata) -> Self {
        self.annotations
            .overlay(&meta.string_annotations, &meta.numeric_annotations);
        if meta.expires_at_block.is_some() {
            self.expires_at_block = meta.expires_at_block;
        }
        self
    }

    pub fn collection(&self) -> Option<String> {
        resolve_tag(
            self.annotations.string(TAG_COLLECTION).map(str::to_string),
            embedded_collection(&self.value),
        )
    }

    pub fn version(&self) -> Option<u64> {
        resolve_tag(self.annotations.number(TAG_VERSION), embedded_version(&self.value))
    }
}
