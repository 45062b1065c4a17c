//! Payload envelope
//!
//! Every payload is wrapped as `{"meta": {...}, "data": <payload>}` so the
//! identifying tags are also recoverable from the stored bytes.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::annotations::{TAG_COLLECTION, TAG_VERSION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    pub app: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadEnvelope {
    pub meta: EnvelopeMeta,
    pub data: JsonValue,
}

impl PayloadEnvelope {
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// `meta.collection` of a decoded payload, if any
pub fn embedded_collection(value: &JsonValue) -> Option<String> {
    value
        .get("meta")?
        .get(TAG_COLLECTION)?
        .as_str()
        .map(str::to_string)
}

/// `meta.version` of a decoded payload, if it is an unsigned integer
pub fn embedded_version(value: &JsonValue) -> Option<u64> {
    value.get("meta")?.get(TAG_VERSION)?.as_u64()
}
