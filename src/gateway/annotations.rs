//! Annotation handling for the entity gateway
//!
//! Tags are split into two typed partitions, strings and unsigned numbers,
//! mirroring how the ledger stores them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{StudioError, StudioResult};
use crate::ledger::{Annotation, NumericAnnotation, StringAnnotation};

pub const TAG_COLLECTION: &str = "collection";
pub const TAG_APP: &str = "app";
pub const TAG_ID: &str = "id";
pub const TAG_VERSION: &str = "version";
pub const TAG_BATCH_ID: &str = "batchId";

/// Tags the gateway always writes itself
pub const RESERVED_TAGS: [&str; 4] = [TAG_COLLECTION, TAG_APP, TAG_ID, TAG_VERSION];

/// Tag maps of a normalized entity row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSet {
    pub strings: BTreeMap<String, String>,
    pub numbers: BTreeMap<String, u64>,
}

impl AnnotationSet {
    /// Build from ledger lists; a repeated key keeps its last value
    pub fn from_lists(strings: &[StringAnnotation], numbers: &[NumericAnnotation]) -> Self {
        let mut set = Self::default();
        set.overlay(strings, numbers);
        set
    }

    /// Write every given annotation over the existing ones
    pub fn overlay(&mut self, strings: &[StringAnnotation], numbers: &[NumericAnnotation]) {
        for a in strings {
            self.strings.insert(a.key.clone(), a.value.clone());
        }
        for a in numbers {
            self.numbers.insert(a.key.clone(), a.value);
        }
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    pub fn number(&self, key: &str) -> Option<u64> {
        self.numbers.get(key).copied()
    }
}

/// A caller-supplied extra tag value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Text(String),
    Number(u64),
}

impl TagValue {
    /// Non-negative integers stay numeric; anything else becomes text
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Number(n) => match n.as_u64() {
                Some(v) => TagValue::Number(v),
                None => TagValue::Text(n.to_string()),
            },
            JsonValue::String(s) => TagValue::Text(s.clone()),
            other => TagValue::Text(other.to_string()),
        }
    }
}

/// Ordered annotation lists ready for a ledger write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList {
    pub strings: Vec<StringAnnotation>,
    pub numbers: Vec<NumericAnnotation>,
}

impl TagList {
    pub fn text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.strings.push(Annotation::new(key, value.into()));
        self
    }

    pub fn number(mut self, key: &str, value: u64) -> Self {
        self.numbers.push(Annotation::new(key, value));
        self
    }

    pub fn push(&mut self, key: &str, value: TagValue) {
        match value {
            TagValue::Text(v) => self.strings.push(Annotation::new(key, v)),
            TagValue::Number(v) => self.numbers.push(Annotation::new(key, v)),
        }
    }
}

/// Validate and convert user extra tags. Reserved and blank keys are rejected.
pub fn parse_extra_tags(extra: &BTreeMap<String, JsonValue>) -> StudioResult<Vec<(String, TagValue)>> {
    extra
        .iter()
        .map(|(key, value)| {
            let key = key.trim();
            if key.is_empty() {
                return Err(StudioError::validation("Extra annotation keys must not be empty"));
            }
            if RESERVED_TAGS.contains(&key) {
                return Err(StudioError::validation(format!(
                    "Annotation '{}' is managed by Studio and cannot be set as an extra",
                    key
                )));
            }
            Ok((key.to_string(), TagValue::from_json(value)))
        })
        .collect()
}

/// Tag value wins; the value embedded in the payload is the fallback
pub fn resolve_tag<T>(tag: Option<T>, embedded: Option<T>) -> Option<T> {
    tag.or(embedded)
}
