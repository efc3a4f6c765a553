//! The unit of data flowing through a pipeline.

use crate::utils::{generate_item_id, now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered payload mapping. Keys iterate in sorted order, which keeps
/// serialization and payload hashing deterministic.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// One logical record.
///
/// `id` is stable for the lifetime of the record and is the key used for
/// deduplication. `Clone` is a deep copy: payload and metadata own their
/// JSON values, so a clone never shares mutable structure with the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Stable record id.
    pub id: String,
    /// Business data.
    #[serde(default)]
    pub payload: Payload,
    /// Annotations added by processors and decorators.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    /// When the record was produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

impl Item {
    /// Creates an item with a generated id, stamped with the current time.
    #[must_use]
    pub fn new(payload: Payload) -> Self {
        Self::with_id(generate_item_id(), payload)
    }

    /// Creates an item with an explicit id, stamped with the current time.
    #[must_use]
    pub fn with_id(id: impl Into<String>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            payload,
            metadata: HashMap::new(),
            timestamp: Some(now_utc()),
        }
    }

    /// Creates an item from a JSON object value.
    ///
    /// Non-object values are stored under a single `value` key.
    #[must_use]
    pub fn from_json(id: impl Into<String>, value: serde_json::Value) -> Self {
        let payload = match value {
            serde_json::Value::Object(map) => map,
            other => {
                let mut map = Payload::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self::with_id(id, payload)
    }

    /// Sets the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Option<Timestamp>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Gets a payload value.
    #[must_use]
    pub fn payload_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }

    /// Sets a payload value.
    pub fn set_payload_value(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.payload.insert(key.into(), value);
    }

    /// Adds or replaces a metadata entry.
    pub fn add_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Gets a metadata value.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_new_generates_id_and_timestamp() {
        let a = Item::new(Payload::new());
        let b = Item::new(Payload::new());
        assert_ne!(a.id, b.id);
        assert!(a.timestamp.is_some());
    }

    #[test]
    fn test_clone_is_deep() {
        let original = Item::with_id("1", payload(json!({"tags": ["a"]})))
            .with_metadata("seen", json!({"count": 1}));
        let mut copy = original.clone();

        if let Some(serde_json::Value::Array(tags)) = copy.payload.get_mut("tags") {
            tags.push(json!("b"));
        }
        copy.add_metadata("seen", json!({"count": 2}));

        assert_eq!(original.payload_value("tags"), Some(&json!(["a"])));
        assert_eq!(original.metadata_value("seen"), Some(&json!({"count": 1})));
        assert_eq!(copy.id, original.id);
    }

    #[test]
    fn test_from_json_wraps_scalars() {
        let item = Item::from_json("x", json!(42));
        assert_eq!(item.payload_value("value"), Some(&json!(42)));

        let item = Item::from_json("y", json!({"name": "alice"}));
        assert_eq!(item.payload_value("name"), Some(&json!("alice")));
    }

    #[test]
    fn test_payload_keys_are_sorted() {
        let item = Item::with_id("1", payload(json!({"b": 1, "a": 2})));
        let keys: Vec<_> = item.payload.keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_serde_roundtrip_without_timestamp() {
        let item = Item::with_id("1", payload(json!({"a": 1}))).with_timestamp(None);
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("timestamp").is_none());

        let back: Item = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }
}
