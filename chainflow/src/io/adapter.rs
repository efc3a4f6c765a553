//! Conversion between raw JSON records and items.

use crate::core::{Item, Payload, ProcessingContext};
use crate::errors::SourceError;
use crate::utils::generate_item_id;
use serde_json::{json, Map, Value};
use std::fmt::Debug;

/// Converts raw records to items and finished contexts back to records.
///
/// Adapters are pure: the same input always yields the same output, apart
/// from generated ids.
pub trait Adapter: Send + Sync + Debug {
    /// Converts one raw record into an item.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Malformed`] if the record has the wrong shape.
    fn to_item(&self, raw: &Value) -> Result<Item, SourceError>;

    /// Converts a processed context into an output record.
    fn from_context(&self, ctx: &ProcessingContext) -> Value;
}

fn malformed(reason: impl Into<String>) -> SourceError {
    SourceError::Malformed {
        location: "record".to_string(),
        reason: reason.into(),
    }
}

/// Reads and writes items in their own serialized form.
///
/// Input records look like `{"id": .., "payload": {..}, "metadata": {..}}`;
/// output records are the serialized item plus a `result` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAdapter;

impl Adapter for IdentityAdapter {
    fn to_item(&self, raw: &Value) -> Result<Item, SourceError> {
        serde_json::from_value(raw.clone()).map_err(|err| malformed(err.to_string()))
    }

    fn from_context(&self, ctx: &ProcessingContext) -> Value {
        let mut record = serde_json::to_value(&ctx.item).unwrap_or_else(|_| json!({}));
        if let Value::Object(map) = &mut record {
            map.insert("result".to_string(), json!(ctx.result));
        }
        record
    }
}

/// Maps flat JSON objects to items.
///
/// The `id_field` becomes the item id (generated if absent), a `metadata`
/// object becomes the item metadata, and every other field is payload.
#[derive(Debug, Clone)]
pub struct JsonAdapter {
    id_field: String,
    include_processing_info: bool,
}

impl Default for JsonAdapter {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            include_processing_info: false,
        }
    }
}

impl JsonAdapter {
    /// Creates an adapter using `id` as the id field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the id field.
    #[must_use]
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Adds a `processing` section (status, error, history) to output records.
    #[must_use]
    pub fn with_processing_info(mut self, enabled: bool) -> Self {
        self.include_processing_info = enabled;
        self
    }
}

impl Adapter for JsonAdapter {
    fn to_item(&self, raw: &Value) -> Result<Item, SourceError> {
        let Value::Object(fields) = raw else {
            return Err(malformed("expected a JSON object"));
        };

        let id = match fields.get(&self.id_field) {
            None | Some(Value::Null) => generate_item_id(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        let mut item = Item::with_id(id, Payload::new());
        match fields.get("metadata") {
            None | Some(Value::Null) => {}
            Some(Value::Object(metadata)) => {
                item.metadata = metadata.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            }
            Some(_) => return Err(malformed("'metadata' must be an object")),
        }

        item.payload = fields
            .iter()
            .filter(|(key, _)| *key != "metadata" && **key != self.id_field)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(item)
    }

    fn from_context(&self, ctx: &ProcessingContext) -> Value {
        let mut record = Map::new();
        record.insert("id".to_string(), json!(ctx.item.id));
        record.insert("payload".to_string(), Value::Object(ctx.item.payload.clone()));
        if !ctx.item.metadata.is_empty() {
            record.insert("metadata".to_string(), json!(ctx.item.metadata));
        }
        if self.include_processing_info {
            record.insert(
                "processing".to_string(),
                json!({
                    "status": ctx.result,
                    "error": ctx.error.as_ref().map(ToString::to_string),
                    "skip_reason": ctx.skip_reason,
                    "history": ctx.history,
                }),
            );
        }
        Value::Object(record)
    }
}

/// Maps flat CSV rows to items.
///
/// Columns starting with the metadata prefix (`_meta_` by default) become
/// item metadata with the prefix stripped; every other column, including
/// the id column, is payload. An empty or missing id is generated.
///
/// Output rows are flat: payload fields, optionally the prefixed metadata,
/// then `_status`, `_error` and `_history` (processor names joined by
/// `" -> "`).
#[derive(Debug, Clone)]
pub struct CsvAdapter {
    id_field: String,
    metadata_prefix: String,
    include_metadata_fields: bool,
}

impl Default for CsvAdapter {
    fn default() -> Self {
        Self {
            id_field: "id".to_string(),
            metadata_prefix: "_meta_".to_string(),
            include_metadata_fields: false,
        }
    }
}

impl CsvAdapter {
    /// Creates an adapter using `id` as the id column.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the id column.
    #[must_use]
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Sets the prefix that marks metadata columns.
    #[must_use]
    pub fn with_metadata_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metadata_prefix = prefix.into();
        self
    }

    /// Writes item metadata back out as prefixed columns.
    #[must_use]
    pub fn with_metadata_fields(mut self, enabled: bool) -> Self {
        self.include_metadata_fields = enabled;
        self
    }
}

impl Adapter for CsvAdapter {
    fn to_item(&self, raw: &Value) -> Result<Item, SourceError> {
        let Value::Object(fields) = raw else {
            return Err(malformed("expected a row of named columns"));
        };
        if fields.is_empty() {
            return Err(malformed("empty row"));
        }

        let id = match fields.get(&self.id_field) {
            None | Some(Value::Null) => generate_item_id(),
            Some(Value::String(s)) if s.is_empty() => generate_item_id(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        let mut item = Item::with_id(id, Payload::new());
        for (key, value) in fields {
            match key.strip_prefix(self.metadata_prefix.as_str()) {
                Some(meta_key) if !self.metadata_prefix.is_empty() => {
                    item.metadata.insert(meta_key.to_string(), value.clone());
                }
                _ => {
                    item.payload.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(item)
    }

    fn from_context(&self, ctx: &ProcessingContext) -> Value {
        let mut row = ctx.item.payload.clone();
        if self.include_metadata_fields {
            for (key, value) in &ctx.item.metadata {
                row.insert(format!("{}{key}", self.metadata_prefix), value.clone());
            }
        }
        row.insert("_status".to_string(), json!(ctx.result));
        if let Some(err) = &ctx.error {
            row.insert("_error".to_string(), json!(err.to_string()));
        }
        if !ctx.history.is_empty() {
            row.insert("_history".to_string(), json!(ctx.history.join(" -> ")));
        }
        Value::Object(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProcessorError;
    use crate::state::SharedState;

    #[test]
    fn test_json_adapter_splits_fields() {
        let item = JsonAdapter::new()
            .to_item(&json!({"id": 7, "name": "a", "metadata": {"src": "x"}}))
            .unwrap();

        assert_eq!(item.id, "7");
        assert_eq!(item.payload_value("name"), Some(&json!("a")));
        assert!(item.payload_value("id").is_none());
        assert_eq!(item.metadata_value("src"), Some(&json!("x")));
    }

    #[test]
    fn test_json_adapter_generates_missing_id() {
        let item = JsonAdapter::new().with_id_field("key").to_item(&json!({"v": 1})).unwrap();
        assert!(!item.id.is_empty());
    }

    #[test]
    fn test_json_adapter_rejects_non_objects() {
        assert!(matches!(
            JsonAdapter::new().to_item(&json!([1, 2])),
            Err(SourceError::Malformed { .. })
        ));
        assert!(JsonAdapter::new().to_item(&json!({"metadata": 3})).is_err());
    }

    #[test]
    fn test_json_adapter_processing_info() {
        let mut ctx = ProcessingContext::new(
            JsonAdapter::new().to_item(&json!({"id": "1", "v": 2})).unwrap(),
            SharedState::new(),
        );
        ctx.record("validate");
        ctx.mark_failure(ProcessorError::validation("validate", "bad"));

        let record = JsonAdapter::new().with_processing_info(true).from_context(&ctx);
        assert_eq!(record["id"], json!("1"));
        assert_eq!(record["payload"], json!({"v": 2}));
        assert_eq!(record["processing"]["status"], json!("failure"));
        assert_eq!(record["processing"]["history"], json!(["validate"]));
        assert!(record.get("metadata").is_none());
    }

    #[test]
    fn test_identity_adapter() {
        let item = IdentityAdapter
            .to_item(&json!({"id": "a", "payload": {"x": 1}}))
            .unwrap();
        assert_eq!(item.id, "a");
        assert!(item.timestamp.is_none());

        let mut ctx = ProcessingContext::new(item, SharedState::new());
        ctx.mark_success();
        let record = IdentityAdapter.from_context(&ctx);
        assert_eq!(record["result"], json!("success"));
        assert_eq!(record["payload"], json!({"x": 1}));
    }

    #[test]
    fn test_csv_adapter_separates_metadata_columns() {
        let item = CsvAdapter::new()
            .with_id_field("user_id")
            .to_item(&json!({"user_id": "123", "name": "Alice", "_meta_source": "api"}))
            .unwrap();

        assert_eq!(item.id, "123");
        assert_eq!(item.payload_value("user_id"), Some(&json!("123")));
        assert_eq!(item.payload_value("name"), Some(&json!("Alice")));
        assert!(item.payload_value("_meta_source").is_none());
        assert_eq!(item.metadata_value("source"), Some(&json!("api")));
    }

    #[test]
    fn test_csv_adapter_generates_blank_id_and_rejects_empty_rows() {
        let item = CsvAdapter::new().to_item(&json!({"id": "", "v": "1"})).unwrap();
        assert!(!item.id.is_empty());

        assert!(CsvAdapter::new().to_item(&json!({})).is_err());
        assert!(CsvAdapter::new().to_item(&json!("a,b")).is_err());
    }

    #[test]
    fn test_csv_adapter_flattens_output() {
        let item = CsvAdapter::new()
            .to_item(&json!({"id": "1", "v": "2", "_meta_src": "x"}))
            .unwrap();
        let mut ctx = ProcessingContext::new(item, SharedState::new());
        ctx.record("parse");
        ctx.record("validate");
        ctx.mark_failure(ProcessorError::validation("validate", "bad"));

        let row = CsvAdapter::new().from_context(&ctx);
        assert_eq!(row["v"], json!("2"));
        assert_eq!(row["_status"], json!("failure"));
        assert_eq!(row["_history"], json!("parse -> validate"));
        assert!(row["_error"].as_str().unwrap().contains("bad"));
        assert!(row.get("_meta_src").is_none());

        let row = CsvAdapter::new().with_metadata_fields(true).from_context(&ctx);
        assert_eq!(row["_meta_src"], json!("x"));
    }
}
