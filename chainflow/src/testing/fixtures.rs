//! Item fixtures.

use serde_json::json;

use crate::core::{Item, Payload};

/// Builder for test items with readable ids and payloads.
#[derive(Debug, Default)]
pub struct ItemFixture {
    id: Option<String>,
    payload: Payload,
}

impl ItemFixture {
    /// Creates an empty fixture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the item id.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds a payload field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Builds the item. Without an explicit id one is generated.
    #[must_use]
    pub fn build(self) -> Item {
        match self.id {
            Some(id) => Item::with_id(id, self.payload),
            None => Item::new(self.payload),
        }
    }
}

/// Returns a single item `id` with payload `{"name": "sample", "value": 1}`.
#[must_use]
pub fn sample_item(id: impl Into<String>) -> Item {
    ItemFixture::new()
        .id(id)
        .field("name", json!("sample"))
        .field("value", json!(1))
        .build()
}

/// Returns `count` items with ids `item-0..` and payload `{"value": i}`.
#[must_use]
pub fn numbered_items(count: usize) -> Vec<Item> {
    (0..count)
        .map(|i| {
            ItemFixture::new()
                .id(format!("item-{i}"))
                .field("value", json!(i))
                .build()
        })
        .collect()
}
