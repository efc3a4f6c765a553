//! Processors that read and write the pipeline's shared state.

use super::Processor;
use crate::core::{ProcessingContext, Step};
use crate::errors::ProcessorError;
use serde_json::Value;

/// Increments an integer counter in shared state once per item.
#[derive(Debug, Clone)]
pub struct CounterProcessor {
    name: String,
    key: String,
}

impl CounterProcessor {
    /// Default state key for the counter.
    pub const DEFAULT_KEY: &'static str = "processed_count";

    /// Creates a counter stored under `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            name: "counter".to_string(),
            key: key.into(),
        }
    }

    /// Sets the processor name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the state key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Default for CounterProcessor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_KEY)
    }
}

impl Processor for CounterProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        ctx.state().update(|map| -> Result<Step, ProcessorError> {
            let current = match map.get(&self.key) {
                None | Some(Value::Null) => 0,
                Some(value) => value.as_i64().ok_or_else(|| {
                    ProcessorError::internal(
                        &self.name,
                        format!("state key '{}' does not hold an integer", self.key),
                    )
                })?,
            };
            map.insert(self.key.clone(), Value::from(current + 1));
            Ok(Step::Continue)
        })
    }
}

/// Skips items whose id has already been seen by this pipeline.
///
/// Seen ids are kept as a JSON array in shared state, in first-seen order.
#[derive(Debug, Clone)]
pub struct DeduplicationProcessor {
    name: String,
    key: String,
}

impl DeduplicationProcessor {
    /// Default state key for the seen-set.
    pub const DEFAULT_KEY: &'static str = "seen_ids";

    /// Creates a deduplicator that keeps seen ids under `key`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            name: "dedup".to_string(),
            key: key.into(),
        }
    }

    /// Sets the processor name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for DeduplicationProcessor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_KEY)
    }
}

impl Processor for DeduplicationProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        let id = ctx.item.id.clone();
        ctx.state().update(|map| {
            let seen = map
                .entry(self.key.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            let Value::Array(ids) = seen else {
                return Err(ProcessorError::internal(
                    &self.name,
                    format!("state key '{}' does not hold a list", self.key),
                ));
            };

            if ids.iter().any(|seen_id| seen_id.as_str() == Some(id.as_str())) {
                Ok(Step::skip(format!("duplicate id '{id}'")))
            } else {
                ids.push(Value::String(id));
                Ok(Step::Continue)
            }
        })
    }
}

/// Appends one payload field of every item to a list in shared state.
///
/// Items missing the field contribute `null`.
#[derive(Debug, Clone)]
pub struct AggregatorProcessor {
    name: String,
    field: String,
    key: String,
}

impl AggregatorProcessor {
    /// Default state key for the aggregated values.
    pub const DEFAULT_KEY: &'static str = "aggregated_values";

    /// Creates an aggregator collecting `field` under the default key.
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            name: "aggregate".to_string(),
            field: field.into(),
            key: Self::DEFAULT_KEY.to_string(),
        }
    }

    /// Sets the state key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Sets the processor name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Processor for AggregatorProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        let value = ctx.item.payload_value(&self.field).cloned().unwrap_or(Value::Null);
        ctx.state().update(|map| {
            match map
                .entry(self.key.clone())
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                Value::Array(values) => {
                    values.push(value);
                    Ok(Step::Continue)
                }
                _ => Err(ProcessorError::internal(
                    &self.name,
                    format!("state key '{}' does not hold a list", self.key),
                )),
            }
        })
    }
}
