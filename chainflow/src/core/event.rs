//! Lifecycle events published by pipelines.

use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Kinds of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A batch run began.
    PipelineStarted,
    /// A batch run finished with no failed items.
    PipelineCompleted,
    /// A batch run finished with at least one failed item.
    PipelineFailed,
    /// An item entered the chain.
    ItemStarted,
    /// An item left the chain successfully or skipped.
    ItemCompleted,
    /// An item left the chain with an error.
    ItemFailed,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PipelineStarted => "pipeline_started",
            Self::PipelineCompleted => "pipeline_completed",
            Self::PipelineFailed => "pipeline_failed",
            Self::ItemStarted => "item_started",
            Self::ItemCompleted => "item_completed",
            Self::ItemFailed => "item_failed",
        };
        write!(f, "{s}")
    }
}

impl EventType {
    /// Returns true for pipeline-level events.
    #[must_use]
    pub fn is_pipeline_event(&self) -> bool {
        matches!(
            self,
            Self::PipelineStarted | Self::PipelineCompleted | Self::PipelineFailed
        )
    }
}

/// An immutable lifecycle event.
///
/// Events are created by the pipeline, handed to the event bus, and may
/// outlive the context that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineEvent {
    /// What happened.
    pub event_type: EventType,
    /// The pipeline that emitted the event.
    pub pipeline_id: String,
    /// The item concerned, for item events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// The processor concerned, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor_name: Option<String>,
    /// Rendered error, for failure events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the event was created.
    pub timestamp: Timestamp,
    /// Extra event data.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl PipelineEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(event_type: EventType, pipeline_id: impl Into<String>) -> Self {
        Self {
            event_type,
            pipeline_id: pipeline_id.into(),
            item_id: None,
            processor_name: None,
            error: None,
            timestamp: now_utc(),
            metadata: HashMap::new(),
        }
    }

    /// Sets the item id.
    #[must_use]
    pub fn with_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    /// Sets the processor name.
    #[must_use]
    pub fn with_processor(mut self, processor_name: impl Into<String>) -> Self {
        self.processor_name = Some(processor_name.into());
        self
    }

    /// Sets the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Adds a metadata field.
    #[must_use]
    pub fn add_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Creates a "pipeline_started" event.
    #[must_use]
    pub fn pipeline_started(pipeline_id: &str, batch_size: usize) -> Self {
        Self::new(EventType::PipelineStarted, pipeline_id)
            .add_metadata("batch_size", serde_json::json!(batch_size))
    }

    /// Creates an "item_started" event.
    #[must_use]
    pub fn item_started(pipeline_id: &str, item_id: &str) -> Self {
        Self::new(EventType::ItemStarted, pipeline_id).with_item(item_id)
    }

    /// Creates an "item_completed" event; `result` is "success" or "skipped".
    #[must_use]
    pub fn item_completed(pipeline_id: &str, item_id: &str, result: &str) -> Self {
        Self::new(EventType::ItemCompleted, pipeline_id)
            .with_item(item_id)
            .add_metadata("result", serde_json::json!(result))
    }

    /// Creates an "item_failed" event.
    #[must_use]
    pub fn item_failed(pipeline_id: &str, item_id: &str, processor: &str, error: &str) -> Self {
        Self::new(EventType::ItemFailed, pipeline_id)
            .with_item(item_id)
            .with_processor(processor)
            .with_error(error)
    }

    /// Returns a metadata value.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Converts the event to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("event_type".to_string(), serde_json::json!(self.event_type.to_string()));
        map.insert("pipeline_id".to_string(), serde_json::json!(self.pipeline_id));
        map.insert("timestamp".to_string(), serde_json::json!(self.timestamp.to_rfc3339()));
        map.insert("item_id".to_string(), serde_json::json!(self.item_id));
        map.insert("processor_name".to_string(), serde_json::json!(self.processor_name));
        map.insert("error".to_string(), serde_json::json!(self.error));
        map.insert("metadata".to_string(), serde_json::json!(self.metadata));
        map
    }
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metadata = serde_json::to_string(&self.metadata).map_err(|_| fmt::Error)?;
        write!(
            f,
            "[{}] Event: {}, Pipeline: {}, Item: {}, Processor: {}, Error: {}, Metadata: {}",
            self.timestamp.to_rfc3339(),
            self.event_type,
            self.pipeline_id,
            self.item_id.as_deref().unwrap_or("N/A"),
            self.processor_name.as_deref().unwrap_or("N/A"),
            self.error.as_deref().unwrap_or("None"),
            metadata,
        )
    }
}
