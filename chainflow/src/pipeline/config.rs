//! Pipeline execution settings.

use serde::{Deserialize, Serialize};

/// Configuration for a [`Pipeline`](super::Pipeline).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Publish `item_started` / `item_completed` / `item_failed` events.
    /// Pipeline-level events are always published.
    pub emit_item_events: bool,
    /// Convert a panic inside a processor into a failure of that item
    /// instead of unwinding out of `execute`.
    pub catch_panics: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            emit_item_events: true,
            catch_panics: true,
        }
    }
}

impl PipelineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether item events are published.
    #[must_use]
    pub fn with_item_events(mut self, enabled: bool) -> Self {
        self.emit_item_events = enabled;
        self
    }

    /// Sets whether processor panics are caught.
    #[must_use]
    pub fn with_catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }
}
