//! Logging decorator.

use crate::core::{ProcessingContext, Step};
use crate::errors::ProcessorError;
use crate::processors::{Processor, ProcessorRef};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Which boundaries of the wrapped call are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingDecoratorConfig {
    /// Log before the call.
    pub log_input: bool,
    /// Log after a successful call.
    pub log_output: bool,
    /// Log failed calls.
    pub log_errors: bool,
}

impl Default for LoggingDecoratorConfig {
    fn default() -> Self {
        Self {
            log_input: true,
            log_output: true,
            log_errors: true,
        }
    }
}

impl LoggingDecoratorConfig {
    /// Creates a config logging every boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets input logging.
    #[must_use]
    pub fn with_log_input(mut self, enabled: bool) -> Self {
        self.log_input = enabled;
        self
    }

    /// Sets output logging.
    #[must_use]
    pub fn with_log_output(mut self, enabled: bool) -> Self {
        self.log_output = enabled;
        self
    }

    /// Sets error logging.
    #[must_use]
    pub fn with_log_errors(mut self, enabled: bool) -> Self {
        self.log_errors = enabled;
        self
    }
}

/// Emits `tracing` records around the wrapped processor.
///
/// Never alters the context; errors are logged and returned unchanged.
#[derive(Debug)]
pub struct LoggingDecorator {
    name: String,
    inner: ProcessorRef,
    config: LoggingDecoratorConfig,
}

impl LoggingDecorator {
    /// Wraps `inner` with `config`.
    #[must_use]
    pub fn new(inner: ProcessorRef, config: LoggingDecoratorConfig) -> Self {
        Self {
            name: format!("logging({})", inner.name()),
            inner,
            config,
        }
    }

    /// Sets the decorator name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Processor for LoggingDecorator {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        let processor = self.inner.name();

        if self.config.log_input {
            info!(processor, item_id = %ctx.item.id, "Processing started");
            debug!(
                processor,
                payload = ?ctx.item.payload,
                metadata = ?ctx.item.metadata,
                "Input item"
            );
        }

        match self.inner.process(ctx) {
            Ok(step) => {
                if self.config.log_output {
                    info!(processor, item_id = %ctx.item.id, step = ?step, "Processing completed");
                    debug!(
                        processor,
                        payload = ?ctx.item.payload,
                        metadata = ?ctx.item.metadata,
                        "Output item"
                    );
                }
                Ok(step)
            }
            Err(err) => {
                if self.config.log_errors {
                    error!(processor, item_id = %ctx.item.id, error = %err, "Processing failed");
                }
                Err(err)
            }
        }
    }
}
