//! Mock processors and observers for testing.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::{PipelineEvent, ProcessingContext, Step};
use crate::errors::{ObserverError, ProcessorError, ProcessorErrorKind};
use crate::events::Observer;
use crate::processors::Processor;

/// A processor that counts its calls and always continues.
#[derive(Debug)]
pub struct CountingProcessor {
    name: String,
    calls: AtomicUsize,
}

impl CountingProcessor {
    /// Creates a new counting processor.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of times the processor was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Processor for CountingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, _ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Step::Continue)
    }
}

/// A processor that always fails.
#[derive(Debug)]
pub struct FailingProcessor {
    name: String,
    kind: ProcessorErrorKind,
    message: String,
    calls: AtomicUsize,
}

impl FailingProcessor {
    /// Creates a processor failing with an internal error.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ProcessorErrorKind::Internal,
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Sets the error kind.
    #[must_use]
    pub fn with_kind(mut self, kind: ProcessorErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns the number of times the processor was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Processor for FailingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, _ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProcessorError::new(&self.name, self.kind, &self.message))
    }
}

/// A processor that fails transiently a fixed number of times, then continues.
#[derive(Debug)]
pub struct FlakyProcessor {
    name: String,
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyProcessor {
    /// Creates a processor whose first `failures` calls fail.
    #[must_use]
    pub fn new(name: impl Into<String>, failures: usize) -> Self {
        Self {
            name: name.into(),
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of times the processor was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Processor for FlakyProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, _ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(ProcessorError::transient(
                &self.name,
                format!("attempt {} failed", call + 1),
            ))
        } else {
            Ok(Step::Continue)
        }
    }
}

/// A processor that records the id of every item it sees.
#[derive(Debug)]
pub struct RecordingProcessor {
    name: String,
    seen: Mutex<Vec<String>>,
}

impl RecordingProcessor {
    /// Creates a new recording processor.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Returns the recorded item ids, in call order.
    #[must_use]
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }

    /// Resets call tracking.
    pub fn reset(&self) {
        self.seen.lock().clear();
    }
}

impl Processor for RecordingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        self.seen.lock().push(ctx.item_id().to_string());
        Ok(Step::Continue)
    }
}

/// A processor that skips every item with a fixed reason.
#[derive(Debug)]
pub struct SkippingProcessor {
    name: String,
    reason: String,
}

impl SkippingProcessor {
    /// Creates a new skipping processor.
    #[must_use]
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl Processor for SkippingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, _ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        Ok(Step::skip(&self.reason))
    }
}

/// A processor that panics on every call.
#[derive(Debug)]
pub struct PanickingProcessor {
    name: String,
}

impl PanickingProcessor {
    /// Creates a new panicking processor.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Processor for PanickingProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    #[allow(clippy::panic)]
    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        panic!("processor '{}' exploded on '{}'", self.name, ctx.item_id());
    }
}

/// An observer whose handler always returns an error.
#[derive(Debug, Default)]
pub struct FailingObserver {
    calls: AtomicUsize,
}

impl FailingObserver {
    /// Creates a new failing observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of events delivered.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Observer for FailingObserver {
    fn on_event(&self, event: &PipelineEvent) -> Result<(), ObserverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ObserverError::new(format!("rejected {}", event.event_type)))
    }
}

/// An observer that panics on every event.
#[derive(Debug, Default)]
pub struct PanickingObserver;

impl Observer for PanickingObserver {
    #[allow(clippy::panic)]
    fn on_event(&self, event: &PipelineEvent) -> Result<(), ObserverError> {
        panic!("observer exploded on {}", event.event_type);
    }
}
