//! Processor trait and implementations.
//!
//! Processors are the units of work a pipeline threads each item through.
//! A processor reports one of three outcomes: `Ok(Step::Continue)`,
//! `Ok(Step::Skip { .. })`, or `Err(ProcessorError)`.

mod stateful;
mod transform;
mod validation;

pub use stateful::{AggregatorProcessor, CounterProcessor, DeduplicationProcessor};
pub use transform::{
    FilterFieldsTransform, FnTransform, LowerCaseTransform, TransformProcessor,
    TransformStrategy, UpperCaseTransform,
};
pub use validation::ValidationProcessor;

use crate::core::{ProcessingContext, Step};
use crate::errors::ProcessorError;
use std::fmt::Debug;
use std::sync::Arc;

/// Trait for pipeline processors.
///
/// Implementations must be shareable across threads: a pipeline may be
/// executed from several threads at once, so any internal bookkeeping
/// needs its own synchronization.
pub trait Processor: Send + Sync + Debug {
    /// Returns the name of the processor.
    fn name(&self) -> &str;

    /// Processes one context.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessorError`] when the item cannot be processed. The
    /// pipeline records it on the context and moves on to the next item.
    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError>;
}

/// Shared handle to a processor.
pub type ProcessorRef = Arc<dyn Processor>;

impl<P: Processor + ?Sized> Processor for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        (**self).process(ctx)
    }
}

type ProcessFn = dyn Fn(&mut ProcessingContext) -> Result<Step, ProcessorError> + Send + Sync;

/// A simple function-based processor.
pub struct FnProcessor {
    name: String,
    func: Box<ProcessFn>,
}

impl FnProcessor {
    /// Creates a new function-based processor.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut ProcessingContext) -> Result<Step, ProcessorError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    /// Creates a processor from a closure returning `anyhow::Result`.
    ///
    /// Errors are reported as internal failures attributed to this processor.
    pub fn fallible<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut ProcessingContext) -> anyhow::Result<Step> + Send + Sync + 'static,
    {
        let name = name.into();
        let owner = name.clone();
        Self::new(name, move |ctx| {
            func(ctx).map_err(|err| {
                let mut err = ProcessorError::from(err);
                err.processor.clone_from(&owner);
                err
            })
        })
    }

    /// Creates a processor that only inspects or mutates the context and
    /// always continues.
    pub fn inspect<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut ProcessingContext) + Send + Sync + 'static,
    {
        Self::new(name, move |ctx| {
            func(ctx);
            Ok(Step::Continue)
        })
    }
}

impl Debug for FnProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProcessor")
            .field("name", &self.name)
            .finish()
    }
}

impl Processor for FnProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        (self.func)(ctx)
    }
}

/// A pass-through processor.
#[derive(Debug, Clone)]
pub struct NoOpProcessor {
    name: String,
}

impl NoOpProcessor {
    /// Creates a new no-op processor.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for NoOpProcessor {
    fn default() -> Self {
        Self::new("noop")
    }
}

impl Processor for NoOpProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, _ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        Ok(Step::Continue)
    }
}
