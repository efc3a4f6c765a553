//! Config-driven processor construction.
//!
//! A [`ProcessorRegistry`] maps a `kind` string to a factory. Specs are
//! plain serde values, so a whole chain can be described in JSON:
//!
//! ```json
//! [
//!   {"kind": "dedup"},
//!   {"kind": "validate", "options": {"required": ["email"]}},
//!   {"kind": "uppercase", "decorators": [{"type": "cache", "capacity": 100}, {"type": "timing"}]}
//! ]
//! ```

use crate::decorators::{
    CacheConfig, CachingDecorator, LoggingDecorator, LoggingDecoratorConfig, RetryConfig,
    RetryDecorator, TimingDecorator,
};
use crate::errors::ConfigurationError;
use crate::processors::{
    AggregatorProcessor, CounterProcessor, DeduplicationProcessor, FilterFieldsTransform,
    LowerCaseTransform, NoOpProcessor, ProcessorRef, TransformProcessor, UpperCaseTransform,
    ValidationProcessor,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A decorator to wrap around a built processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecoratorSpec {
    /// [`TimingDecorator`].
    Timing,
    /// [`LoggingDecorator`].
    Logging(LoggingDecoratorConfig),
    /// [`RetryDecorator`].
    Retry(RetryConfig),
    /// [`CachingDecorator`].
    Cache(CacheConfig),
}

impl DecoratorSpec {
    /// Wraps `inner` with this decorator.
    #[must_use]
    pub fn wrap(&self, inner: ProcessorRef) -> ProcessorRef {
        match self {
            Self::Timing => Arc::new(TimingDecorator::new(inner)),
            Self::Logging(config) => Arc::new(LoggingDecorator::new(inner, *config)),
            Self::Retry(config) => Arc::new(RetryDecorator::new(inner, config.clone())),
            Self::Cache(config) => Arc::new(CachingDecorator::new(inner, *config)),
        }
    }
}

/// Description of one processor in a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorSpec {
    /// Registered kind.
    pub kind: String,
    /// Processor name; defaults to the kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Kind-specific options.
    #[serde(default)]
    pub options: serde_json::Value,
    /// Decorators, innermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<DecoratorSpec>,
}

impl ProcessorSpec {
    /// Creates a spec with no options.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            options: serde_json::Value::Null,
            decorators: Vec::new(),
        }
    }

    /// Sets the processor name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = options;
        self
    }

    /// Adds a decorator outside the ones already listed.
    #[must_use]
    pub fn decorated(mut self, decorator: DecoratorSpec) -> Self {
        self.decorators.push(decorator);
        self
    }
}

/// Builds a processor from a name and options.
pub type ProcessorFactory =
    dyn Fn(&str, &serde_json::Value) -> Result<ProcessorRef, ConfigurationError> + Send + Sync;

/// Explicit mapping from kind to factory. There is no global registry.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    factories: HashMap<String, Arc<ProcessorFactory>>,
}

/// Parses options into `T`, treating `null` as an empty object.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] naming `kind` if the options do not fit.
pub fn parse_options<T: DeserializeOwned>(
    kind: &str,
    options: &serde_json::Value,
) -> Result<T, ConfigurationError> {
    let value = if options.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        options.clone()
    };
    serde_json::from_value(value)
        .map_err(|err| ConfigurationError::invalid_options(kind, err.to_string()))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct KeyOptions {
    key: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AggregateOptions {
    field: String,
    key: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldsOptions {
    fields: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ValidateOptions {
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    patterns: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoOptions {}

impl ProcessorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in kind registered:
    /// `counter`, `dedup`, `aggregate`, `uppercase`, `lowercase`,
    /// `filter_fields`, `validate`, `noop`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register("counter", |name, options| {
            let opts: KeyOptions = parse_options("counter", options)?;
            let key = opts.key.unwrap_or_else(|| CounterProcessor::DEFAULT_KEY.to_string());
            Ok(Arc::new(CounterProcessor::new(key).with_name(name)) as ProcessorRef)
        });
        registry.register("dedup", |name, options| {
            let opts: KeyOptions = parse_options("dedup", options)?;
            let key = opts.key.unwrap_or_else(|| DeduplicationProcessor::DEFAULT_KEY.to_string());
            Ok(Arc::new(DeduplicationProcessor::new(key).with_name(name)) as ProcessorRef)
        });
        registry.register("aggregate", |name, options| {
            let opts: AggregateOptions = parse_options("aggregate", options)?;
            let mut processor = AggregatorProcessor::new(opts.field).with_name(name);
            if let Some(key) = opts.key {
                processor = processor.with_key(key);
            }
            Ok(Arc::new(processor) as ProcessorRef)
        });
        registry.register("uppercase", |name, options| {
            parse_options::<NoOptions>("uppercase", options)?;
            let processor = TransformProcessor::new(UpperCaseTransform).with_name(name);
            Ok(Arc::new(processor) as ProcessorRef)
        });
        registry.register("lowercase", |name, options| {
            parse_options::<NoOptions>("lowercase", options)?;
            let processor = TransformProcessor::new(LowerCaseTransform).with_name(name);
            Ok(Arc::new(processor) as ProcessorRef)
        });
        registry.register("filter_fields", |name, options| {
            let opts: FieldsOptions = parse_options("filter_fields", options)?;
            let processor =
                TransformProcessor::new(FilterFieldsTransform::new(opts.fields)).with_name(name);
            Ok(Arc::new(processor) as ProcessorRef)
        });
        registry.register("validate", |name, options| {
            let opts: ValidateOptions = parse_options("validate", options)?;
            let mut processor = ValidationProcessor::new().with_name(name);
            for field in opts.required {
                processor = processor.require(field);
            }
            for (field, pattern) in &opts.patterns {
                processor = processor.pattern(field.as_str(), pattern)?;
            }
            Ok(Arc::new(processor) as ProcessorRef)
        });
        registry.register("noop", |name, options| {
            parse_options::<NoOptions>("noop", options)?;
            Ok(Arc::new(NoOpProcessor::new(name)) as ProcessorRef)
        });

        registry
    }

    /// Registers (or replaces) the factory for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&str, &serde_json::Value) -> Result<ProcessorRef, ConfigurationError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    /// Returns true if `kind` is registered.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Returns the registered kinds, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<_> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Builds one processor, applying its decorators innermost first.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] for unknown kinds or bad options.
    pub fn build(&self, spec: &ProcessorSpec) -> Result<ProcessorRef, ConfigurationError> {
        let factory = self
            .factories
            .get(&spec.kind)
            .ok_or_else(|| ConfigurationError::unknown_kind(&spec.kind))?;
        let name = spec.name.as_deref().unwrap_or(&spec.kind);
        let processor = factory(name, &spec.options)?;
        Ok(spec
            .decorators
            .iter()
            .fold(processor, |inner, decorator| decorator.wrap(inner)))
    }

    /// Builds every spec, in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`].
    pub fn build_all(
        &self,
        specs: &[ProcessorSpec],
    ) -> Result<Vec<ProcessorRef>, ConfigurationError> {
        specs.iter().map(|spec| self.build(spec)).collect()
    }
}

impl std::fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
