//! Result caching decorator.

use crate::core::{Item, ProcessingContext, Step};
use crate::errors::ProcessorError;
use crate::processors::{Processor, ProcessorRef};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Which entry is evicted when the cache is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Evict the entry inserted first; hits do not affect the order.
    InsertionOrder,
    /// A hit moves the entry to the back of the queue, so the entry
    /// evicted is the one touched least recently.
    #[default]
    RefreshOnHit,
}

/// Configuration for the caching decorator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached results. Zero disables storage.
    pub capacity: usize,
    /// Eviction policy.
    pub eviction: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            eviction: EvictionPolicy::default(),
        }
    }
}

impl CacheConfig {
    /// Creates a new cache config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the eviction policy.
    #[must_use]
    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that invoked the wrapped processor.
    pub misses: u64,
    /// Entries dropped to make room.
    pub evictions: u64,
    /// Entries currently held.
    pub size: usize,
    /// Configured capacity.
    pub capacity: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, zero before the first lookup.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Derives the cache key for an item.
pub type CacheKeyFn = dyn Fn(&Item) -> String + Send + Sync;

/// Default cache key: SHA-256 hex digest of the payload's canonical JSON.
///
/// Payload maps keep their keys sorted, so equal payloads always hash the
/// same regardless of insertion order. Id and timestamp are not part of
/// the key.
#[must_use]
pub fn payload_cache_key(item: &Item) -> String {
    let json = serde_json::to_string(&item.payload).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
struct CachedResult {
    item: Item,
    step: Step,
}

#[derive(Debug, Default)]
struct CacheStore {
    entries: HashMap<String, CachedResult>,
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheStore {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    fn insert(&mut self, key: String, result: CachedResult, capacity: usize) {
        if capacity == 0 {
            return;
        }
        if self.entries.insert(key.clone(), result).is_some() {
            return;
        }
        while self.order.len() >= capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    self.evictions += 1;
                }
                None => break,
            }
        }
        self.order.push_back(key);
    }
}

/// Memoizes the wrapped processor's output by a key derived from the input.
///
/// On a hit the wrapped processor is not invoked: the context receives a
/// copy of the cached output item, keeping the incoming item's id and
/// timestamp, annotated `cache_hit = true`. On a miss the processor runs,
/// its output is stored, and the item is annotated `cache_hit = false`.
/// Failures are never cached. The store never holds more than `capacity`
/// entries.
pub struct CachingDecorator {
    name: String,
    inner: ProcessorRef,
    config: CacheConfig,
    key_fn: Arc<CacheKeyFn>,
    store: Mutex<CacheStore>,
}

impl CachingDecorator {
    /// Metadata key marking whether the result came from the cache.
    pub const METADATA_KEY: &'static str = "cache_hit";

    /// Wraps `inner` with `config`.
    #[must_use]
    pub fn new(inner: ProcessorRef, config: CacheConfig) -> Self {
        Self {
            name: format!("cache({})", inner.name()),
            inner,
            config,
            key_fn: Arc::new(payload_cache_key),
            store: Mutex::new(CacheStore::default()),
        }
    }

    /// Sets the decorator name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the key function.
    #[must_use]
    pub fn with_key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&Item) -> String + Send + Sync + 'static,
    {
        self.key_fn = Arc::new(key_fn);
        self
    }

    /// Returns the cache key `item` would be stored under.
    #[must_use]
    pub fn cache_key(&self, item: &Item) -> String {
        (self.key_fn)(item)
    }

    /// Returns true if a result is cached under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.store.lock().entries.contains_key(key)
    }

    /// Returns the cached keys, oldest first in eviction order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.store.lock().order.iter().cloned().collect()
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let store = self.store.lock();
        CacheStats {
            hits: store.hits,
            misses: store.misses,
            evictions: store.evictions,
            size: store.entries.len(),
            capacity: self.config.capacity,
        }
    }

    /// Drops every entry and resets the counters.
    pub fn clear_cache(&self) {
        *self.store.lock() = CacheStore::default();
    }

    fn lookup(&self, key: &str) -> Option<CachedResult> {
        let mut store = self.store.lock();
        let cached = store.entries.get(key).cloned();
        match cached {
            Some(result) => {
                store.hits += 1;
                if self.config.eviction == EvictionPolicy::RefreshOnHit {
                    store.touch(key);
                }
                Some(result)
            }
            None => {
                store.misses += 1;
                None
            }
        }
    }
}

impl std::fmt::Debug for CachingDecorator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingDecorator")
            .field("name", &self.name)
            .field("inner", &self.inner)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Processor for CachingDecorator {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<Step, ProcessorError> {
        let key = self.cache_key(&ctx.item);

        if let Some(cached) = self.lookup(&key) {
            let mut item = cached.item;
            item.id.clone_from(&ctx.item.id);
            item.timestamp = ctx.item.timestamp;
            item.add_metadata(Self::METADATA_KEY, serde_json::Value::Bool(true));
            ctx.item = item;
            tracing::trace!(processor = %self.inner.name(), key = %key, "Cache hit");
            return Ok(cached.step);
        }

        // The lock is not held while the wrapped processor runs.
        let step = self.inner.process(ctx)?;
        self.store.lock().insert(
            key,
            CachedResult {
                item: ctx.item.clone(),
                step: step.clone(),
            },
            self.config.capacity,
        );
        ctx.item
            .add_metadata(Self::METADATA_KEY, serde_json::Value::Bool(false));
        Ok(step)
    }
}
