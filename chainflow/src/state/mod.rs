//! Pipeline-wide shared state.
//!
//! [`StateMap`] is the plain mapping stateful processors read and write. It
//! has no synchronization of its own and must not be shared between threads
//! directly. [`SharedState`] is the thread-safe variant every pipeline uses:
//! a single lock guards the whole map, `get`/`set` lock independently, and
//! [`SharedState::update`] runs a read-modify-write under one acquisition.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// The plain, unsynchronized state mapping.
pub type StateMap = HashMap<String, serde_json::Value>;

/// A deep copy of the state taken at one point in time.
pub type StateSnapshot = StateMap;

/// Handle to the mutable state shared by every context of one pipeline.
///
/// Cloning the handle yields another reference to the *same* map; use
/// [`SharedState::snapshot`] for a detached copy.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<StateMap>>,
}

impl SharedState {
    /// Creates a new, empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state seeded with initial values.
    #[must_use]
    pub fn from_map(map: StateMap) -> Self {
        Self {
            inner: Arc::new(Mutex::new(map)),
        }
    }

    /// Gets a copy of a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.lock().get(key).cloned()
    }

    /// Sets a value, overwriting any existing one.
    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.inner.lock().insert(key.into(), value);
    }

    /// Removes a value, returning it if present.
    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.lock().remove(key)
    }

    /// Checks if a key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.lock().contains_key(key)
    }

    /// Runs `f` against the map while holding the lock.
    ///
    /// Every read-then-write (counters, seen-sets, aggregations) must go
    /// through here so concurrent runs cannot interleave between the read
    /// and the write.
    pub fn update<R>(&self, f: impl FnOnce(&mut StateMap) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Returns a deep copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.lock().clone()
    }

    /// Replaces the contents with `snapshot`, keeping this instance's identity.
    pub fn restore(&self, snapshot: StateSnapshot) {
        *self.inner.lock() = snapshot;
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if the state is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns true if both handles point at the same map.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
