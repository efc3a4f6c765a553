//! Synchronous publish/subscribe of pipeline events.

use crate::core::PipelineEvent;
use crate::errors::ObserverError;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Receives pipeline events from an [`EventBus`].
pub trait Observer: Send + Sync {
    /// Handles one event.
    ///
    /// # Errors
    ///
    /// Any error is logged by the bus and otherwise ignored; it never
    /// reaches the publisher or other observers.
    fn on_event(&self, event: &PipelineEvent) -> Result<(), ObserverError>;
}

/// Fans events out to subscribed observers.
///
/// Delivery is synchronous and in subscription order. The observer list is
/// copied before delivery, so observers may subscribe or unsubscribe from
/// inside a handler, and the bus can be shared across threads.
#[derive(Default)]
pub struct EventBus {
    observers: RwLock<Vec<Arc<dyn Observer>>>,
}

impl EventBus {
    /// Creates a bus with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes an observer. Subscribing the same instance twice is a no-op.
    pub fn subscribe(&self, observer: Arc<dyn Observer>) {
        let mut observers = self.observers.write();
        if !observers.iter().any(|existing| Arc::ptr_eq(existing, &observer)) {
            observers.push(observer);
        }
    }

    /// Unsubscribes an observer. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, observer: &Arc<dyn Observer>) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|existing| !Arc::ptr_eq(existing, observer));
        observers.len() != before
    }

    /// Delivers `event` to every observer.
    pub fn publish(&self, event: &PipelineEvent) {
        let observers = self.observers.read().clone();
        for (index, observer) in observers.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| observer.on_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(
                        observer = index,
                        event_type = %event.event_type,
                        error = %err,
                        "Observer failed to handle event"
                    );
                }
                Err(panic) => {
                    warn!(
                        observer = index,
                        event_type = %event.event_type,
                        panic = %panic_message(panic.as_ref()),
                        "Observer panicked while handling event"
                    );
                }
            }
        }
    }

    /// Removes every observer.
    pub fn clear(&self) {
        self.observers.write().clear();
    }

    /// Returns the number of observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
