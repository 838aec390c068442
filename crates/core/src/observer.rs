//! Explicit state-change notification.
//!
//! The cart adapter and the wizard controller never re-render anything
//! themselves. They announce each transition to the observers registered
//! here, and the presentation layer (logging, HTMX triggers, tests) decides
//! what to do with it.

use std::fmt;
use std::sync::Arc;

/// Receiver of state-change events.
pub trait Observer<E>: Send + Sync {
    /// Called synchronously after the state transition has been applied.
    fn notify(&self, event: &E);
}

impl<E, F> Observer<E> for F
where
    F: Fn(&E) + Send + Sync,
{
    fn notify(&self, event: &E) {
        self(event);
    }
}

/// An ordered list of observers for one event type.
pub struct Observers<E> {
    subscribers: Vec<Arc<dyn Observer<E>>>,
}

impl<E> Observers<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Register an observer; it receives every event emitted afterwards.
    pub fn subscribe(&mut self, observer: Arc<dyn Observer<E>>) {
        self.subscribers.push(observer);
    }

    /// Deliver an event to every observer in registration order.
    pub fn emit(&self, event: &E) {
        for subscriber in &self.subscribers {
            subscriber.notify(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Observers<E> {
    fn clone(&self) -> Self {
        Self {
            subscribers: self.subscribers.clone(),
        }
    }
}

impl<E> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Observer that records every event, for tests and diagnostics.
#[derive(Debug)]
pub struct Recorder<E> {
    events: std::sync::Mutex<Vec<E>>,
}

impl<E: Clone> Recorder<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of the events received so far.
    #[must_use]
    pub fn events(&self) -> Vec<E> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl<E: Clone> Default for Recorder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Send> Observer<E> for Recorder<E> {
    fn notify(&self, event: &E) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
