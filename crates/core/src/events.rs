//! Local publish/subscribe hub
//!
//! Handlers are registered per event name and run synchronously, in
//! registration order, on the dispatching task. A handler that returns an
//! error or panics is logged and skipped; later handlers still run.
//! Dispatch works on a snapshot of the handler list, so handlers may
//! register or remove handlers without deadlocking.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, trace, warn};

/// Failure reported by an event handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Handle returned by [`EventDispatcher::on`], used to remove the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler-{}", self.0)
    }
}

pub type EventHandler = Arc<dyn Fn(&Value) -> Result<(), HandlerError> + Send + Sync>;

#[derive(Default)]
pub struct EventDispatcher {
    handlers: Mutex<HashMap<String, Vec<(HandlerId, EventHandler)>>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().entry(event.to_string()).or_default().push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler; returns whether it was registered for `event`.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let mut handlers = self.handlers.lock();
        let Some(list) = handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(event);
        }
        removed
    }

    /// Invoke every handler for `event`; returns how many succeeded.
    pub fn dispatch(&self, event: &str, payload: &Value) -> usize {
        let snapshot: Vec<(HandlerId, EventHandler)> = match self.handlers.lock().get(event) {
            Some(list) => list.clone(),
            None => {
                trace!(event, "no handlers registered");
                return 0;
            }
        };

        let mut delivered = 0;
        for (id, handler) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => warn!(event, handler = %id, error = %err, "event handler failed"),
                Err(_) => error!(event, handler = %id, "event handler panicked"),
            }
        }
        delivered
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.lock().get(event).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.lock();
        let mut events: Vec<&String> = handlers.keys().collect();
        events.sort();
        f.debug_struct("EventDispatcher").field("events", &events).finish()
    }
}
