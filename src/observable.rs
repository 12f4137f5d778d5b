//! Process-wide event registry.
//!
//! Loosely-coupled components signal each other through named events. The
//! main use is the [`STOP_EVENT`]: binaries hook Ctrl+C to
//! `observable().notify(STOP_EVENT)` and capture stages subscribe so the
//! pipeline drains cleanly instead of being torn down mid-frame.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

/// Event name used to request a clean pipeline shutdown.
pub const STOP_EVENT: &str = "stop";

type Callback = Box<dyn Fn() + Send + Sync>;

/// Handle returned by [`Observable::register`], used to unregister.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionId {
    event: String,
    id: u64,
}

#[derive(Default)]
pub struct Observable {
    events: Mutex<HashMap<String, Vec<(u64, Callback)>>>,
    next_id: AtomicU64,
}

impl Observable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event`.
    pub fn register(&self, event: &str, callback: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut events = self.events.lock().expect("observable lock poisoned");
        events
            .entry(event.to_string())
            .or_default()
            .push((id, Box::new(callback)));
        SubscriptionId {
            event: event.to_string(),
            id,
        }
    }

    pub fn unregister(&self, subscription: &SubscriptionId) {
        let mut events = self.events.lock().expect("observable lock poisoned");
        if let Some(callbacks) = events.get_mut(&subscription.event) {
            callbacks.retain(|(id, _)| *id != subscription.id);
        }
    }

    /// Invoke every callback registered for `event`.
    pub fn notify(&self, event: &str) {
        let events = self.events.lock().expect("observable lock poisoned");
        if let Some(callbacks) = events.get(event) {
            for (_, callback) in callbacks {
                callback();
            }
        }
    }
}

/// The shared process-wide registry.
pub fn observable() -> &'static Observable {
    static OBSERVABLE: OnceLock<Observable> = OnceLock::new();
    OBSERVABLE.get_or_init(Observable::new)
}
