// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out of inbound events to subscriber callbacks.
//!
//! Callbacks run on the sync driver task, in registration order. A callback
//! that panics is caught and logged; the remaining callbacks still run.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use orb_core::{decode_event, SyncEvent};

type Callback = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

struct Entry {
    id: u64,
    active: Arc<AtomicBool>,
    callback: Callback,
}

/// Registry of subscriber callbacks.
#[derive(Default)]
pub struct EventDispatcher {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

/// Handle for one registered callback.
///
/// Dropping the handle does not unsubscribe; call [`Subscription::cancel`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    dispatcher: Weak<EventDispatcher>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for every subsequently dispatched event.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        self.entries.lock().push(Entry {
            id,
            active: Arc::clone(&active),
            callback: Arc::new(callback),
        });
        Subscription {
            id,
            active,
            dispatcher: Arc::downgrade(self),
        }
    }

    /// Delivers `event` to every active subscriber.
    ///
    /// Returns the number of callbacks that completed without panicking.
    pub fn dispatch(&self, event: &SyncEvent) -> usize {
        // Snapshot so callbacks may subscribe or cancel without deadlocking.
        let snapshot: Vec<(Arc<AtomicBool>, Callback)> = self
            .entries
            .lock()
            .iter()
            .map(|entry| (Arc::clone(&entry.active), Arc::clone(&entry.callback)))
            .collect();

        let mut delivered = 0;
        for (active, callback) in snapshot {
            // Cancelled by an earlier callback in this same dispatch
            if !active.load(Ordering::Acquire) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => delivered += 1,
                Err(payload) => error!(
                    "subscriber panicked on {} event: {}",
                    event.kind(),
                    panic_message(payload.as_ref())
                ),
            }
        }
        delivered
    }

    /// Removes every subscriber.
    pub fn clear(&self) {
        let removed: Vec<Entry> = self.entries.lock().drain(..).collect();
        for entry in &removed {
            entry.active.store(false, Ordering::Release);
        }
        if !removed.is_empty() {
            debug!("cleared {} subscribers", removed.len());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.entries.lock().retain(|entry| entry.id != id);
    }
}

impl Subscription {
    /// Unregisters the callback. Idempotent; safe to call from inside it.
    pub fn cancel(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(dispatcher) = self.dispatcher.upgrade() {
            dispatcher.remove(self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Decodes an inbound payload, logging and dropping it when malformed.
pub fn decode_logged(raw: &str) -> Option<SyncEvent> {
    match decode_event(raw) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("dropping inbound payload: {}", e);
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
