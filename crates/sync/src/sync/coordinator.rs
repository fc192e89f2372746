// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! UI-facing state coordination.
//!
//! Debounces state pushes, picks the path for each outbound message and
//! merges local and remote observations into an [`OrbView`].

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use orb_core::{OrbSyncRequest, Origin, SyncEvent, SyncMessage};

/// Accepts at most one call per window; calls inside the window are dropped.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Debouncer { window, last: None }
    }

    /// Returns whether a call at `now` is accepted.
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Which side changed the orb last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

/// Presentation state merged from local pushes and remote events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrbView {
    pub local_value: Option<f64>,
    pub remote_value: Option<f64>,
    pub view_mode: Option<String>,
    /// Member behind the last remote change, when known.
    pub remote_actor: Option<String>,
    pub last_side: Option<Side>,
}

impl OrbView {
    /// The most recently changed value.
    pub fn value(&self) -> Option<f64> {
        match self.last_side {
            Some(Side::Local) => self.local_value,
            Some(Side::Remote) => self.remote_value,
            None => None,
        }
    }

    fn record_local(&mut self, value: f64, view_mode: Option<String>) {
        self.local_value = Some(value);
        if view_mode.is_some() {
            self.view_mode = view_mode;
        }
        self.last_side = Some(Side::Local);
    }

    fn record_remote(&mut self, actor: Option<&str>, value: f64, view_mode: Option<&str>) {
        self.remote_value = Some(value);
        self.remote_actor = actor.map(str::to_string);
        if let Some(mode) = view_mode {
            self.view_mode = Some(mode.to_string());
        }
        self.last_side = Some(Side::Remote);
    }
}

/// Where an outbound message goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    RealTime(SyncMessage),
    Fallback(OrbSyncRequest),
}

/// Picks the path for `message`.
///
/// Connected means the real-time channel; otherwise the HTTP push, which
/// always carries a value, so a gesture borrows `last_value`.
pub fn route(connected: bool, message: SyncMessage, last_value: Option<f64>) -> Option<Route> {
    if connected {
        return Some(Route::RealTime(message));
    }
    match message {
        SyncMessage::StateUpdate {
            numeric_value,
            view_mode,
        } => Some(Route::Fallback(OrbSyncRequest::state(
            numeric_value,
            view_mode,
        ))),
        SyncMessage::Gesture { gesture_name } => match last_value {
            Some(value) => Some(Route::Fallback(OrbSyncRequest::gesture(
                value,
                gesture_name,
            ))),
            None => {
                debug!("dropping gesture '{}': no value to send with it", gesture_name);
                None
            }
        },
        SyncMessage::Heartbeat => None,
    }
}

/// Messages that replay a pending HTTP push over the real-time channel.
pub fn replay(request: OrbSyncRequest) -> Vec<SyncMessage> {
    let mut messages = vec![SyncMessage::state_update(
        request.net_worth,
        request.view_mode,
    )];
    if let Some(gesture) = request.gesture {
        messages.push(SyncMessage::gesture(gesture));
    }
    messages
}

/// Holds the local user's side of the sync state.
pub struct Coordinator {
    local_user: Option<String>,
    debouncer: Debouncer,
    view: watch::Sender<OrbView>,
}

impl Coordinator {
    pub fn new(local_user: Option<String>, debounce: Duration) -> (Self, watch::Receiver<OrbView>) {
        let (view, view_rx) = watch::channel(OrbView::default());
        let coordinator = Coordinator {
            local_user,
            debouncer: Debouncer::new(debounce),
            view,
        };
        (coordinator, view_rx)
    }

    pub fn local_user(&self) -> Option<&str> {
        self.local_user.as_deref()
    }

    pub fn view(&self) -> OrbView {
        self.view.borrow().clone()
    }

    /// Accepts a local state change, or drops it when debounced or not finite.
    pub fn push_state(
        &mut self,
        value: f64,
        view_mode: Option<String>,
        now: Instant,
        connected: bool,
    ) -> Option<Route> {
        if !value.is_finite() {
            debug!("dropping non-finite state value {}", value);
            return None;
        }
        if !self.debouncer.admit(now) {
            debug!("state push debounced");
            return None;
        }
        self.view
            .send_modify(|view| view.record_local(value, view_mode.clone()));
        route(connected, SyncMessage::state_update(value, view_mode), Some(value))
    }

    /// Gestures are never debounced.
    pub fn push_gesture(&mut self, name: &str, connected: bool) -> Option<Route> {
        let last_value = {
            let view = self.view.borrow();
            view.local_value.or(view.remote_value)
        };
        route(connected, SyncMessage::gesture(name), last_value)
    }

    /// Folds an inbound event into the view. Echoes of our own actions are ignored.
    pub fn observe(&mut self, event: &SyncEvent) {
        if event.origin(self.local_user()) == Origin::Local {
            debug!("ignoring echo of own {}", event.kind());
            return;
        }
        if let SyncEvent::StateSync {
            actor_id,
            numeric_value: Some(value),
            view_mode,
        } = event
        {
            let (actor, mode) = (actor_id.as_deref(), view_mode.as_deref());
            self.view
                .send_modify(|view| view.record_remote(actor, *value, mode));
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
