// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages for orb synchronization.
//!
//! The protocol is small:
//! - Client sends state updates, gestures and heartbeats
//! - Server pushes state syncs and gestures from family members, plus an
//!   `initial` marker when the channel opens
//!
//! Every payload is a JSON object tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Close code used for an intentional, client-initiated teardown.
///
/// Any other close code is treated as an unexpected closure.
pub const INTENTIONAL_CLOSE_CODE: u16 = 1000;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncMessage {
    /// The local orb value (and optionally the view mode) changed.
    StateUpdate {
        #[serde(rename = "netWorth")]
        numeric_value: f64,
        #[serde(rename = "viewMode", default, skip_serializing_if = "Option::is_none")]
        view_mode: Option<String>,
    },

    /// A discrete gesture performed on the orb.
    Gesture {
        #[serde(rename = "gesture")]
        gesture_name: String,
    },

    /// Liveness ping; carries no data.
    Heartbeat,
}

/// Events received from the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncEvent {
    /// Shared orb state changed.
    ///
    /// `actor_id` is absent when the server reports state without naming who
    /// changed it (for example a polled snapshot).
    StateSync {
        #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
        actor_id: Option<String>,
        #[serde(rename = "netWorth", default, skip_serializing_if = "Option::is_none")]
        numeric_value: Option<f64>,
        #[serde(rename = "viewMode", default, skip_serializing_if = "Option::is_none")]
        view_mode: Option<String>,
    },

    /// Another family member performed a gesture.
    Gesture {
        #[serde(rename = "userId")]
        actor_id: String,
        #[serde(rename = "gesture")]
        gesture_name: String,
    },

    /// Sent once by the server after the channel opens.
    Initial,
}

/// Where an event came from, relative to the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Echo of the current user's own action.
    Local,
    /// Another family member.
    Remote,
    /// No actor attached (server markers, polled snapshots).
    Server,
}

impl Origin {
    /// Only other members' actions should produce perceptible feedback.
    pub fn wants_feedback(self) -> bool {
        matches!(self, Origin::Remote)
    }
}

const EVENT_TYPES: &[&str] = &["stateSync", "gesture", "initial"];

/// Decodes a raw inbound payload into a [`SyncEvent`].
///
/// This is the single validating step between untyped wire data and the
/// rest of the client.
pub fn decode_event(raw: &str) -> Result<SyncEvent> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let object = value.as_object().ok_or(Error::NotAnObject)?;
    let tag = object
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(Error::MissingType)?;
    if !EVENT_TYPES.contains(&tag) {
        return Err(Error::UnknownType(tag.to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

impl SyncMessage {
    /// Creates a StateUpdate message.
    pub fn state_update(numeric_value: f64, view_mode: Option<String>) -> Self {
        SyncMessage::StateUpdate {
            numeric_value,
            view_mode,
        }
    }

    /// Creates a Gesture message.
    pub fn gesture(gesture_name: impl Into<String>) -> Self {
        SyncMessage::Gesture {
            gesture_name: gesture_name.into(),
        }
    }

    /// Creates a Heartbeat message.
    pub fn heartbeat() -> Self {
        SyncMessage::Heartbeat
    }

    /// Wire name of the message type.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::StateUpdate { .. } => "stateUpdate",
            SyncMessage::Gesture { .. } => "gesture",
            SyncMessage::Heartbeat => "heartbeat",
        }
    }

    /// Serializes the message to JSON.
    ///
    /// Non-finite values are rejected because JSON has no representation
    /// for them.
    pub fn to_json(&self) -> Result<String> {
        if let SyncMessage::StateUpdate { numeric_value, .. } = self {
            if !numeric_value.is_finite() {
                return Err(Error::NonFinite(*numeric_value));
            }
        }
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

impl SyncEvent {
    /// Creates a StateSync event.
    pub fn state_sync(
        actor_id: Option<String>,
        numeric_value: Option<f64>,
        view_mode: Option<String>,
    ) -> Self {
        SyncEvent::StateSync {
            actor_id,
            numeric_value,
            view_mode,
        }
    }

    /// Creates a Gesture event.
    pub fn gesture(actor_id: impl Into<String>, gesture_name: impl Into<String>) -> Self {
        SyncEvent::Gesture {
            actor_id: actor_id.into(),
            gesture_name: gesture_name.into(),
        }
    }

    /// Creates an Initial event.
    pub fn initial() -> Self {
        SyncEvent::Initial
    }

    /// Wire name of the event type.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::StateSync { .. } => "stateSync",
            SyncEvent::Gesture { .. } => "gesture",
            SyncEvent::Initial => "initial",
        }
    }

    /// The member who caused this event, if known.
    pub fn actor_id(&self) -> Option<&str> {
        match self {
            SyncEvent::StateSync { actor_id, .. } => actor_id.as_deref(),
            SyncEvent::Gesture { actor_id, .. } => Some(actor_id),
            SyncEvent::Initial => None,
        }
    }

    /// Classifies the event against the current user's id.
    pub fn origin(&self, local_actor: Option<&str>) -> Origin {
        match (self.actor_id(), local_actor) {
            (None, _) => Origin::Server,
            (Some(actor), Some(local)) if actor == local => Origin::Local,
            (Some(_), _) => Origin::Remote,
        }
    }

    /// Serializes the event to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
