// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! REST payloads for the HTTP fallback path.
//!
//! Shapes follow the family sharing API:
//! - `POST /api/family/orb/sync` takes an [`OrbSyncRequest`] and answers an [`OrbSyncAck`]
//! - `GET /api/family/orb/events` lists recent [`RemoteEvent`]s, newest first
//! - `GET /api/family/group` returns a [`FamilyGroupSummary`] with the shared orb

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::SyncEvent;

/// Body of a state push.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrbSyncRequest {
    pub net_worth: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gesture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_mode: Option<String>,
}

/// Server acknowledgement of a state push.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrbSyncAck {
    pub success: bool,
    #[serde(default)]
    pub synced_at: Option<String>,
}

/// One entry of the recent events list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    /// `update` or `gesture`.
    #[serde(rename = "type")]
    pub event_type: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    /// ISO-8601, with or without offset.
    pub timestamp: String,
    #[serde(default)]
    pub data: Option<RemoteEventData>,
}

/// Payload recorded with a [`RemoteEvent`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEventData {
    #[serde(default)]
    pub net_worth: Option<f64>,
    #[serde(default)]
    pub gesture: Option<String>,
    #[serde(default)]
    pub view_mode: Option<String>,
}

/// The subset of the family group response the client reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FamilyGroupSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub shared_orb: SharedOrb,
}

/// Current shared orb state of a family group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SharedOrb {
    #[serde(default)]
    pub enabled: bool,
    pub net_worth: f64,
    #[serde(default)]
    pub last_synced: Option<String>,
}

impl OrbSyncRequest {
    /// Creates a plain state push.
    pub fn state(net_worth: f64, view_mode: Option<String>) -> Self {
        OrbSyncRequest {
            net_worth,
            gesture: None,
            view_mode,
        }
    }

    /// Creates a gesture push carrying the last known value.
    pub fn gesture(net_worth: f64, gesture: impl Into<String>) -> Self {
        OrbSyncRequest {
            net_worth,
            gesture: Some(gesture.into()),
            view_mode: None,
        }
    }
}

impl RemoteEvent {
    /// Parses the event timestamp.
    pub fn occurred_at(&self) -> Result<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Converts the stored event into the real-time event shape.
    ///
    /// Returns `None` for unknown types and for gestures without a name.
    pub fn to_sync_event(&self) -> Option<SyncEvent> {
        let data = self.data.clone().unwrap_or_default();
        match self.event_type.as_str() {
            "update" => Some(SyncEvent::state_sync(
                Some(self.user_id.clone()),
                data.net_worth,
                data.view_mode,
            )),
            "gesture" => data
                .gesture
                .map(|name| SyncEvent::gesture(self.user_id.clone(), name)),
            _ => None,
        }
    }
}

/// Parses an ISO-8601 timestamp; values without an offset are taken as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(s) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::InvalidTimestamp(s.to_string()))
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
