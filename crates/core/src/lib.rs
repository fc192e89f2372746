// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! orb-core: Wire contract for family orb synchronization
//!
//! This crate defines the real-time message types exchanged over the
//! WebSocket channel and the REST payloads used by the HTTP fallback path.
//! Untyped wire data is converted into these types at one boundary
//! ([`protocol::decode_event`]) before anything else touches it.

pub mod error;
pub mod http;
pub mod protocol;

pub use error::{Error, Result};
pub use http::{FamilyGroupSummary, OrbSyncAck, OrbSyncRequest, RemoteEvent, SharedOrb};
pub use protocol::{decode_event, Origin, SyncEvent, SyncMessage, INTENTIONAL_CLOSE_CODE};
