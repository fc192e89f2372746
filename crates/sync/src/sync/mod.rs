// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time family orb sync.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  commands   ┌──────────────────────────────────────┐
//! │ SyncClient  │────────────►│ Driver task                          │
//! │  (handle)   │             │  ┌──────────────┐  ┌──────────────┐  │     ┌─────────┐
//! └─────────────┘             │  │ Coordinator  │─►│ Connection   │──┼────►│ Backend │
//!        ▲                    │  │ (debounce,   │  │ Manager (WS) │◄─┼─────│         │
//!        │ callbacks          │  │  routing)    │  └──────────────┘  │     │         │
//! ┌─────────────┐             │  │              │  ┌──────────────┐  │     │         │
//! │ Dispatcher  │◄────────────┤  │              │─►│ Fallback     │──┼────►│  (HTTP) │
//! └─────────────┘             │  └──────────────┘  │ Poller       │◄─┼─────│         │
//!                             │                    └──────────────┘  │     └─────────┘
//!                             └──────────────────────────────────────┘
//! ```
//!
//! # Features
//!
//! - WebSocket primary channel with heartbeat
//! - Exponential-backoff reconnect with an attempt ceiling
//! - HTTP polling while the channel is down, never while it is up
//! - Debounced state pushes and local echo suppression
//! - Injectable connector and API traits for testing

mod client;
mod connection;
mod coordinator;
mod dispatcher;
mod poller;
mod timer;
mod transport;

pub use client::{DriverSnapshot, SyncClient};
pub use connection::{
    realtime_url, ConnectionManager, ConnectionSettings, ConnectionState, Notice,
    ReconnectPolicy, ReconnectState, SharedConnectionState, SyncIndicator,
};
pub use coordinator::{route, Coordinator, Debouncer, OrbView, Route, Side};
pub use dispatcher::{EventDispatcher, Subscription};
pub use poller::{ApiError, ApiResult, FallbackApi, FallbackPoller, HttpFallback, PullResponse};
pub use timer::IntervalTimer;
pub use transport::{
    BoxFuture, CloseReason, Connector, Inbound, Transport, TransportError, TransportResult,
    WebSocketConnector, WebSocketTransport,
};

#[cfg(test)]
mod test_helpers;
