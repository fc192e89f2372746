// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use orb_core::{OrbSyncAck, OrbSyncRequest, SyncEvent, SyncMessage};

use super::poller::{ApiError, ApiResult, FallbackApi, PullResponse};
use super::transport::{
    BoxFuture, CloseReason, Connector, Inbound, Transport, TransportError, TransportResult,
};

/// Asserts that between `expected` and `expected + 5ms` have passed.
///
/// Paused tokio time rounds deadlines up to the millisecond.
pub fn assert_elapsed(since: Instant, expected: Duration) {
    let elapsed = since.elapsed();
    assert!(
        elapsed >= expected && elapsed <= expected + Duration::from_millis(5),
        "elapsed {:?}, expected {:?}",
        elapsed,
        expected
    );
}

/// Lets spawned tasks and the driver run until idle.
///
/// Advances paused time by one millisecond, so only timers already due fire.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// How the mock connector answers handshakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectMode {
    #[default]
    Accept,
    Refuse,
    /// Never completes; exercises the connect timeout.
    Hang,
}

#[derive(Default)]
struct ConnectorState {
    mode: ConnectMode,
    urls: Vec<String>,
    links: Vec<MockLink>,
}

/// Connector handing out in-memory transports.
#[derive(Clone, Default)]
pub struct MockConnector {
    inner: Arc<Mutex<ConnectorState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(&self, mode: ConnectMode) {
        self.inner.lock().mode = mode;
    }

    /// Number of handshakes attempted.
    pub fn attempts(&self) -> usize {
        self.inner.lock().urls.len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.inner.lock().urls.clone()
    }

    /// Server side of the most recent accepted connection.
    pub fn last_link(&self) -> MockLink {
        self.inner.lock().links.last().cloned().unwrap()
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn connect(&self, url: String) -> BoxFuture<'static, TransportResult<MockTransport>> {
        let mut state = self.inner.lock();
        state.urls.push(url);
        match state.mode {
            ConnectMode::Accept => {
                let (transport, link) = MockTransport::pair();
                state.links.push(link);
                Box::pin(async move { Ok(transport) })
            }
            ConnectMode::Refuse => Box::pin(async {
                Err(TransportError::ConnectionFailed("mock refused".into()))
            }),
            ConnectMode::Hang => Box::pin(std::future::pending()),
        }
    }
}

/// Server side of a mock connection.
#[derive(Clone)]
pub struct MockLink {
    inbound: mpsc::UnboundedSender<Inbound>,
    sent: Arc<Mutex<Vec<SyncMessage>>>,
    closed: Arc<Mutex<Option<CloseReason>>>,
}

impl MockLink {
    pub fn push_text(&self, raw: &str) {
        let _ = self.inbound.send(Inbound::Text(raw.to_string()));
    }

    pub fn push_event(&self, event: &SyncEvent) {
        self.push_text(&event.to_json().unwrap());
    }

    /// Server closes with `code`.
    pub fn close_with(&self, code: u16) {
        let _ = self.inbound.send(Inbound::Closed(CloseReason {
            code: Some(code),
            reason: "server close".into(),
        }));
    }

    /// Link drops without a close frame.
    pub fn drop_connection(&self) {
        let _ = self
            .inbound
            .send(Inbound::Closed(CloseReason::abnormal("connection reset")));
    }

    /// Messages the client sent.
    pub fn sent(&self) -> Vec<SyncMessage> {
        self.sent.lock().clone()
    }

    /// How the client closed the link, if it did.
    pub fn closed_with(&self) -> Option<CloseReason> {
        self.closed.lock().clone()
    }
}

/// Client side of a mock connection.
pub struct MockTransport {
    inbound: mpsc::UnboundedReceiver<Inbound>,
    sent: Arc<Mutex<Vec<SyncMessage>>>,
    closed: Arc<Mutex<Option<CloseReason>>>,
    connected: bool,
}

impl MockTransport {
    pub fn pair() -> (MockTransport, MockLink) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(None));
        let transport = MockTransport {
            inbound: rx,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
            connected: true,
        };
        let link = MockLink {
            inbound: tx,
            sent,
            closed,
        };
        (transport, link)
    }
}

impl Transport for MockTransport {
    fn send(&mut self, msg: SyncMessage) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            if !self.connected {
                return Err(TransportError::ConnectionClosed);
            }
            self.sent.lock().push(msg);
            Ok(())
        })
    }

    fn recv(&mut self) -> BoxFuture<'_, Inbound> {
        Box::pin(async move {
            match self.inbound.recv().await {
                Some(Inbound::Closed(reason)) => {
                    self.connected = false;
                    Inbound::Closed(reason)
                }
                Some(inbound) => inbound,
                None => Inbound::Closed(CloseReason::abnormal("mock link dropped")),
            }
        })
    }

    fn close(&mut self, reason: CloseReason) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            self.connected = false;
            *self.closed.lock() = Some(reason);
            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[derive(Default)]
struct ApiState {
    pulls: Vec<Option<DateTime<Utc>>>,
    pushes: Vec<OrbSyncRequest>,
    tokens: Vec<String>,
    responses: VecDeque<Result<PullResponse, u16>>,
    failing_pushes: u32,
    pull_delay: Duration,
}

/// Scripted fallback API.
///
/// Pulls answer from a queue of scripted responses, then with an empty
/// response. Errors are HTTP status codes.
#[derive(Default)]
pub struct MockApi {
    inner: Mutex<ApiState>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_pull(&self, response: Result<PullResponse, u16>) {
        self.inner.lock().responses.push_back(response);
    }

    pub fn fail_next_pushes(&self, count: u32) {
        self.inner.lock().failing_pushes = count;
    }

    pub fn set_pull_delay(&self, delay: Duration) {
        self.inner.lock().pull_delay = delay;
    }

    pub fn pull_count(&self) -> usize {
        self.inner.lock().pulls.len()
    }

    /// `since` values of every pull, in order.
    pub fn pull_watermarks(&self) -> Vec<Option<DateTime<Utc>>> {
        self.inner.lock().pulls.clone()
    }

    pub fn pushes(&self) -> Vec<OrbSyncRequest> {
        self.inner.lock().pushes.clone()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.inner.lock().tokens.clone()
    }
}

fn status_error(status: u16) -> ApiError {
    ApiError::Status {
        status,
        body: "scripted failure".into(),
    }
}

impl FallbackApi for MockApi {
    fn pull(
        &self,
        token: String,
        since: Option<DateTime<Utc>>,
    ) -> BoxFuture<'static, ApiResult<PullResponse>> {
        let mut state = self.inner.lock();
        state.pulls.push(since);
        state.tokens.push(token);
        let response = state.responses.pop_front().unwrap_or(Ok(PullResponse::default()));
        let delay = state.pull_delay;
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response.map_err(status_error)
        })
    }

    fn push(
        &self,
        token: String,
        request: OrbSyncRequest,
    ) -> BoxFuture<'static, ApiResult<OrbSyncAck>> {
        let mut state = self.inner.lock();
        state.tokens.push(token);
        state.pushes.push(request);
        let fail = state.failing_pushes > 0;
        if fail {
            state.failing_pushes -= 1;
        }
        Box::pin(async move {
            if fail {
                Err(status_error(503))
            } else {
                Ok(OrbSyncAck {
                    success: true,
                    synced_at: Some("2026-03-01T10:00:00".into()),
                })
            }
        })
    }
}
