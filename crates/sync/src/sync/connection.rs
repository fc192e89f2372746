// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Real-time connection management.
//!
//! [`ConnectionManager`] owns the single live transport, the heartbeat timer
//! and the reconnection policy. It never blocks the driver loop: handshakes
//! run on spawned tasks and come back through a channel, tagged with a
//! generation so results of abandoned attempts can be recognized.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use orb_core::SyncMessage;

use super::timer::{sleep_until, IntervalTimer};
use super::transport::{CloseReason, Connector, Inbound, Transport, TransportError, TransportResult};
use crate::credentials::{CredentialStore, AUTH_TOKEN_KEY};
use crate::error::{discard, Error, Result};

/// Connection state values for atomic state field.
const STATE_DISCONNECTED: u8 = 0;
const STATE_CONNECTING: u8 = 1;
const STATE_CONNECTED: u8 = 2;

/// Lifecycle of the real-time channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            STATE_CONNECTING => ConnectionState::Connecting,
            STATE_CONNECTED => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => STATE_DISCONNECTED,
            ConnectionState::Connecting => STATE_CONNECTING,
            ConnectionState::Connected => STATE_CONNECTED,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Status shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncIndicator {
    /// The real-time channel is open.
    RealTime,
    /// Falling back to polling and the last pull has not succeeded yet.
    Syncing,
    /// Falling back to polling and the last pull succeeded.
    Synced,
}

impl std::fmt::Display for SyncIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SyncIndicator::RealTime => "Real-time",
            SyncIndicator::Syncing => "Syncing…",
            SyncIndicator::Synced => "Synced",
        };
        f.write_str(label)
    }
}

/// Connection state visible to both the driver task and client handles.
///
/// Uses atomic fields for lock-free reads from UI callers.
pub struct SharedConnectionState {
    /// Current state (atomic for lock-free reads).
    state: AtomicU8,
    /// Reconnect attempt count (for status reporting).
    attempt: AtomicU32,
    /// Whether the most recent fallback pull succeeded.
    synced: AtomicBool,
}

impl SharedConnectionState {
    /// Create a new shared state initialized to disconnected.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(STATE_DISCONNECTED),
            attempt: AtomicU32::new(0),
            synced: AtomicBool::new(false),
        }
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: ConnectionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Acquire)
    }

    pub(crate) fn set_attempt(&self, attempt: u32) {
        self.attempt.store(attempt, Ordering::Release);
    }

    pub(crate) fn set_synced(&self, synced: bool) {
        self.synced.store(synced, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    pub fn indicator(&self) -> SyncIndicator {
        if self.is_connected() {
            SyncIndicator::RealTime
        } else if self.synced.load(Ordering::Acquire) {
            SyncIndicator::Synced
        } else {
            SyncIndicator::Syncing
        }
    }

    /// Get a human-readable status string.
    pub fn status_string(&self) -> String {
        match self.get() {
            ConnectionState::Connecting => {
                let attempt = self.attempt();
                if attempt > 0 {
                    format!("connecting (attempt {})", attempt)
                } else {
                    "connecting".to_string()
                }
            }
            state => state.to_string(),
        }
    }
}

impl Default for SharedConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Exponential backoff with an attempt ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Outcome of asking for a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Scheduled { attempt: u32, delay: Duration },
    AlreadyPending,
    GaveUp,
}

/// Retry bookkeeping between unexpected closures.
#[derive(Debug, Default)]
pub struct ReconnectState {
    attempt_count: u32,
    pending: Option<Instant>,
}

impl ReconnectState {
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Deadline of the scheduled retry, if any.
    pub fn pending(&self) -> Option<Instant> {
        self.pending
    }

    pub fn reset(&mut self) {
        self.attempt_count = 0;
        self.pending = None;
    }

    /// Schedules the next retry unless one is pending or the ceiling is reached.
    pub fn schedule(&mut self, policy: &ReconnectPolicy, now: Instant) -> Schedule {
        if self.pending.is_some() {
            return Schedule::AlreadyPending;
        }
        if self.attempt_count >= policy.max_attempts {
            return Schedule::GaveUp;
        }
        self.attempt_count += 1;
        let delay = policy.delay_for(self.attempt_count);
        self.pending = Some(now + delay);
        Schedule::Scheduled {
            attempt: self.attempt_count,
            delay,
        }
    }

    /// Marks the pending retry as fired.
    fn fire(&mut self) {
        self.pending = None;
    }
}

/// Settings for the connection manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    /// Real-time endpoint without query parameters.
    pub ws_url: String,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

/// Something the manager needs to react to.
pub enum Wake<T> {
    /// A handshake finished.
    Opened {
        generation: u64,
        result: TransportResult<T>,
    },
    /// The live transport produced a payload or closed.
    Inbound(Inbound),
    ReconnectDue,
    HeartbeatDue,
}

/// What the driver learns from [`ConnectionManager::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The channel just opened.
    Connected,
    /// A raw payload arrived.
    Payload(String),
}

type Opened<T> = (u64, TransportResult<T>);

/// Owns the real-time channel for one client.
pub struct ConnectionManager<C: Connector> {
    settings: ConnectionSettings,
    connector: C,
    credentials: Arc<dyn CredentialStore>,
    shared: Arc<SharedConnectionState>,
    group_id: Option<String>,
    link: Option<C::Transport>,
    reconnect: ReconnectState,
    heartbeat: IntervalTimer,
    /// Bumped on every connect and disconnect.
    generation: u64,
    opened_tx: mpsc::UnboundedSender<Opened<C::Transport>>,
    opened_rx: mpsc::UnboundedReceiver<Opened<C::Transport>>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(
        settings: ConnectionSettings,
        connector: C,
        credentials: Arc<dyn CredentialStore>,
        shared: Arc<SharedConnectionState>,
    ) -> Self {
        let (opened_tx, opened_rx) = mpsc::unbounded_channel();
        let heartbeat = IntervalTimer::new(settings.heartbeat_interval);
        ConnectionManager {
            settings,
            connector,
            credentials,
            shared,
            group_id: None,
            link: None,
            reconnect: ReconnectState::default(),
            heartbeat,
            generation: 0,
            opened_tx,
            opened_rx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.get()
    }

    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    pub fn attempt_count(&self) -> u32 {
        self.reconnect.attempt_count()
    }

    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect.pending()
    }

    pub fn heartbeat_active(&self) -> bool {
        self.heartbeat.is_active()
    }

    /// Starts a handshake for `group_id`.
    ///
    /// No-op while connecting or connected. Without a stored credential the
    /// manager stays disconnected and reports [`Error::MissingCredential`].
    pub fn connect(&mut self, group_id: &str) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Disconnected {
            debug!("connect ignored: already {}", state);
            return Ok(());
        }
        self.group_id = Some(group_id.to_string());

        let token = self
            .credentials
            .get(AUTH_TOKEN_KEY)?
            .ok_or(Error::MissingCredential)?;
        let url = realtime_url(&self.settings.ws_url, &token, group_id)?;

        self.generation += 1;
        let generation = self.generation;
        self.shared.set(ConnectionState::Connecting);
        info!(
            "connecting to {} for group {}",
            self.settings.ws_url, group_id
        );

        let handshake = self.connector.connect(url);
        let timeout = self.settings.connect_timeout;
        let opened = self.opened_tx.clone();
        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, handshake).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(timeout)),
            };
            let _ = opened.send((generation, result));
        });
        Ok(())
    }

    /// Sends over the live channel. Nothing is queued when disconnected.
    pub async fn send(&mut self, message: SyncMessage) -> Result<()> {
        if !self.shared.is_connected() {
            return Err(Error::NotConnected);
        }
        let link = self
            .link
            .as_mut()
            .filter(|link| link.is_connected())
            .ok_or(Error::NotConnected)?;
        let sent = link.send(message).await;
        match sent {
            Ok(()) => Ok(()),
            Err(e @ TransportError::SerializationError(_)) => Err(e.into()),
            Err(e) => {
                self.on_closed(CloseReason::abnormal(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Intentional teardown: cancels retries, stops the heartbeat and closes
    /// the channel with the normal close code.
    pub async fn disconnect(&mut self) {
        self.generation += 1;
        self.reconnect.reset();
        self.heartbeat.stop();
        self.group_id = None;
        if let Some(mut link) = self.link.take() {
            let closed = link.close(CloseReason::intentional()).await;
            discard("close real-time channel", closed.map_err(Error::from));
        }
        self.shared.set(ConnectionState::Disconnected);
        self.shared.set_attempt(0);
    }

    /// Waits for the next thing that needs handling.
    ///
    /// Cancel safe; pends forever when idle.
    pub async fn wait(&mut self) -> Wake<C::Transport> {
        let ConnectionManager {
            opened_rx,
            link,
            reconnect,
            heartbeat,
            ..
        } = self;
        tokio::select! {
            Some((generation, result)) = opened_rx.recv() => Wake::Opened { generation, result },
            inbound = recv_link(link) => Wake::Inbound(inbound),
            () = sleep_until(reconnect.pending()) => Wake::ReconnectDue,
            () = heartbeat.tick() => Wake::HeartbeatDue,
        }
    }

    /// Applies a wake-up to the state machine.
    pub async fn handle(&mut self, wake: Wake<C::Transport>) -> Option<Notice> {
        match wake {
            Wake::Opened { generation, result } => self.on_opened(generation, result).await,
            Wake::Inbound(Inbound::Text(raw)) => Some(Notice::Payload(raw)),
            Wake::Inbound(Inbound::Closed(reason)) => {
                self.on_closed(reason);
                None
            }
            Wake::ReconnectDue => {
                self.reconnect.fire();
                if let Some(group_id) = self.group_id.clone() {
                    info!(
                        "reconnecting (attempt {})",
                        self.reconnect.attempt_count()
                    );
                    discard("reconnect", self.connect(&group_id));
                }
                None
            }
            Wake::HeartbeatDue => {
                discard("heartbeat", self.send(SyncMessage::heartbeat()).await);
                None
            }
        }
    }

    async fn on_opened(
        &mut self,
        generation: u64,
        result: TransportResult<C::Transport>,
    ) -> Option<Notice> {
        if generation != self.generation {
            debug!("discarding stale handshake result");
            if let Ok(mut stale) = result {
                let closed = stale.close(CloseReason::intentional()).await;
                discard("close stale channel", closed.map_err(Error::from));
            }
            return None;
        }
        match result {
            Ok(link) => {
                self.link = Some(link);
                self.shared.set(ConnectionState::Connected);
                self.shared.set_attempt(0);
                self.reconnect.reset();
                self.heartbeat.start();
                info!("real-time channel open");
                Some(Notice::Connected)
            }
            Err(e) => {
                self.on_closed(CloseReason::abnormal(e.to_string()));
                None
            }
        }
    }

    fn on_closed(&mut self, reason: CloseReason) {
        self.link = None;
        self.heartbeat.stop();
        self.shared.set(ConnectionState::Disconnected);
        if reason.is_intentional() {
            info!("real-time channel closed: {}", reason);
            return;
        }
        warn!("real-time channel lost: {}", reason);
        if self.group_id.is_none() {
            return;
        }
        match self
            .reconnect
            .schedule(&self.settings.reconnect, Instant::now())
        {
            Schedule::Scheduled { attempt, delay } => {
                self.shared.set_attempt(attempt);
                info!("reconnect attempt {} in {:?}", attempt, delay);
            }
            Schedule::AlreadyPending => debug!("reconnect already scheduled"),
            Schedule::GaveUp => warn!(
                "giving up after {} reconnect attempts",
                self.reconnect.attempt_count()
            ),
        }
    }
}

async fn recv_link<T: Transport>(link: &mut Option<T>) -> Inbound {
    match link {
        Some(transport) => transport.recv().await,
        None => std::future::pending().await,
    }
}

/// Builds the real-time URL: `base?token=<token>&familyGroupId=<group>`.
pub fn realtime_url(base: &str, token: &str, group_id: &str) -> Result<String> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| Error::Config(format!("invalid ws_url '{}': {}", base, e)))?;
    url.query_pairs_mut()
        .append_pair("token", token)
        .append_pair("familyGroupId", group_id);
    Ok(url.into())
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
