// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync client handle and the driver task behind it.
//!
//! The driver owns the connection manager, the fallback poller and the
//! coordinator, and is the only place any of them is mutated. Handles talk
//! to it over a command channel; dropping the last handle ends the session.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info};

use orb_core::{OrbSyncRequest, SyncEvent};

use super::connection::{
    ConnectionManager, ConnectionState, Notice, SharedConnectionState, SyncIndicator,
};
use super::coordinator::{replay, Coordinator, OrbView, Route};
use super::dispatcher::{decode_logged, EventDispatcher, Subscription};
use super::poller::{FallbackApi, FallbackPoller, HttpFallback};
use super::transport::{Connector, WebSocketConnector};
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::error::{discard, Error, Result};

/// Commands sent from handles to the driver.
enum Command {
    Connect(String),
    PushState {
        value: f64,
        view_mode: Option<String>,
    },
    PushGesture(String),
    Disconnect(oneshot::Sender<()>),
    Inspect(oneshot::Sender<DriverSnapshot>),
}

/// Point-in-time view of the driver, for status output and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSnapshot {
    pub state: ConnectionState,
    pub group_id: Option<String>,
    pub in_session: bool,
    pub attempt_count: u32,
    pub reconnect_at: Option<Instant>,
    pub heartbeat_active: bool,
    pub polling: bool,
    pub pending_push: Option<OrbSyncRequest>,
    pub subscribers: usize,
}

/// Handle to a running sync client.
///
/// Cheap to clone. None of the methods fail: problems are logged and the
/// UI observes them through [`SyncClient::indicator`].
#[derive(Clone)]
pub struct SyncClient {
    commands: mpsc::UnboundedSender<Command>,
    dispatcher: Arc<EventDispatcher>,
    shared: Arc<SharedConnectionState>,
    view: watch::Receiver<OrbView>,
    local_user: Option<String>,
}

impl SyncClient {
    /// Builds a client and spawns its driver on the current tokio runtime.
    pub fn spawn<C: Connector>(
        config: &Config,
        connector: C,
        credentials: Arc<dyn CredentialStore>,
        api: Arc<dyn FallbackApi>,
    ) -> Self {
        let shared = Arc::new(SharedConnectionState::new());
        let dispatcher = Arc::new(EventDispatcher::new());
        let (coordinator, view) = Coordinator::new(config.user_id.clone(), config.debounce());
        let connection = ConnectionManager::new(
            config.connection_settings(),
            connector,
            Arc::clone(&credentials),
            Arc::clone(&shared),
        );
        let poller = FallbackPoller::new(
            api,
            credentials,
            Arc::clone(&shared),
            config.poll_interval(),
        );

        let (commands, command_rx) = mpsc::unbounded_channel();
        let driver = Driver {
            connection,
            poller,
            coordinator,
            dispatcher: Arc::clone(&dispatcher),
            in_session: false,
        };
        tokio::spawn(driver.run(command_rx));

        SyncClient {
            commands,
            dispatcher,
            shared,
            view,
            local_user: config.user_id.clone(),
        }
    }

    /// Client over WebSocket and the family sharing REST API.
    pub fn from_config(config: &Config, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let api = HttpFallback::new(&config.api_base_url)?;
        Ok(Self::spawn(
            config,
            WebSocketConnector,
            credentials,
            Arc::new(api),
        ))
    }

    /// Starts a session for `group_id`. No-op while connecting or connected.
    pub fn connect(&self, group_id: &str) {
        self.send(Command::Connect(group_id.to_string()));
    }

    /// Publishes local state; calls within the debounce window are dropped.
    pub fn push_state(&self, value: f64, view_mode: Option<&str>) {
        self.send(Command::PushState {
            value,
            view_mode: view_mode.map(str::to_string),
        });
    }

    pub fn push_gesture(&self, name: &str) {
        self.send(Command::PushGesture(name.to_string()));
    }

    /// Registers a callback for every inbound event.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.dispatcher.subscribe(callback)
    }

    /// Registers a callback for events caused by other members only.
    pub fn subscribe_feedback<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        let local_user = self.local_user.clone();
        self.dispatcher.subscribe(move |event| {
            if event.origin(local_user.as_deref()).wants_feedback() {
                callback(event);
            }
        })
    }

    /// Ends the session. Returns once every timer is stopped and all
    /// subscriptions are cleared.
    pub async fn disconnect(&self) {
        let (ack, done) = oneshot::channel();
        self.send(Command::Disconnect(ack));
        if done.await.is_err() {
            debug!("disconnect: sync driver already stopped");
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.get()
    }

    pub fn indicator(&self) -> SyncIndicator {
        self.shared.indicator()
    }

    pub fn status_string(&self) -> String {
        self.shared.status_string()
    }

    pub fn view(&self) -> OrbView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every view change.
    pub fn watch_view(&self) -> watch::Receiver<OrbView> {
        self.view.clone()
    }

    /// Snapshot of the driver; `None` once it has stopped.
    pub async fn inspect(&self) -> Option<DriverSnapshot> {
        let (reply, snapshot) = oneshot::channel();
        self.send(Command::Inspect(reply));
        snapshot.await.ok()
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            discard::<()>("sync command", Err(Error::DriverStopped));
        }
    }
}

struct Driver<C: Connector> {
    connection: ConnectionManager<C>,
    poller: FallbackPoller,
    coordinator: Coordinator,
    dispatcher: Arc<EventDispatcher>,
    in_session: bool,
}

impl<C: Connector> Driver<C> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => break,
                },
                wake = self.connection.wait() => {
                    let notice = self.connection.handle(wake).await;
                    self.on_notice(notice).await;
                }
                wake = self.poller.wait() => {
                    for event in self.poller.handle(wake) {
                        self.deliver(&event);
                    }
                }
            }
            self.reconcile();
        }
        self.end_session().await;
        debug!("sync driver stopped");
    }

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect(group_id) => {
                self.in_session = true;
                discard("connect", self.connection.connect(&group_id));
            }
            Command::PushState { value, view_mode } => {
                let connected = self.connected();
                let route = self
                    .coordinator
                    .push_state(value, view_mode, Instant::now(), connected);
                if let Some(route) = route {
                    self.deliver_route(route).await;
                }
            }
            Command::PushGesture(name) => {
                let connected = self.connected();
                if let Some(route) = self.coordinator.push_gesture(&name, connected) {
                    self.deliver_route(route).await;
                }
            }
            Command::Disconnect(ack) => {
                self.end_session().await;
                let _ = ack.send(());
            }
            Command::Inspect(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn on_notice(&mut self, notice: Option<Notice>) {
        match notice {
            Some(Notice::Connected) => {
                self.poller.stop();
                if let Some(request) = self.poller.take_pending() {
                    debug!("flushing pending state over the real-time channel");
                    for message in replay(request) {
                        discard("flush pending state", self.connection.send(message).await);
                    }
                }
            }
            Some(Notice::Payload(raw)) => {
                if let Some(event) = decode_logged(&raw) {
                    self.deliver(&event);
                }
            }
            None => {}
        }
    }

    async fn deliver_route(&mut self, route: Route) {
        match route {
            Route::RealTime(message) => {
                discard("send", self.connection.send(message).await);
            }
            Route::Fallback(request) => self.poller.queue_push(request),
        }
    }

    fn deliver(&mut self, event: &SyncEvent) {
        self.coordinator.observe(event);
        self.dispatcher.dispatch(event);
    }

    /// Polling runs exactly while a session is active and the channel is not open.
    fn reconcile(&mut self) {
        if !self.in_session {
            return;
        }
        if self.connected() {
            self.poller.stop();
        } else {
            self.poller.start();
        }
    }

    async fn end_session(&mut self) {
        self.in_session = false;
        self.connection.disconnect().await;
        self.poller.reset();
        self.dispatcher.clear();
        info!("sync session ended");
    }

    fn connected(&self) -> bool {
        self.connection.state() == ConnectionState::Connected
    }

    fn snapshot(&self) -> DriverSnapshot {
        DriverSnapshot {
            state: self.connection.state(),
            group_id: self.connection.group_id().map(str::to_string),
            in_session: self.in_session,
            attempt_count: self.connection.attempt_count(),
            reconnect_at: self.connection.reconnect_deadline(),
            heartbeat_active: self.connection.heartbeat_active(),
            polling: self.poller.is_active(),
            pending_push: self.poller.pending().cloned(),
            subscribers: self.dispatcher.len(),
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
