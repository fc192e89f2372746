// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP fallback used while the real-time channel is down.
//!
//! Every cycle pulls the shared orb state plus recent events and pushes the
//! pending local state, if any. Requests run on spawned tasks; their results
//! carry the generation they were issued under, and anything issued before
//! the last start/stop is discarded on arrival.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use orb_core::{FamilyGroupSummary, OrbSyncAck, OrbSyncRequest, RemoteEvent, SharedOrb, SyncEvent};

use super::connection::SharedConnectionState;
use super::timer::IntervalTimer;
use super::transport::BoxFuture;
use crate::credentials::{CredentialStore, AUTH_TOKEN_KEY};
use crate::error::{discard, Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for fallback API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("push not acknowledged")]
    Rejected,
}

/// Result type for fallback API calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Everything one pull returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PullResponse {
    pub shared: Option<SharedOrb>,
    /// Recent events, in server order (newest first).
    pub events: Vec<RemoteEvent>,
}

/// The HTTP endpoints the poller talks to.
pub trait FallbackApi: Send + Sync {
    /// Fetch the shared orb and the events newer than `since`.
    fn pull(
        &self,
        token: String,
        since: Option<DateTime<Utc>>,
    ) -> BoxFuture<'static, ApiResult<PullResponse>>;

    /// Publish local state.
    fn push(&self, token: String, request: OrbSyncRequest)
        -> BoxFuture<'static, ApiResult<OrbSyncAck>>;
}

/// [`FallbackApi`] over the family sharing REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpFallback {
    client: reqwest::Client,
    group_url: Url,
    events_url: Url,
    sync_url: Url,
}

impl HttpFallback {
    pub fn new(api_base_url: &str) -> Result<Self> {
        let mut base = Url::parse(api_base_url).map_err(|e| {
            Error::Config(format!("invalid api_base_url '{}': {}", api_base_url, e))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = |path: &str| {
            base.join(path)
                .map_err(|e| Error::Config(format!("invalid endpoint '{}': {}", path, e)))
        };
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ApiError::from)?;
        Ok(HttpFallback {
            client,
            group_url: endpoint("api/family/group")?,
            events_url: endpoint("api/family/orb/events")?,
            sync_url: endpoint("api/family/orb/sync")?,
        })
    }

    /// Events endpoint, with `since` as a naive UTC timestamp.
    pub fn events_url(&self, since: Option<DateTime<Utc>>) -> Url {
        let mut url = self.events_url.clone();
        if let Some(since) = since {
            let stamp = since.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
            url.query_pairs_mut().append_pair("since", &stamp);
        }
        url
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

impl FallbackApi for HttpFallback {
    fn pull(
        &self,
        token: String,
        since: Option<DateTime<Utc>>,
    ) -> BoxFuture<'static, ApiResult<PullResponse>> {
        let client = self.client.clone();
        let group_url = self.group_url.clone();
        let events_url = self.events_url(since);
        Box::pin(async move {
            let group: FamilyGroupSummary =
                read_json(client.get(group_url).bearer_auth(&token).send().await?).await?;
            let events: Vec<RemoteEvent> =
                read_json(client.get(events_url).bearer_auth(&token).send().await?).await?;
            Ok(PullResponse {
                shared: Some(group.shared_orb),
                events,
            })
        })
    }

    fn push(
        &self,
        token: String,
        request: OrbSyncRequest,
    ) -> BoxFuture<'static, ApiResult<OrbSyncAck>> {
        let client = self.client.clone();
        let sync_url = self.sync_url.clone();
        Box::pin(async move {
            let response = client
                .post(sync_url)
                .bearer_auth(&token)
                .json(&request)
                .send()
                .await?;
            read_json(response).await
        })
    }
}

/// Result of a spawned request.
pub enum Outcome {
    Pulled(ApiResult<PullResponse>),
    Pushed {
        request: OrbSyncRequest,
        result: ApiResult<OrbSyncAck>,
    },
}

/// Something the poller needs to react to.
pub enum PollWake {
    /// Time for a pull/push cycle.
    Cycle,
    /// A request finished.
    Finished { generation: u64, outcome: Outcome },
}

/// Periodic pull/push over HTTP.
pub struct FallbackPoller {
    api: Arc<dyn FallbackApi>,
    credentials: Arc<dyn CredentialStore>,
    shared: Arc<SharedConnectionState>,
    timer: IntervalTimer,
    /// Bumped on every start and stop.
    generation: u64,
    pull_in_flight: bool,
    push_in_flight: bool,
    /// Latest local state not yet acknowledged by the server.
    pending: Option<OrbSyncRequest>,
    /// Timestamp of the newest pulled event seen so far.
    watermark: Option<DateTime<Utc>>,
    /// Events already seen at exactly the watermark. The server filters
    /// `since` inclusively, so these come back on the next pull.
    at_watermark: Vec<RemoteEvent>,
    /// Whether the first pull has established the watermark.
    primed: bool,
    shared_value: Option<f64>,
    done_tx: mpsc::UnboundedSender<(u64, Outcome)>,
    done_rx: mpsc::UnboundedReceiver<(u64, Outcome)>,
}

impl FallbackPoller {
    pub fn new(
        api: Arc<dyn FallbackApi>,
        credentials: Arc<dyn CredentialStore>,
        shared: Arc<SharedConnectionState>,
        interval: Duration,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        FallbackPoller {
            api,
            credentials,
            shared,
            timer: IntervalTimer::new(interval),
            generation: 0,
            pull_in_flight: false,
            push_in_flight: false,
            pending: None,
            watermark: None,
            at_watermark: Vec::new(),
            primed: false,
            shared_value: None,
            done_tx,
            done_rx,
        }
    }

    pub fn is_active(&self) -> bool {
        self.timer.is_active()
    }

    pub fn pending(&self) -> Option<&OrbSyncRequest> {
        self.pending.as_ref()
    }

    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.watermark
    }

    /// Starts polling; the first cycle runs right away.
    pub fn start(&mut self) {
        if self.is_active() {
            return;
        }
        self.generation += 1;
        self.shared.set_synced(false);
        self.timer.start_immediate();
        info!("fallback polling started");
    }

    /// Stops polling and orphans every request in flight.
    pub fn stop(&mut self) {
        if !self.is_active() {
            return;
        }
        self.timer.stop();
        self.generation += 1;
        self.pull_in_flight = false;
        self.push_in_flight = false;
        info!("fallback polling stopped");
    }

    /// Stops polling and forgets everything learned in the session: the
    /// pending push, the event watermark and the last shared value.
    pub fn reset(&mut self) {
        self.stop();
        self.pending = None;
        self.watermark = None;
        self.at_watermark.clear();
        self.primed = false;
        self.shared_value = None;
        self.shared.set_synced(false);
    }

    /// Records local state for the HTTP path (last write wins) and pushes it
    /// now if polling is running.
    pub fn queue_push(&mut self, request: OrbSyncRequest) {
        self.pending = Some(request);
        if self.is_active() {
            if let Some(token) = self.token() {
                self.push_pending(token);
            }
        }
    }

    /// Hands the pending state to another path.
    pub fn take_pending(&mut self) -> Option<OrbSyncRequest> {
        self.pending.take()
    }

    /// Waits for the next cycle or request result. Cancel safe.
    pub async fn wait(&mut self) -> PollWake {
        let FallbackPoller { timer, done_rx, .. } = self;
        tokio::select! {
            () = timer.tick() => PollWake::Cycle,
            Some((generation, outcome)) = done_rx.recv() => PollWake::Finished { generation, outcome },
        }
    }

    /// Applies a wake-up and returns the events to dispatch, oldest first.
    pub fn handle(&mut self, wake: PollWake) -> Vec<SyncEvent> {
        match wake {
            PollWake::Cycle => {
                self.cycle();
                Vec::new()
            }
            PollWake::Finished { generation, .. } if generation != self.generation => {
                debug!("discarding fallback result issued before polling stopped");
                Vec::new()
            }
            PollWake::Finished { outcome, .. } => self.finish(outcome),
        }
    }

    fn cycle(&mut self) {
        let Some(token) = self.token() else {
            self.shared.set_synced(false);
            return;
        };
        if self.pull_in_flight {
            debug!("previous pull still in flight");
        } else {
            self.pull_in_flight = true;
            self.shared.set_synced(false);
            let request = self.api.pull(token.clone(), self.watermark);
            self.spawn(async move { Outcome::Pulled(request.await) });
        }
        self.push_pending(token);
    }

    fn push_pending(&mut self, token: String) {
        if self.push_in_flight {
            return;
        }
        let Some(request) = self.pending.clone() else {
            return;
        };
        self.push_in_flight = true;
        let call = self.api.push(token, request.clone());
        self.spawn(async move {
            let result = call.await;
            Outcome::Pushed { request, result }
        });
    }

    fn spawn<F>(&self, request: F)
    where
        F: std::future::Future<Output = Outcome> + Send + 'static,
    {
        let generation = self.generation;
        let done = self.done_tx.clone();
        tokio::spawn(async move {
            let outcome = request.await;
            let _ = done.send((generation, outcome));
        });
    }

    fn finish(&mut self, outcome: Outcome) -> Vec<SyncEvent> {
        match outcome {
            Outcome::Pulled(Ok(response)) => {
                self.pull_in_flight = false;
                self.shared.set_synced(true);
                self.absorb(response)
            }
            Outcome::Pulled(Err(e)) => {
                self.pull_in_flight = false;
                self.shared.set_synced(false);
                warn!("fallback pull failed: {}", e);
                Vec::new()
            }
            Outcome::Pushed { request, result } => {
                self.push_in_flight = false;
                let acked = result.and_then(|ack| {
                    if ack.success {
                        Ok(ack)
                    } else {
                        Err(ApiError::Rejected)
                    }
                });
                if let Some(ack) = discard("fallback push", acked.map_err(Error::from)) {
                    debug!("fallback push acknowledged at {:?}", ack.synced_at);
                    if self.pending.as_ref() == Some(&request) {
                        self.pending = None;
                    } else if let Some(token) = self.token() {
                        // Superseded while in flight
                        self.push_pending(token);
                    }
                }
                Vec::new()
            }
        }
    }

    fn absorb(&mut self, response: PullResponse) -> Vec<SyncEvent> {
        let mut events = Vec::new();

        if let Some(orb) = response.shared.filter(|orb| orb.enabled) {
            if self.shared_value != Some(orb.net_worth) {
                self.shared_value = Some(orb.net_worth);
                events.push(SyncEvent::state_sync(None, Some(orb.net_worth), None));
            }
        }

        let watermark = self.watermark;
        let seen = &self.at_watermark;
        let mut fresh: Vec<(DateTime<Utc>, RemoteEvent)> = response
            .events
            .into_iter()
            .filter_map(|event| match event.occurred_at() {
                Ok(at) => Some((at, event)),
                Err(e) => {
                    debug!("skipping pulled event: {}", e);
                    None
                }
            })
            .filter(|(at, event)| match watermark {
                None => true,
                Some(mark) => *at > mark || (*at == mark && !seen.contains(event)),
            })
            .collect();
        fresh.sort_by_key(|(at, _)| *at);

        if let Some(latest) = fresh.last().map(|(at, _)| *at) {
            if self.watermark != Some(latest) {
                self.watermark = Some(latest);
                self.at_watermark.clear();
            }
            self.at_watermark.extend(
                fresh
                    .iter()
                    .filter(|(at, _)| *at == latest)
                    .map(|(_, event)| event.clone()),
            );
        }
        if !self.primed {
            // History from before this client started is not replayed
            self.primed = true;
            return events;
        }
        events.extend(fresh.iter().filter_map(|(_, event)| event.to_sync_event()));
        events
    }

    fn token(&self) -> Option<String> {
        let token = discard("read credential", self.credentials.get(AUTH_TOKEN_KEY)).flatten();
        if token.is_none() {
            debug!("no auth credential; skipping fallback request");
        }
        token
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
