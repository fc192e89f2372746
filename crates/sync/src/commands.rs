// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command handlers for the `orb-sync` binary.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use orb_core::SyncEvent;

use crate::config::{default_config_path, default_credentials_path, Config};
use crate::credentials::{CredentialStore, FileCredentialStore, AUTH_TOKEN_KEY};
use crate::error::{Error, Result};
use crate::sync::{ApiError, ConnectionState, SyncClient, SyncIndicator};

const POLL_STEP: Duration = Duration::from_millis(50);
/// Upper bound for an HTTP push to be acknowledged before exiting.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

fn credential_store() -> FileCredentialStore {
    FileCredentialStore::new(default_credentials_path())
}

pub fn login(token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::InvalidArgument("token must not be empty".into()));
    }
    let store = credential_store();
    store.set(AUTH_TOKEN_KEY, token)?;
    println!("Stored credential in {}", store.path().display());
    Ok(())
}

pub fn logout() -> Result<()> {
    let store = credential_store();
    if store.remove(AUTH_TOKEN_KEY)? {
        println!("Removed stored credential");
    } else {
        println!("No credential stored");
    }
    Ok(())
}

pub async fn watch(config: &Config, group: &str) -> Result<()> {
    let client = start(config, group)?;
    client.subscribe(|event| println!("{}", describe_event(event)));

    let mut view = client.watch_view();
    let mut indicator = client.indicator();
    println!("{}", indicator);
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let value = view.borrow_and_update().value();
                if let Some(value) = value {
                    println!("orb value: {}", value);
                }
            }
            _ = ticker.tick() => {
                let current = client.indicator();
                if current != indicator {
                    indicator = current;
                    println!("{}", indicator);
                }
            }
        }
    }

    client.disconnect().await;
    Ok(())
}

pub async fn push(
    config: &Config,
    group: &str,
    value: f64,
    view_mode: Option<&str>,
) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::InvalidArgument(format!(
            "value must be a finite number, got {}",
            value
        )));
    }
    let client = start(config, group)?;
    wait_for_channel(&client, config).await;
    client.push_state(value, view_mode);
    let flushed = flush(&client).await;
    let path = channel_name(&client);
    client.disconnect().await;
    if !flushed {
        return Err(ApiError::Rejected.into());
    }
    println!("Pushed {} over {}", value, path);
    Ok(())
}

pub async fn gesture(config: &Config, group: &str, name: &str) -> Result<()> {
    let client = start(config, group)?;
    wait_for_channel(&client, config).await;
    if client.state() != ConnectionState::Connected {
        // The HTTP path needs a value to carry the gesture
        wait_for_pull(&client).await;
    }
    client.push_gesture(name);
    let flushed = flush(&client).await;
    client.disconnect().await;
    if !flushed {
        warn!("gesture '{}' was not acknowledged", name);
    }
    println!("Sent gesture '{}'", name);
    Ok(())
}

pub async fn status(config: &Config, group: &str) -> Result<()> {
    let client = start(config, group)?;
    wait_for_channel(&client, config).await;
    if client.state() != ConnectionState::Connected {
        wait_for_pull(&client).await;
    }

    let snapshot = client.inspect().await.ok_or(Error::DriverStopped)?;
    let view = client.view();
    println!("group:      {}", group);
    println!("connection: {}", client.status_string());
    println!("indicator:  {}", client.indicator());
    println!("polling:    {}", snapshot.polling);
    if snapshot.attempt_count > 0 {
        println!("reconnects: {}", snapshot.attempt_count);
    }
    match view.value() {
        Some(value) => println!("orb value:  {}", value),
        None => println!("orb value:  unknown"),
    }
    if let Some(mode) = view.view_mode {
        println!("view mode:  {}", mode);
    }

    client.disconnect().await;
    Ok(())
}

/// One line per event for `watch` output.
pub fn describe_event(event: &SyncEvent) -> String {
    match event {
        SyncEvent::StateSync {
            actor_id,
            numeric_value,
            view_mode,
        } => {
            let actor = actor_id.as_deref().unwrap_or("someone");
            let mut line = format!("{} updated the orb", actor);
            if let Some(value) = numeric_value {
                line.push_str(&format!(" to {}", value));
            }
            if let Some(mode) = view_mode {
                line.push_str(&format!(" [{}]", mode));
            }
            line
        }
        SyncEvent::Gesture {
            actor_id,
            gesture_name,
        } => format!("{} sent gesture '{}'", actor_id, gesture_name),
        SyncEvent::Initial => "channel ready".to_string(),
    }
}

fn start(config: &Config, group: &str) -> Result<SyncClient> {
    let store = credential_store();
    if store.get(AUTH_TOKEN_KEY)?.is_none() {
        return Err(Error::MissingCredential);
    }
    let credentials: Arc<dyn CredentialStore> = Arc::new(store);
    let client = SyncClient::from_config(config, credentials)?;
    client.connect(group);
    Ok(client)
}

/// Waits until the real-time channel opens or the connect attempt is over.
async fn wait_for_channel(client: &SyncClient, config: &Config) {
    let deadline = Instant::now() + config.connection_settings().connect_timeout;
    // Let the driver see the connect command first
    sleep(POLL_STEP).await;
    while Instant::now() < deadline {
        match client.state() {
            ConnectionState::Connected => return,
            ConnectionState::Disconnected => {
                debug!("real-time channel unavailable; using HTTP");
                return;
            }
            ConnectionState::Connecting => sleep(POLL_STEP).await,
        }
    }
}

/// Waits for the first successful pull, bounded by [`FLUSH_TIMEOUT`].
async fn wait_for_pull(client: &SyncClient) {
    let deadline = Instant::now() + FLUSH_TIMEOUT;
    while Instant::now() < deadline {
        if client.indicator() == SyncIndicator::Synced {
            return;
        }
        sleep(POLL_STEP).await;
    }
}

/// Waits until no HTTP push is pending. Returns false on timeout.
async fn flush(client: &SyncClient) -> bool {
    let deadline = Instant::now() + FLUSH_TIMEOUT;
    while Instant::now() < deadline {
        match client.inspect().await {
            Some(snapshot) if snapshot.pending_push.is_none() => return true,
            Some(_) => sleep(POLL_STEP).await,
            None => return false,
        }
    }
    false
}

fn channel_name(client: &SyncClient) -> &'static str {
    match client.indicator() {
        SyncIndicator::RealTime => "real-time",
        _ => "http",
    }
}

/// Loads the config from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load(&default_config_path()),
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
