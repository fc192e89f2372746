// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! orbsync - real-time sync client for a family's shared orb.
//!
//! A [`SyncClient`](sync::SyncClient) keeps one member's view of the shared
//! orb in step with the rest of the family. It talks over a WebSocket
//! channel when it can and polls the REST API while it cannot.
//!
//! # Main Components
//!
//! - [`sync`] - connection manager, fallback poller, dispatcher and coordinator
//! - [`Config`] - TOML client configuration
//! - [`credentials`] - where the bearer token comes from
//! - [`Error`] - error types for all operations
//!
//! ```rust,ignore
//! use orbsync::credentials::MemoryCredentialStore;
//! use orbsync::sync::SyncClient;
//! use orbsync::Config;
//!
//! let store = Arc::new(MemoryCredentialStore::with_token("abc"));
//! let client = SyncClient::from_config(&Config::default(), store)?;
//! client.subscribe(|event| println!("{:?}", event));
//! client.connect("family_123");
//! client.push_state(4200.0, Some("grid"));
//! ```

mod cli;
mod commands;

pub mod config;
pub mod credentials;
pub mod env;
pub mod error;
pub mod logging;
pub mod sync;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{Error, Result};

/// Runs one CLI command to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let config = || commands::load_config(cli.config.as_deref());
    match cli.command {
        Command::Login { token } => commands::login(&token),
        Command::Logout => commands::logout(),
        Command::Watch { group } => commands::watch(&config()?, &group).await,
        Command::Push {
            group,
            value,
            view_mode,
        } => commands::push(&config()?, &group, value, view_mode.as_deref()).await,
        Command::Gesture { group, name } => commands::gesture(&config()?, &group, &name).await,
        Command::Status { group } => commands::status(&config()?, &group).await,
    }
}
