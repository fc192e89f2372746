// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::sync::{ApiError, TransportError};

/// All possible errors that can occur in the orbsync library.
///
/// Internal operations return these; the sync driver turns them into log
/// records through [`discard`] so nothing escapes to UI callers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("credential store error: {0}")]
    Credential(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("fallback api error: {0}")]
    Api(#[from] ApiError),

    #[error("not connected")]
    NotConnected,

    #[error("no auth credential stored\n  hint: run 'orb-sync login --token <TOKEN>' first")]
    MissingCredential,

    #[error("sync driver stopped")]
    DriverStopped,

    #[error("protocol error: {0}")]
    Protocol(#[from] orb_core::Error),
}

/// A specialized Result type for orbsync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Logs a failed operation and drops the error.
///
/// Dropped sends are expected while offline, so they are logged at debug.
pub fn discard<T>(context: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(Error::NotConnected) => {
            tracing::debug!("{}: not connected, dropped", context);
            None
        }
        Err(e) => {
            tracing::warn!("{}: {}", context, e);
            None
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
