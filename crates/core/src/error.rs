// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for orb-core operations.

use thiserror::Error;

/// All possible errors that can occur while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no 'type' tag")]
    MissingType,

    #[error("unknown payload type: '{0}'")]
    UnknownType(String),

    #[error("non-finite value cannot be encoded: {0}")]
    NonFinite(f64),

    #[error("invalid timestamp: '{0}'")]
    InvalidTimestamp(String),
}

/// A specialized Result type for orb-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
