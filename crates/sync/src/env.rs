// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.

use std::path::PathBuf;

/// Environment variable names read by orb-sync.
pub mod vars {
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const ORB_SYNC_LOG: &str = "ORB_SYNC_LOG";
    pub const ORB_SYNC_CONFIG: &str = "ORB_SYNC_CONFIG";
    pub const ORB_SYNC_STATE_DIR: &str = "ORB_SYNC_STATE_DIR";
}

/// Returns the value of `RUST_LOG` if set.
pub fn rust_log() -> Option<String> {
    std::env::var(vars::RUST_LOG).ok()
}

/// Returns the value of `ORB_SYNC_LOG` if set.
pub fn log_filter() -> Option<String> {
    std::env::var(vars::ORB_SYNC_LOG).ok()
}

/// Returns the value of `ORB_SYNC_CONFIG` if set.
pub fn config_path() -> Option<PathBuf> {
    std::env::var(vars::ORB_SYNC_CONFIG).ok().map(PathBuf::from)
}

/// Returns the value of `ORB_SYNC_STATE_DIR` if set.
pub fn state_dir() -> Option<PathBuf> {
    std::env::var(vars::ORB_SYNC_STATE_DIR)
        .ok()
        .map(PathBuf::from)
}
