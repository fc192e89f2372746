// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Log setup for the `orb-sync` binary.

use tracing_subscriber::EnvFilter;

use crate::env;

const DEFAULT_FILTER: &str = "info";
const VERBOSE_FILTER: &str = "debug";

/// Picks the filter directive: `RUST_LOG`, then `ORB_SYNC_LOG`, then
/// `--verbose`, then `info`. Empty variables count as unset.
pub fn filter_directive(rust_log: Option<&str>, orb_log: Option<&str>, verbose: bool) -> String {
    let from_env = [rust_log, orb_log]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|directive| !directive.is_empty());
    match from_env {
        Some(directive) => directive.to_string(),
        None if verbose => VERBOSE_FILTER.to_string(),
        None => DEFAULT_FILTER.to_string(),
    }
}

/// Installs the global subscriber, writing to stderr.
pub fn init(verbose: bool) {
    let directive = filter_directive(
        env::rust_log().as_deref(),
        env::log_filter().as_deref(),
        verbose,
    );
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("warning: invalid log filter '{}': {}", directive, e);
        EnvFilter::new(DEFAULT_FILTER)
    });

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
