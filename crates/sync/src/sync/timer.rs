// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Restartable periodic timer driven from a select loop.

use std::time::Duration;

use tokio::time::Instant;

/// A periodic deadline that can be started and stopped at will.
///
/// Each `start` begins a fresh cycle; stopping a stopped timer is a no-op.
/// [`IntervalTimer::tick`] never resolves while the timer is stopped, so it
/// can sit in a `select!` unconditionally.
#[derive(Debug)]
pub struct IntervalTimer {
    period: Duration,
    next: Option<Instant>,
}

impl IntervalTimer {
    pub fn new(period: Duration) -> Self {
        IntervalTimer { period, next: None }
    }

    /// First tick after one full period.
    pub fn start(&mut self) {
        self.next = Some(Instant::now() + self.period);
    }

    /// First tick right away.
    pub fn start_immediate(&mut self) {
        self.next = Some(Instant::now());
    }

    pub fn stop(&mut self) {
        self.next = None;
    }

    pub fn is_active(&self) -> bool {
        self.next.is_some()
    }

    /// Waits for the next deadline and schedules the one after it.
    ///
    /// Cancel safe: dropping the future before it resolves leaves the
    /// schedule untouched.
    pub async fn tick(&mut self) {
        sleep_until(self.next).await;
        self.next = Some(Instant::now() + self.period);
    }
}

/// Sleeps until `deadline`, or forever when there is none.
pub async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
