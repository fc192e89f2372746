// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

fn coordinator() -> (Coordinator, watch::Receiver<OrbView>) {
    Coordinator::new(Some("me".into()), Duration::from_secs(1))
}

#[parameterized(
    within_window = { 999, false },
    at_window = { 1_000, true },
    after_window = { 1_500, true },
)]
fn test_debouncer_window(gap_ms: u64, accepted: bool) {
    let mut debouncer = Debouncer::new(Duration::from_secs(1));
    let start = Instant::now();
    assert!(debouncer.admit(start));
    assert_eq!(
        debouncer.admit(start + Duration::from_millis(gap_ms)),
        accepted
    );
}

#[test]
fn test_debounced_call_does_not_extend_window() {
    let mut debouncer = Debouncer::new(Duration::from_secs(1));
    let start = Instant::now();
    assert!(debouncer.admit(start));
    assert!(!debouncer.admit(start + Duration::from_millis(600)));
    assert!(debouncer.admit(start + Duration::from_millis(1_000)));
}

#[test]
fn test_route_by_connection() {
    assert_eq!(
        route(true, SyncMessage::gesture("tap"), None),
        Some(Route::RealTime(SyncMessage::gesture("tap")))
    );
    assert_eq!(
        route(false, SyncMessage::state_update(3.0, Some("grid".into())), None),
        Some(Route::Fallback(OrbSyncRequest::state(3.0, Some("grid".into()))))
    );
    assert_eq!(
        route(false, SyncMessage::gesture("tap"), Some(8.0)),
        Some(Route::Fallback(OrbSyncRequest::gesture(8.0, "tap")))
    );
    assert_eq!(route(false, SyncMessage::gesture("tap"), None), None);
    assert_eq!(route(false, SyncMessage::heartbeat(), Some(1.0)), None);
}

#[test]
fn test_replay_pending_request() {
    assert_eq!(
        replay(OrbSyncRequest::state(4.0, None)),
        vec![SyncMessage::state_update(4.0, None)]
    );
    assert_eq!(
        replay(OrbSyncRequest::gesture(4.0, "pinch")),
        vec![
            SyncMessage::state_update(4.0, None),
            SyncMessage::gesture("pinch")
        ]
    );
}

#[test]
fn test_push_state_debounces_and_updates_view() {
    let (mut c, view) = coordinator();
    let start = Instant::now();

    let first = c.push_state(10.0, Some("orbit".into()), start, true);
    assert_eq!(
        first,
        Some(Route::RealTime(SyncMessage::state_update(
            10.0,
            Some("orbit".into())
        )))
    );
    assert_eq!(c.push_state(11.0, None, start + Duration::from_millis(500), true), None);

    let current = view.borrow().clone();
    assert_eq!(current.local_value, Some(10.0));
    assert_eq!(current.view_mode.as_deref(), Some("orbit"));
    assert_eq!(current.value(), Some(10.0));
}

#[parameterized(
    nan = { f64::NAN },
    infinity = { f64::INFINITY },
    negative_infinity = { f64::NEG_INFINITY },
)]
fn test_non_finite_values_are_dropped(value: f64) {
    let (mut c, _) = coordinator();
    let now = Instant::now();

    assert_eq!(c.push_state(value, None, now, true), None);
    // The window was not consumed
    assert!(c.push_state(1.0, None, now, true).is_some());
}

#[test]
fn test_gesture_fallback_borrows_last_value() {
    let (mut c, _) = coordinator();
    assert_eq!(c.push_gesture("tap", false), None);

    c.observe(&SyncEvent::state_sync(Some("mom".into()), Some(70.0), None));
    assert_eq!(
        c.push_gesture("tap", false),
        Some(Route::Fallback(OrbSyncRequest::gesture(70.0, "tap")))
    );

    c.push_state(80.0, None, Instant::now(), false);
    assert_eq!(
        c.push_gesture("tap", false),
        Some(Route::Fallback(OrbSyncRequest::gesture(80.0, "tap")))
    );
}

#[test]
fn test_observe_ignores_own_echo() {
    let (mut c, view) = coordinator();
    c.observe(&SyncEvent::state_sync(Some("me".into()), Some(5.0), None));
    assert_eq!(*view.borrow(), OrbView::default());
}

#[test]
fn test_view_follows_most_recent_side() {
    let (mut c, view) = coordinator();
    let start = Instant::now();

    c.push_state(10.0, None, start, true);
    c.observe(&SyncEvent::state_sync(
        Some("dad".into()),
        Some(20.0),
        Some("grid".into()),
    ));
    {
        let current = view.borrow();
        assert_eq!(current.value(), Some(20.0));
        assert_eq!(current.remote_actor.as_deref(), Some("dad"));
        assert_eq!(current.view_mode.as_deref(), Some("grid"));
        assert_eq!(current.last_side, Some(Side::Remote));
    }

    c.push_state(30.0, None, start + Duration::from_secs(2), true);
    assert_eq!(view.borrow().value(), Some(30.0));
    assert_eq!(view.borrow().remote_value, Some(20.0));
}

#[test]
fn test_snapshot_without_actor_is_remote() {
    let (mut c, _) = coordinator();
    c.observe(&SyncEvent::state_sync(None, Some(99.0), None));
    c.observe(&SyncEvent::gesture("dad", "tap"));
    c.observe(&SyncEvent::initial());

    let view = c.view();
    assert_eq!(view.remote_value, Some(99.0));
    assert_eq!(view.remote_actor, None);
}
