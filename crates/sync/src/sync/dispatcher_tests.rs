// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use std::sync::atomic::AtomicUsize;
use yare::parameterized;

fn counter(dispatcher: &Arc<EventDispatcher>) -> (Subscription, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hits);
    let sub = dispatcher.subscribe(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (sub, hits)
}

#[test]
fn test_callbacks_run_in_registration_order() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..3 {
        let order = Arc::clone(&order);
        dispatcher.subscribe(move |_| order.lock().push(i));
    }

    assert_eq!(dispatcher.dispatch(&SyncEvent::initial()), 3);
    assert_eq!(*order.lock(), vec![0, 1, 2]);
}

#[test]
fn test_cancel_before_dispatch_never_invokes() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let (sub, hits) = counter(&dispatcher);
    sub.cancel();

    dispatcher.dispatch(&SyncEvent::initial());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(dispatcher.is_empty());
}

#[test]
fn test_cancel_is_idempotent() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let (first, _) = counter(&dispatcher);
    let (_second, second_hits) = counter(&dispatcher);

    first.cancel();
    first.cancel();
    assert!(!first.is_active());
    assert_eq!(dispatcher.len(), 1);

    dispatcher.dispatch(&SyncEvent::initial());
    assert_eq!(second_hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_dropping_subscription_keeps_callback() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let (sub, hits) = counter(&dispatcher);
    drop(sub);

    dispatcher.dispatch(&SyncEvent::initial());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cancel_from_inside_callback() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let hits = Arc::new(AtomicUsize::new(0));

    let sub = {
        let slot = Arc::clone(&slot);
        let hits = Arc::clone(&hits);
        dispatcher.subscribe(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = slot.lock().as_ref() {
                sub.cancel();
            }
        })
    };
    *slot.lock() = Some(sub);

    dispatcher.dispatch(&SyncEvent::initial());
    dispatcher.dispatch(&SyncEvent::initial());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(dispatcher.is_empty());
}

#[test]
fn test_callback_cancelling_a_later_one_skips_it() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    {
        let slot = Arc::clone(&slot);
        dispatcher.subscribe(move |_| {
            if let Some(sub) = slot.lock().as_ref() {
                sub.cancel();
            }
        });
    }
    let (later, later_hits) = counter(&dispatcher);
    *slot.lock() = Some(later);

    assert_eq!(dispatcher.dispatch(&SyncEvent::initial()), 1);
    assert_eq!(later_hits.load(Ordering::SeqCst), 0);
}

#[parameterized(
    first = { 0 },
    middle = { 2 },
    last = { 4 },
)]
fn test_panicking_subscriber_is_isolated(panicking: usize) {
    let dispatcher = Arc::new(EventDispatcher::new());
    let invoked = Arc::new(AtomicUsize::new(0));
    for i in 0..5 {
        let invoked = Arc::clone(&invoked);
        dispatcher.subscribe(move |_| {
            invoked.fetch_add(1, Ordering::SeqCst);
            if i == panicking {
                panic!("subscriber {} failed", i);
            }
        });
    }

    let delivered = dispatcher.dispatch(&SyncEvent::gesture("u1", "tap"));
    assert_eq!(invoked.load(Ordering::SeqCst), 5);
    assert_eq!(delivered, 4);
}

#[test]
fn test_decode_logged_drops_malformed() {
    assert_eq!(decode_logged("{not json"), None);
    assert_eq!(decode_logged(r#"{"type":"mystery"}"#), None);
    assert_eq!(
        decode_logged(r#"{"type":"gesture","userId":"7","gesture":"tap"}"#),
        Some(SyncEvent::gesture("7", "tap"))
    );
}

#[test]
fn test_clear_deactivates_subscriptions() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let (sub, hits) = counter(&dispatcher);

    dispatcher.clear();
    assert!(!sub.is_active());
    sub.cancel();

    dispatcher.dispatch(&SyncEvent::initial());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}
