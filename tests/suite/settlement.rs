//! Settlement state machine tests

use remoter_core::{Attempt, Deferred, Event, Resolution, ThenableKind};
use remoter_types::{DeferredError, EventKind, Realm, SettlementState};

use crate::common::{Recorder, registry};

#[test]
fn pending_has_no_realm() {
    let deferred: Deferred<i32, String> = Deferred::new_in(&registry());
    assert!(deferred.is_pending());
    assert!(!deferred.is_settled());
    assert_eq!(deferred.realm(), None);
    assert_eq!(deferred.outcome(), None);
}

#[test]
fn every_later_call_oversaturates_once() {
    let deferred: Deferred<i32, String> = Deferred::new_in(&registry());
    let recorder = Recorder::attach(&deferred);
    deferred.resolve(1);
    deferred.resolve(2);
    deferred.reject("three".to_string());

    assert_eq!(deferred.outcome(), Some(Ok(1)));
    assert!(deferred.is_oversaturated());
    assert_eq!(recorder.count(EventKind::Oversaturated), 2);
    assert_eq!(recorder.count(EventKind::Settled), 1);
    let attempts: Vec<_> = recorder
        .events()
        .into_iter()
        .filter(|event| event.kind() == EventKind::Oversaturated)
        .collect();
    assert_eq!(
        attempts,
        vec![
            Event::Oversaturated(Attempt::Resolve(2)),
            Event::Oversaturated(Attempt::Reject("three".to_string())),
        ]
    );
}

#[test]
fn intrinsic_call_after_remote_win_keeps_remote_realm() {
    let registry = registry();
    let mut kept = None;
    let deferred: Deferred<i32, String> =
        Deferred::builder().registry(&registry).build_with(|resolver| {
            kept = Some(resolver.clone());
            Ok(())
        });
    deferred.reject("remote".to_string());
    kept.unwrap().resolve(5);
    assert_eq!(deferred.realm(), Some(Realm::Remote));
    assert!(deferred.is_rejected_remotely());
    assert!(deferred.is_oversaturated());
}

#[test]
fn reject_reports_resolved_before_settling() {
    let deferred: Deferred<i32, String> = Deferred::new_in(&registry());
    let recorder = Recorder::attach(&deferred);
    deferred.reject("e".to_string());

    assert_eq!(
        recorder.events(),
        vec![
            Event::Resolved(Resolution::Error("e".to_string())),
            Event::Settled(Err("e".to_string())),
            Event::Rejected("e".to_string()),
        ]
    );
    assert!(!deferred.is_resolved());
    assert!(deferred.is_rejected_remotely());
}

#[tokio::test]
async fn fulfill_is_an_alias_of_resolve() {
    let deferred: Deferred<i32, String> = Deferred::new_in(&registry());
    deferred.fulfill(9);
    assert!(deferred.is_resolved());
    assert_eq!(deferred.await, Ok(9));
}

#[tokio::test]
async fn follow_events_then_adopted_outcome() {
    let registry = registry();
    let outer: Deferred<i32, String> = Deferred::new_in(&registry);
    let inner: Deferred<i32, String> = Deferred::new_in(&registry);
    let recorder = Recorder::attach(&outer);

    outer.follow(inner.clone());
    inner.reject("inner failed".to_string());
    assert_eq!(outer.clone().await, Err("inner failed".to_string()));

    let kind = ThenableKind::Deferred(inner.id());
    assert_eq!(
        recorder.events(),
        vec![
            Event::Follows(kind),
            Event::Resolved(Resolution::Thenable(kind)),
            Event::Settled(Err("inner failed".to_string())),
            Event::Rejected("inner failed".to_string()),
        ]
    );
    assert!(outer.is_resolved());
    assert!(outer.is_rejected());
}

#[tokio::test]
async fn reject_with_a_deferred_does_not_adopt_it() {
    let registry = registry();
    let inner: Deferred<i32, String> = Deferred::new_in(&registry);
    let outer: Deferred<i32, Deferred<i32, String>> = Deferred::new_in(&registry);

    outer.reject(inner.clone());
    assert_eq!(outer.state(), SettlementState::Rejected);
    assert!(inner.is_pending());

    let error = outer.await.unwrap_err();
    assert!(error.ptr_eq(&inner));
}

#[tokio::test]
async fn chaining_cycle_rejects() {
    let registry = registry();
    let a: Deferred<i32, String> = Deferred::new_in(&registry);
    let b: Deferred<i32, String> = Deferred::new_in(&registry);
    a.follow(b.clone());
    b.follow(a.clone());

    let expected = DeferredError::ChainingCycle(b.id()).to_string();
    assert_eq!(b.outcome(), Some(Err(expected.clone())));
    assert_eq!(a.await, Err(expected));
}

#[tokio::test]
async fn many_awaiters_see_one_outcome() {
    let deferred: Deferred<String, String> = Deferred::new_in(&registry());
    let waiters: Vec<_> = (0..4)
        .map(|_| tokio::spawn(deferred.clone()))
        .collect();
    deferred.resolve("shared".to_string());
    for waiter in waiters {
        assert_eq!(waiter.await.unwrap(), Ok("shared".to_string()));
    }
}
