//! Lifecycle tracing tests

use std::sync::{Arc, Mutex};

use remoter_core::{ClassEvent, ClassListener, Deferred, DeferredListener, Event, Handler, Listener};
use remoter_types::{EventKind, Topic};

use crate::common::{Counter, Recorder, registry};

type Probe = Deferred<i32, String>;

#[test]
fn tracer_exists_only_while_listened() {
    let deferred = Probe::new_in(&registry());
    assert!(!deferred.is_tracing());

    let listener: DeferredListener<i32, String> = Listener::new(|_| {});
    deferred.on(EventKind::Settled, listener.clone());
    deferred.on(Topic::All, listener.clone());
    assert!(deferred.is_tracing());

    deferred.off(EventKind::Settled, &listener);
    assert!(deferred.is_tracing());
    deferred.off(Topic::All, &listener);
    assert!(!deferred.is_tracing());
}

#[test]
fn off_topic_and_off_all() {
    let deferred = Probe::new_in(&registry());
    let hits = Counter::default();
    let counted = hits.clone();
    let listener: DeferredListener<i32, String> = Listener::new(move |_| counted.hit());
    deferred.on(EventKind::Resolved, listener.clone());
    deferred.on(EventKind::Fulfilled, listener.clone());
    deferred.off_topic(EventKind::Resolved);
    assert!(deferred.is_tracing());
    deferred.resolve(1);
    assert_eq!(hits.get(), 1);

    deferred.off_all();
    assert!(!deferred.is_tracing());
}

#[test]
fn wildcard_runs_before_named() {
    let deferred = Probe::new_in(&registry());
    let order = Arc::new(Mutex::new(Vec::new()));
    let named = Arc::clone(&order);
    deferred.on(
        EventKind::Fulfilled,
        Listener::new(move |_: &Event<i32, String>| named.lock().unwrap().push("named")),
    );
    let wildcard = Arc::clone(&order);
    deferred.on(
        Topic::All,
        Listener::new(move |event: &Event<i32, String>| {
            if event.kind() == EventKind::Fulfilled {
                wildcard.lock().unwrap().push("wildcard");
            }
        }),
    );
    deferred.resolve(1);
    assert_eq!(*order.lock().unwrap(), vec!["wildcard", "named"]);
}

#[test]
fn listener_can_read_the_deferred_it_observes() {
    let deferred = Probe::new_in(&registry());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    deferred.on(
        EventKind::Fulfilled,
        Listener::arrow(move |_: &Event<i32, String>, instance: &Probe| {
            sink.lock()
                .unwrap()
                .push((instance.is_fulfilled(), instance.outcome()));
        }),
    );
    deferred.resolve(3);
    assert_eq!(*seen.lock().unwrap(), vec![(true, Some(Ok(3)))]);
}

#[tokio::test]
async fn continuation_events_pair_attach_and_invocation() {
    let deferred = Probe::new_in(&registry());
    let recorder = Recorder::attach(&deferred);

    let then = deferred.then(Handler::new(|v: i32| Ok(v)));
    let caught = deferred.catch(Handler::new(|_: String| Ok(0)));
    let finally = deferred.finally(Handler::new(|_| Ok(())));
    deferred.resolve(2);
    assert_eq!(then.await, Ok(2));
    assert_eq!(caught.await, Ok(2));
    assert_eq!(finally.await, Ok(2));

    let kinds = recorder.kinds();
    assert_eq!(
        kinds,
        vec![
            EventKind::Then,
            EventKind::Catch,
            EventKind::Finally,
            EventKind::Resolved,
            EventKind::Settled,
            EventKind::Fulfilled,
            EventKind::Claimed,
            EventKind::Finalized,
        ]
    );
    assert_eq!(recorder.count(EventKind::Caught), 0);
}

#[test]
fn class_listeners_are_per_registry() {
    let first = registry();
    let second = registry();
    let hits = Counter::default();
    let counted = hits.clone();
    first.on(Topic::All, Listener::new(move |_: &ClassEvent| counted.hit()));

    let _a: Deferred<(), ()> = Deferred::new_in(&first);
    let _b: Deferred<(), ()> = Deferred::new_in(&second);
    assert_eq!(hits.get(), 1);
}

#[test]
fn registry_reset_drops_class_listeners() {
    let registry = registry();
    let hits = Counter::default();
    let counted = hits.clone();
    let listener: ClassListener = Listener::method(move |_, _| counted.hit());
    registry.on(EventKind::Create, listener);
    registry.reset();
    assert!(!registry.is_tracing());

    let _deferred: Deferred<(), ()> = Deferred::new_in(&registry);
    assert_eq!(hits.get(), 0);
}
