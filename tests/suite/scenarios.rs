//! End-to-end bridging scenarios

use std::sync::{Arc, Mutex};
use std::time::Duration;

use remoter_core::{ClassListener, Deferred, Handler, Listener};
use remoter_types::{EventKind, Realm, Token};
use serde_json::{Value, json};
use tokio::time;

use crate::common::{Counter, registry};

#[tokio::test]
async fn remote_resolve_reaches_then() {
    let deferred: Deferred<i32, String> = Deferred::new_in(&registry());
    deferred.resolve(42);
    let value = deferred.then(Handler::new(|v: i32| Ok(v))).await;
    assert_eq!(value, Ok(42));
    assert_eq!(deferred.realm(), Some(Realm::Remote));
}

#[tokio::test]
async fn initializer_resolution_is_intrinsic_inside_then() {
    let deferred: Deferred<i32, String> = Deferred::builder()
        .registry(&registry())
        .build_with(|resolver| {
            resolver.resolve(7);
            Ok(())
        });
    let observed = deferred
        .then(Handler::method(|instance: &Deferred<i32, String>, v: i32| {
            Ok((v, instance.realm()))
        }))
        .await;
    assert_eq!(observed, Ok((7, Some(Realm::Intrinsic))));
}

#[tokio::test]
async fn error_and_result_list_callback_collects_results() {
    let deferred: Deferred<Value, Value> = Deferred::new_in(&registry());
    let callback = deferred
        .custom_callback(&[Token::Error, Token::ResultList])
        .unwrap();
    callback.call([Value::Null, json!("x"), json!("y")]);
    assert_eq!(deferred.await, Ok(json!(["x", "y"])));
}

#[tokio::test]
async fn node_style_callback_settles_both_ways() {
    let ok: Deferred<Value, Value> = Deferred::new_in(&registry());
    ok.error_result_callback().call([Value::Null, json!("ok")]);
    assert_eq!(ok.clone().await, Ok(json!("ok")));
    assert!(ok.is_fulfilled());

    let failed: Deferred<Value, Value> = Deferred::new_in(&registry());
    failed
        .error_result_callback()
        .call([json!("boom"), json!("ok")]);
    assert_eq!(failed.clone().await, Err(json!("boom")));
    assert!(failed.is_rejected_remotely());
}

#[tokio::test]
async fn outer_following_pending_inner() {
    let registry = registry();
    let outer: Deferred<&'static str, String> = Deferred::new_in(&registry);
    let inner: Deferred<&'static str, String> = Deferred::new_in(&registry);

    outer.follow(inner.clone());
    assert!(outer.is_resolved());
    assert!(!outer.is_fulfilled());

    time::sleep(Duration::from_millis(5)).await;
    assert!(!outer.is_fulfilled());

    inner.resolve("inner value");
    assert_eq!(outer.clone().await, Ok("inner value"));
    assert!(outer.is_fulfilled());
}

#[test]
fn removed_class_listener_stays_silent() {
    let registry = registry();
    let kept = Counter::default();
    let removed = Counter::default();

    let kept_hits = kept.clone();
    let keep: ClassListener = Listener::new(move |_| kept_hits.hit());
    let removed_hits = removed.clone();
    let drop_me: ClassListener = Listener::new(move |_| removed_hits.hit());
    registry.on(EventKind::Create, keep);
    registry.on(EventKind::Create, drop_me.clone());
    registry.off(EventKind::Create, &drop_me);

    let _deferred: Deferred<(), ()> = Deferred::new_in(&registry);
    assert_eq!(kept.get(), 1);
    assert_eq!(removed.get(), 0);
}

#[tokio::test]
async fn parallel_flow_injects_the_value() {
    let deferred: Deferred<u32, String> = Deferred::new_in(&registry());
    let injector = deferred.clone();
    let log = Arc::new(Mutex::new(Vec::new()));
    let parallel_log = Arc::clone(&log);
    tokio::spawn(async move {
        time::sleep(Duration::from_millis(20)).await;
        parallel_log.lock().unwrap().push("inject");
        injector.resolve(21);
    });
    log.lock().unwrap().push("wait");
    let injected = deferred.clone().await.unwrap();
    assert_eq!(21 + injected, 42);
    assert_eq!(*log.lock().unwrap(), vec!["wait", "inject"]);
    assert!(deferred.is_fulfilled_remotely());
}
