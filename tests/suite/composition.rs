//! Continuations, promise view and aggregates

use remoter_core::{Chained, Deferred, Handler, Thenable};
use remoter_types::{Realm, Setting, Settings};

use crate::common::registry;

type Probe = Deferred<i32, String>;

#[tokio::test]
async fn decorated_chain_keeps_tracking() {
    let deferred = Probe::new_in(&registry());
    let first = deferred
        .then(Handler::new(|v: i32| Ok(v + 1)))
        .into_deferred()
        .unwrap();
    let second = first.then(Handler::new(|v: i32| Ok(v * 10)));
    assert!(first.is_claimed());

    deferred.resolve(1);
    assert_eq!(second.await, Ok(20));
    assert_eq!(first.realm(), Some(Realm::Intrinsic));
}

#[tokio::test]
async fn registry_default_disables_decoration() {
    let registry = registry();
    registry.set_defaults(Settings {
        native_composition: Setting::Disabled,
        ..Settings::default()
    });
    let deferred = Probe::new_in(&registry);
    let chained = deferred.then(Handler::new(|v: i32| Ok(v)));
    assert!(matches!(chained, Chained::Native(_)));
    deferred.resolve(4);
    assert_eq!(chained.await, Ok(4));
}

#[tokio::test]
async fn instance_setting_overrides_registry_default() {
    let registry = registry();
    registry.update_defaults(|defaults| defaults.instance_argument = Setting::Disabled);
    let deferred = Probe::builder()
        .registry(&registry)
        .instance_argument(true)
        .build();
    let chained = deferred.then(Handler::arrow(|_: i32, instance: Option<&Probe>| {
        Ok(instance.is_some())
    }));
    deferred.resolve(0);
    assert_eq!(chained.await, Ok(true));
}

#[tokio::test]
async fn finally_argument_follows_registry_default() {
    let registry = registry();
    registry.update_defaults(|defaults| defaults.finally_argument = Setting::Disabled);
    let deferred = Probe::new_in(&registry);
    let received = deferred.finally(Handler::new(|outcome: Option<Result<i32, String>>| {
        if outcome.is_none() {
            Ok(())
        } else {
            Err("unexpected outcome".to_string())
        }
    }));
    deferred.resolve(1);
    assert_eq!(received.await, Ok(1));
}

#[tokio::test]
async fn promise_view_is_memoized_and_plain() {
    let deferred = Probe::new_in(&registry());
    let view = deferred.promise();
    assert!(view.ptr_eq(&deferred.promise()));

    deferred.resolve(6);
    assert_eq!(view.clone().await, Ok(6));

    let adopted = Probe::from_thenable_in(&registry(), view);
    assert_eq!(adopted.await, Ok(6));
    assert!(!deferred.fate().is_handled());
}

#[tokio::test]
async fn aggregates_accept_deferreds_and_futures() {
    let registry = registry();
    let a = Probe::new_in(&registry);
    let b = Probe::new_in(&registry);
    let all = Probe::all_in(
        &registry,
        [
            Thenable::from(a.clone()),
            b.clone().into(),
            Thenable::future(async { Ok(3) }),
        ],
    );
    a.resolve(1);
    b.resolve(2);
    assert_eq!(all.await, Ok(vec![1, 2, 3]));
    assert!(!a.is_claimed());
}

#[tokio::test]
async fn race_follows_the_first_deferred() {
    let registry = registry();
    let slow = Probe::new_in(&registry);
    let fast = Probe::new_in(&registry);
    let race = Probe::race_in(&registry, [slow.clone(), fast.clone()]);
    fast.reject("fast".to_string());
    assert_eq!(race.await, Err("fast".to_string()));
    assert!(slow.is_pending());
}
