//! Generated callback tests

use remoter_core::Deferred;
use remoter_types::{Realm, SignatureError, Token};
use serde_json::{Value, json};

use crate::common::registry;

fn probe() -> Deferred<Value, Value> {
    Deferred::new_in(&registry())
}

#[test]
fn every_valid_signature_settles_exactly_once() {
    let signatures: &[&[Token]] = &[
        &[Token::Error],
        &[Token::Result],
        &[Token::ErrorList],
        &[Token::ResultList],
        &[Token::Error, Token::Result],
        &[Token::Result, Token::Error],
        &[Token::Error, Token::ResultList],
        &[Token::Result, Token::ErrorList],
        &[Token::Skip, Token::Error, Token::Skip, Token::Result],
    ];
    let inputs = [
        vec![],
        vec![Value::Null],
        vec![json!("e"), json!("r")],
        vec![Value::Null, json!(0), json!(""), json!([1])],
    ];
    for tokens in signatures {
        for args in &inputs {
            let deferred = probe();
            let callback = deferred.custom_callback(tokens).unwrap();
            callback.call_with(args);
            assert!(deferred.is_settled(), "{tokens:?} with {args:?}");
            assert!(!deferred.is_oversaturated());
            assert_eq!(deferred.realm(), Some(Realm::Remote));
        }
    }
}

#[test]
fn invalid_signatures_are_rejected_up_front() {
    let deferred = probe();
    assert_eq!(
        deferred.custom_callback(&[]).unwrap_err(),
        SignatureError::Empty
    );
    assert_eq!(
        deferred
            .custom_callback(&[Token::Result, Token::Result])
            .unwrap_err(),
        SignatureError::Duplicate(Token::Result)
    );
    assert!(matches!(
        deferred.custom_callback(&[Token::ErrorList, Token::Result]),
        Err(SignatureError::ListNotLast { .. })
    ));
    assert!(matches!(
        deferred.custom_callback(&[Token::Result, Token::ResultList]),
        Err(SignatureError::Conflicting(..))
    ));
    assert!(deferred.is_pending());
}

#[tokio::test]
async fn error_list_rejects_with_all_errors() {
    let deferred = probe();
    deferred
        .custom_callback(&[Token::Result, Token::ErrorList])
        .unwrap()
        .call([json!("r"), json!("e1"), Value::Null]);
    assert_eq!(deferred.await, Err(json!(["e1", null])));
}

#[test]
fn memoized_callbacks_survive_clones_of_the_deferred() {
    let deferred = probe();
    let callback = deferred.callback();
    assert!(callback.ptr_eq(&deferred.clone().error_result_callback()));
    assert!(!callback.ptr_eq(&probe().callback()));
}
