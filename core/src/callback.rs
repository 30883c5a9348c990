//! Callbacks that settle a Deferred from a positional-argument API.

use std::fmt;
use std::sync::{Arc, OnceLock};

use remoter_types::{Argument, Realm, Signature, SignatureError, Token, Verdict};

use crate::Payload;
use crate::deferred::{Deferred, Request};

/// A generated callback bound to one Deferred.
///
/// Every invocation goes through the remote accessors, so a callback that
/// wins records [`Realm::Remote`]. Clones are the same callback.
pub struct SignatureCallback<V> {
    deferred: Deferred<V, V>,
    signature: Arc<Signature>,
}

impl<V: Payload + Argument> SignatureCallback<V> {
    pub fn call(&self, args: impl IntoIterator<Item = V>) {
        let args: Vec<V> = args.into_iter().collect();
        self.call_with(&args);
    }

    pub fn call_with(&self, args: &[V]) {
        let request = match self.signature.dispatch(args) {
            Verdict::Resolve(value) => Request::Resolve(value),
            Verdict::Reject(error) => Request::Reject(error),
        };
        self.deferred.request(Realm::Remote, request);
    }

    /// Turn into a plain closure for APIs that want `Fn(Vec<V>)`.
    pub fn into_fn(self) -> impl Fn(Vec<V>) + Send + Sync + 'static {
        move |args| self.call_with(&args)
    }

    #[must_use]
    pub fn signature(&self) -> Signature {
        *self.signature
    }

    /// Both handles are the same generated callback.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.signature, &other.signature)
    }
}

impl<V> Clone for SignatureCallback<V> {
    fn clone(&self) -> Self {
        Self {
            deferred: self.deferred.clone(),
            signature: Arc::clone(&self.signature),
        }
    }
}

impl<V> fmt::Debug for SignatureCallback<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureCallback")
            .field("deferred", &self.deferred.inner.id)
            .field("signature", &self.signature)
            .finish()
    }
}

impl<V: Payload + Argument> Deferred<V, V> {
    fn bound(
        &self,
        slot: &OnceLock<Arc<Signature>>,
        signature: Signature,
    ) -> SignatureCallback<V> {
        SignatureCallback {
            deferred: self.clone(),
            signature: Arc::clone(slot.get_or_init(|| Arc::new(signature))),
        }
    }

    /// `callback(error, result)`, created once per Deferred.
    #[must_use]
    pub fn error_result_callback(&self) -> SignatureCallback<V> {
        self.bound(&self.inner.error_result, Signature::ERROR_RESULT)
    }

    /// `callback(result, error)`, created once per Deferred.
    #[must_use]
    pub fn result_error_callback(&self) -> SignatureCallback<V> {
        self.bound(&self.inner.result_error, Signature::RESULT_ERROR)
    }

    /// Alias of [`Deferred::error_result_callback`].
    #[must_use]
    pub fn callback(&self) -> SignatureCallback<V> {
        self.error_result_callback()
    }

    /// A fresh callback for an arbitrary signature. Never memoized.
    pub fn custom_callback(
        &self,
        tokens: &[Token],
    ) -> Result<SignatureCallback<V>, SignatureError> {
        let signature = Signature::parse(tokens)?;
        Ok(SignatureCallback {
            deferred: self.clone(),
            signature: Arc::new(signature),
        })
    }
}
