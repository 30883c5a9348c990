//! Ready-made Deferreds and aggregates over several thenables.
//!
//! Every Deferred built here settles through the intrinsic side, so its
//! realm is [`Realm::Intrinsic`] unless outside code wins first.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};
use remoter_types::Realm;

use crate::Payload;
use crate::deferred::{Deferred, DeferredBuilder, Panicked, Request, Thenable};
use crate::registry::Registry;

impl<T: Payload, E: Payload> DeferredBuilder<T, E> {
    /// Build a Deferred that settles with the output of `future`.
    ///
    /// It stays pending until the future completes, so a remote call may
    /// still win in the meantime. A panic in the future is resumed by
    /// whoever awaits the Deferred.
    pub fn build_from_future(
        self,
        future: impl Future<Output = Result<T, E>> + Send + 'static,
    ) -> Deferred<T, E> {
        let deferred = self.build();
        let target = deferred.clone();
        deferred.registry().scheduler().spawn(Box::pin(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(outcome) => target.request(Realm::Intrinsic, Request::from(outcome)),
                Err(payload) => target.poison(Panicked::from_payload(&*payload)),
            }
        }));
        deferred
    }
}

fn futures_of<T: Payload, E: Payload>(
    thenables: impl IntoIterator<Item = impl Into<Thenable<T, E>>>,
) -> Vec<BoxFuture<'static, Result<T, E>>> {
    thenables
        .into_iter()
        .map(|thenable| thenable.into().into_future())
        .collect()
}

impl<T: Payload, E: Payload> Deferred<T, E> {
    /// Already fulfilled with `value`, in the global registry.
    #[must_use]
    pub fn from_value(value: T) -> Self {
        Self::from_value_in(&Registry::global(), value)
    }

    #[must_use]
    pub fn from_value_in(registry: &Arc<Registry>, value: T) -> Self {
        let deferred = Self::new_in(registry);
        deferred.request(Realm::Intrinsic, Request::Resolve(value));
        deferred
    }

    /// Already rejected with `error`, in the global registry.
    #[must_use]
    pub fn from_error(error: E) -> Self {
        Self::from_error_in(&Registry::global(), error)
    }

    #[must_use]
    pub fn from_error_in(registry: &Arc<Registry>, error: E) -> Self {
        let deferred = Self::new_in(registry);
        deferred.request(Realm::Intrinsic, Request::Reject(error));
        deferred
    }

    pub fn from_future(future: impl Future<Output = Result<T, E>> + Send + 'static) -> Self {
        Self::builder().build_from_future(future)
    }

    pub fn from_future_in(
        registry: &Arc<Registry>,
        future: impl Future<Output = Result<T, E>> + Send + 'static,
    ) -> Self {
        Self::builder().registry(registry).build_from_future(future)
    }

    /// A Deferred is returned as is; anything else is wrapped.
    pub fn from_thenable(thenable: impl Into<Thenable<T, E>>) -> Self {
        Self::from_thenable_in(&Registry::global(), thenable)
    }

    /// Like [`Deferred::from_thenable`]; only a wrapped future lands in
    /// `registry`.
    pub fn from_thenable_in(registry: &Arc<Registry>, thenable: impl Into<Thenable<T, E>>) -> Self {
        match thenable.into() {
            Thenable::Deferred(deferred) => deferred,
            Thenable::Future(future) => Self::from_future_in(registry, future),
        }
    }

    pub fn all(
        thenables: impl IntoIterator<Item = impl Into<Thenable<T, E>>>,
    ) -> Deferred<Vec<T>, E> {
        Self::all_in(&Registry::global(), thenables)
    }

    /// Fulfills with every value in input order, or rejects with the first
    /// rejection.
    pub fn all_in(
        registry: &Arc<Registry>,
        thenables: impl IntoIterator<Item = impl Into<Thenable<T, E>>>,
    ) -> Deferred<Vec<T>, E> {
        Deferred::from_future_in(registry, future::try_join_all(futures_of(thenables)))
    }

    pub fn all_settled(
        thenables: impl IntoIterator<Item = impl Into<Thenable<T, E>>>,
    ) -> Deferred<Vec<Result<T, E>>, E> {
        Self::all_settled_in(&Registry::global(), thenables)
    }

    /// Fulfills with every outcome once all of them are known. Never rejects.
    pub fn all_settled_in(
        registry: &Arc<Registry>,
        thenables: impl IntoIterator<Item = impl Into<Thenable<T, E>>>,
    ) -> Deferred<Vec<Result<T, E>>, E> {
        Deferred::from_future_in(registry, future::join_all(futures_of(thenables)).map(Ok))
    }

    pub fn race(thenables: impl IntoIterator<Item = impl Into<Thenable<T, E>>>) -> Self {
        Self::race_in(&Registry::global(), thenables)
    }

    /// Settles like the first input to settle. Stays pending forever when
    /// there is no input.
    pub fn race_in(
        registry: &Arc<Registry>,
        thenables: impl IntoIterator<Item = impl Into<Thenable<T, E>>>,
    ) -> Self {
        let futures = futures_of(thenables);
        if futures.is_empty() {
            return Self::new_in(registry);
        }
        Self::from_future_in(
            registry,
            future::select_all(futures).map(|(outcome, _, _)| outcome),
        )
    }

    pub fn any(
        thenables: impl IntoIterator<Item = impl Into<Thenable<T, E>>>,
    ) -> Deferred<T, Vec<E>> {
        Self::any_in(&Registry::global(), thenables)
    }

    /// Fulfills with the first fulfillment, or rejects with every error in
    /// input order once all inputs rejected. No input rejects with an empty
    /// list.
    pub fn any_in(
        registry: &Arc<Registry>,
        thenables: impl IntoIterator<Item = impl Into<Thenable<T, E>>>,
    ) -> Deferred<T, Vec<E>> {
        let futures = futures_of(thenables);
        if futures.is_empty() {
            return Deferred::from_error_in(registry, Vec::new());
        }
        let flipped = futures.into_iter().map(|future| future.map(flip));
        Deferred::from_future_in(registry, future::try_join_all(flipped).map(flip))
    }
}

fn flip<A, B>(outcome: Result<A, B>) -> Result<B, A> {
    match outcome {
        Ok(value) => Err(value),
        Err(error) => Ok(error),
    }
}
