use std::fmt;
use std::future::Future;

use futures_util::future::BoxFuture;
use remoter_types::{DeferredError, Realm};

use super::{Deferred, Request};
use crate::Payload;
use crate::event::ThenableKind;
use crate::promise::PromiseView;

/// Something whose outcome a Deferred can adopt.
pub enum Thenable<T, E> {
    Deferred(Deferred<T, E>),
    Future(BoxFuture<'static, Result<T, E>>),
}

impl<T: Payload, E: Payload> Thenable<T, E> {
    pub fn future(future: impl Future<Output = Result<T, E>> + Send + 'static) -> Self {
        Self::Future(Box::pin(future))
    }

    #[must_use]
    pub fn kind(&self) -> ThenableKind {
        match self {
            Self::Deferred(deferred) => ThenableKind::Deferred(deferred.id()),
            Self::Future(_) => ThenableKind::Future,
        }
    }

    pub(crate) fn into_future(self) -> BoxFuture<'static, Result<T, E>> {
        match self {
            Self::Deferred(deferred) => Box::pin(deferred),
            Self::Future(future) => future,
        }
    }
}

impl<T, E> From<Deferred<T, E>> for Thenable<T, E> {
    fn from(deferred: Deferred<T, E>) -> Self {
        Self::Deferred(deferred)
    }
}

impl<T: Payload, E: Payload> From<PromiseView<T, E>> for Thenable<T, E> {
    fn from(view: PromiseView<T, E>) -> Self {
        Self::Future(Box::pin(view))
    }
}

impl<T, E> fmt::Debug for Thenable<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deferred(deferred) => f.debug_tuple("Deferred").field(deferred).finish(),
            Self::Future(_) => f.write_str("Future"),
        }
    }
}

/// The intrinsic side of a Deferred, handed to its initializer.
///
/// Settlement through a resolver records [`Realm::Intrinsic`]. A resolver
/// may be kept and used after the initializer returns.
pub struct Resolver<T, E> {
    deferred: Deferred<T, E>,
}

impl<T: Payload, E: Payload> Resolver<T, E> {
    pub(crate) fn new(deferred: Deferred<T, E>) -> Self {
        Self { deferred }
    }

    pub fn resolve(&self, value: T) {
        self.deferred.request(Realm::Intrinsic, Request::Resolve(value));
    }

    pub fn fulfill(&self, value: T) {
        self.resolve(value);
    }

    pub fn reject(&self, error: E) {
        self.deferred.request(Realm::Intrinsic, Request::Reject(error));
    }

    pub fn follow(&self, thenable: impl Into<Thenable<T, E>>)
    where
        E: From<DeferredError>,
    {
        self.deferred.follow_in(Realm::Intrinsic, thenable.into());
    }

    /// The Deferred this resolver settles.
    #[must_use]
    pub fn deferred(&self) -> &Deferred<T, E> {
        &self.deferred
    }
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            deferred: self.deferred.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("deferred", &self.deferred.inner.id)
            .finish()
    }
}
