//! The Deferred seen through the plain future contract.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;

use crate::Payload;
use crate::deferred::{Deferred, Signal};
use crate::sync::lock;

/// A memoized, cloneable future of a Deferred's outcome.
///
/// It holds no handle to the Deferred, so it carries none of the decorator
/// surface. Every call to [`Deferred::promise`] on one instance returns a
/// clone of the same view; compare with [`PromiseView::ptr_eq`].
pub struct PromiseView<T, E> {
    shared: Shared<BoxFuture<'static, Result<T, E>>>,
}

impl<T: Payload, E: Payload> PromiseView<T, E> {
    fn open(deferred: &Deferred<T, E>) -> Self {
        let mut machine = lock(&deferred.inner.machine);
        let settled = machine.outcome.clone();
        let source: BoxFuture<'static, Result<T, E>> = if let Some(outcome) = settled {
            Box::pin(future::ready(outcome))
        } else if let Some(panicked) = machine.panicked.clone() {
            Box::pin(async move { panicked.resume::<Result<T, E>>() })
        } else {
            let (tx, rx) = oneshot::channel();
            machine.view_tx = Some(tx);
            Box::pin(async move {
                match rx.await {
                    Ok(Signal::Outcome(outcome)) => outcome,
                    Ok(Signal::Panicked(panicked)) => panicked.resume(),
                    // Dropped unsettled: stays pending like the Deferred.
                    Err(_) => future::pending().await,
                }
            })
        };
        Self {
            shared: source.shared(),
        }
    }

    /// Both views wrap the same underlying future.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Shared::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T, E> Clone for PromiseView<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Payload, E: Payload> Future for PromiseView<T, E> {
    type Output = Result<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.shared).poll(cx)
    }
}

impl<T, E> fmt::Debug for PromiseView<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseView").finish_non_exhaustive()
    }
}

impl<T: Payload, E: Payload> Deferred<T, E> {
    /// The promise view, created on first access.
    #[must_use]
    pub fn promise(&self) -> PromiseView<T, E> {
        self.inner
            .promise
            .get_or_init(|| PromiseView::open(self))
            .clone()
    }
}
