//! Continuations with fate tracking.
//!
//! `then`, `then_or_else`, `catch` and `finally` mark the Deferred's fate and
//! announce the continuation when it is attached, then announce the
//! invocation with the value it receives. What they return depends on
//! `native_composition`: a fresh Deferred in the same registry, or a plain
//! future without any of this surface.

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use remoter_types::{ContinuationId, EventKind, Realm};
use tokio::sync::oneshot;

use crate::Payload;
use crate::deferred::{Attach, Deferred, Panicked, Request, Signal};
use crate::event::Event;

enum Call<A, R, T, E> {
    Plain(Box<dyn FnOnce(A) -> R + Send>),
    Arrow(Box<dyn FnOnce(A, Option<&Deferred<T, E>>) -> R + Send>),
    Method(Box<dyn FnOnce(&Deferred<T, E>, A) -> R + Send>),
}

/// A continuation handler with its calling convention.
///
/// `A` is what the handler receives, `R` what it returns, and `Deferred<T, E>`
/// the instance it is attached to.
pub struct Handler<A, R, T, E> {
    call: Call<A, R, T, E>,
}

impl<A, R, T, E> Handler<A, R, T, E> {
    /// Receives only the argument.
    pub fn new(f: impl FnOnce(A) -> R + Send + 'static) -> Self {
        Self {
            call: Call::Plain(Box::new(f)),
        }
    }

    /// Receives the instance as trailing argument when `instance_argument`
    /// resolves to true, `None` otherwise.
    pub fn arrow(f: impl FnOnce(A, Option<&Deferred<T, E>>) -> R + Send + 'static) -> Self {
        Self {
            call: Call::Arrow(Box::new(f)),
        }
    }

    /// Receives the instance as receiver, regardless of settings.
    pub fn method(f: impl FnOnce(&Deferred<T, E>, A) -> R + Send + 'static) -> Self {
        Self {
            call: Call::Method(Box::new(f)),
        }
    }

    fn invoke(self, arg: A, instance: &Deferred<T, E>, instance_argument: bool) -> R {
        match self.call {
            Call::Plain(f) => f(arg),
            Call::Arrow(f) => f(arg, instance_argument.then_some(instance)),
            Call::Method(f) => f(instance, arg),
        }
    }
}

impl<A, R, T, E> fmt::Debug for Handler<A, R, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let convention = match self.call {
            Call::Plain(_) => "plain",
            Call::Arrow(_) => "arrow",
            Call::Method(_) => "method",
        };
        f.debug_struct("Handler")
            .field("convention", &convention)
            .finish_non_exhaustive()
    }
}

/// Handler for the fulfillment channel.
pub type OnFulfilled<U, T, E> = Handler<T, Result<U, E>, T, E>;
/// Handler for the rejection channel.
pub type OnRejected<U, T, E> = Handler<E, Result<U, E>, T, E>;
/// Handler for `finally`. Receives the outcome when `finally_argument`
/// resolves to true.
pub type OnFinally<T, E> = Handler<Option<Result<T, E>>, Result<(), E>, T, E>;

/// A plain future of a continuation's result.
///
/// If the handler panicked, polling resumes that panic.
pub struct Native<U, E> {
    rx: oneshot::Receiver<Signal<U, E>>,
}

impl<U, E> Future for Native<U, E> {
    type Output = Result<U, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(Signal::Outcome(outcome))) => Poll::Ready(outcome),
            Poll::Ready(Ok(Signal::Panicked(panicked))) => panicked.resume(),
            // The source was dropped without ever settling, so neither will
            // this.
            Poll::Ready(Err(_)) | Poll::Pending => Poll::Pending,
        }
    }
}

impl<U, E> fmt::Debug for Native<U, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Native").finish_non_exhaustive()
    }
}

/// What a continuation returns.
pub enum Chained<U, E> {
    /// A decorated Deferred sharing the source's registry and settings.
    Deferred(Deferred<U, E>),
    Native(Native<U, E>),
}

impl<U, E> Chained<U, E> {
    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native(_))
    }

    #[must_use]
    pub fn as_deferred(&self) -> Option<&Deferred<U, E>> {
        match self {
            Self::Deferred(deferred) => Some(deferred),
            Self::Native(_) => None,
        }
    }

    #[must_use]
    pub fn into_deferred(self) -> Option<Deferred<U, E>> {
        match self {
            Self::Deferred(deferred) => Some(deferred),
            Self::Native(_) => None,
        }
    }
}

impl<U: Payload, E: Payload> Future for Chained<U, E> {
    type Output = Result<U, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.get_mut() {
            Self::Deferred(deferred) => Pin::new(deferred).poll(cx),
            Self::Native(native) => Pin::new(native).poll(cx),
        }
    }
}

impl<U, E> fmt::Debug for Chained<U, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deferred(deferred) => f.debug_tuple("Deferred").field(deferred).finish(),
            Self::Native(native) => f.debug_tuple("Native").field(native).finish(),
        }
    }
}

/// Where a continuation delivers its result.
enum Sink<U, E> {
    Deferred(Deferred<U, E>),
    Channel(oneshot::Sender<Signal<U, E>>),
}

impl<U: Payload, E: Payload> Sink<U, E> {
    fn settle(self, outcome: Result<U, E>) {
        match self {
            Self::Deferred(deferred) => deferred.request(Realm::Intrinsic, Request::from(outcome)),
            Self::Channel(tx) => Self::send(tx, Signal::Outcome(outcome)),
        }
    }

    fn poison(self, panicked: Panicked) {
        match self {
            Self::Deferred(deferred) => deferred.poison(panicked),
            Self::Channel(tx) => Self::send(tx, Signal::Panicked(panicked)),
        }
    }

    fn send(tx: oneshot::Sender<Signal<U, E>>, signal: Signal<U, E>) {
        if tx.send(signal).is_err() {
            tracing::trace!("Chained future dropped before its continuation ran");
        }
    }
}

impl<T: Payload, E: Payload> Deferred<T, E> {
    /// Continue with `on_fulfilled`; rejections pass through.
    pub fn then<U: Payload>(&self, on_fulfilled: OnFulfilled<U, T, E>) -> Chained<U, E> {
        let continuation = self.attach(Attach::Then);
        self.chain(move |outcome, instance| match outcome {
            Ok(value) => instance.claim(value, continuation, on_fulfilled),
            Err(error) => Err(error),
        })
    }

    pub fn then_or_else<U: Payload>(
        &self,
        on_fulfilled: OnFulfilled<U, T, E>,
        on_rejected: OnRejected<U, T, E>,
    ) -> Chained<U, E> {
        let continuation = self.attach(Attach::ThenCatch);
        self.chain(move |outcome, instance| match outcome {
            Ok(value) => instance.claim(value, continuation, on_fulfilled),
            Err(error) => instance.catch_with(error, continuation, on_rejected),
        })
    }

    /// Continue with `on_rejected`; fulfillments pass through.
    pub fn catch(&self, on_rejected: OnRejected<T, T, E>) -> Chained<T, E> {
        let continuation = self.attach(Attach::Catch);
        self.chain(move |outcome, instance| match outcome {
            Ok(value) => Ok(value),
            Err(error) => instance.catch_with(error, continuation, on_rejected),
        })
    }

    /// Run `on_finally` on either outcome. The outcome passes through unless
    /// the handler fails.
    pub fn finally(&self, on_finally: OnFinally<T, E>) -> Chained<T, E> {
        let continuation = self.attach(Attach::Finally);
        self.chain(move |outcome, instance| {
            instance.emit_with(EventKind::Finalized, || Event::Finalized {
                outcome: outcome.clone(),
                continuation,
            });
            let settings = instance.resolved_settings();
            let arg = settings.finally_argument.then(|| outcome.clone());
            match on_finally.invoke(arg, instance, settings.instance_argument) {
                Ok(()) => outcome,
                Err(error) => Err(error),
            }
        })
    }

    /// Run `step` on the outcome and deliver its result downstream. A panic
    /// in `step`, or one arriving from upstream, is handed on instead so that
    /// awaiting the returned future resumes it.
    fn chain<U: Payload>(
        &self,
        step: impl FnOnce(Result<T, E>, &Deferred<T, E>) -> Result<U, E> + Send + 'static,
    ) -> Chained<U, E> {
        let (sink, chained) = self.derive();
        self.react(Box::new(move |signal, instance| {
            let outcome = match signal {
                Signal::Outcome(outcome) => outcome,
                Signal::Panicked(panicked) => return sink.poison(panicked),
            };
            match panic::catch_unwind(AssertUnwindSafe(|| step(outcome, instance))) {
                Ok(next) => sink.settle(next),
                Err(payload) => {
                    let panicked = Panicked::from_payload(&*payload);
                    tracing::warn!(deferred = %instance.id(), %panicked, "Continuation panicked");
                    sink.poison(panicked);
                }
            }
        }));
        chained
    }

    fn claim<U>(
        &self,
        value: T,
        continuation: ContinuationId,
        handler: OnFulfilled<U, T, E>,
    ) -> Result<U, E> {
        self.emit_with(EventKind::Claimed, || Event::Claimed {
            value: value.clone(),
            continuation,
        });
        handler.invoke(value, self, self.resolved_settings().instance_argument)
    }

    fn catch_with<U>(
        &self,
        error: E,
        continuation: ContinuationId,
        handler: OnRejected<U, T, E>,
    ) -> Result<U, E> {
        self.emit_with(EventKind::Caught, || Event::Caught {
            error: error.clone(),
            continuation,
        });
        handler.invoke(error, self, self.resolved_settings().instance_argument)
    }

    /// The object a continuation returns, decided at attach time.
    fn derive<U: Payload>(&self) -> (Sink<U, E>, Chained<U, E>) {
        if self.resolved_settings().native_composition {
            let next = self.sibling::<U>();
            (Sink::Deferred(next.clone()), Chained::Deferred(next))
        } else {
            let (tx, rx) = oneshot::channel();
            (Sink::Channel(tx), Chained::Native(Native { rx }))
        }
    }
}
