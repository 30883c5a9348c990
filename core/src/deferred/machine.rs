//! Settlement state machine.
//!
//! All transitions happen under the instance mutex; events, wakers and
//! reactions are released only after the lock is dropped.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::task::Waker;

use futures_util::FutureExt;
use remoter_types::{ContinuationId, EventKind, Fate, Realm, SettlementState};
use tokio::sync::oneshot;

use super::{Deferred, Inner, Thenable};
use crate::Payload;
use crate::event::{Attempt, Event, Resolution};
use crate::sync::lock;

/// A continuation that panicked where it should have produced an outcome.
///
/// Only the message survives; awaiting anything downstream re-raises it.
#[derive(Debug, Clone)]
pub(crate) struct Panicked {
    message: Arc<str>,
}

impl Panicked {
    pub(crate) fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "continuation panicked".to_string());
        Self {
            message: message.into(),
        }
    }

    /// Continue unwinding in the caller, the way awaiting a panicked task
    /// does.
    pub(crate) fn resume<O>(&self) -> O {
        panic::resume_unwind(Box::new(self.message.to_string()))
    }
}

impl fmt::Display for Panicked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// What waiting continuations are released with.
#[derive(Clone)]
pub(crate) enum Signal<T, E> {
    Outcome(Result<T, E>),
    Panicked(Panicked),
}

/// A continuation waiting for the outcome. Receives the Deferred it was
/// attached to, so it never has to own a handle while it waits.
pub(crate) type Reaction<T, E> = Box<dyn FnOnce(Signal<T, E>, &Deferred<T, E>) + Send>;

pub(crate) struct Machine<T, E> {
    pub(crate) state: SettlementState,
    pub(crate) realm: Option<Realm>,
    /// The resolve or follow path won.
    pub(crate) resolved: bool,
    pub(crate) oversaturated: bool,
    pub(crate) fate: Fate,
    pub(crate) outcome: Option<Result<T, E>>,
    /// Set instead of `outcome` when the continuation that should have
    /// settled this Deferred panicked.
    pub(crate) panicked: Option<Panicked>,
    reactions: Vec<Reaction<T, E>>,
    pub(crate) wakers: Vec<Waker>,
    /// The Deferred being adopted while `Following`.
    following: Option<Weak<Inner<T, E>>>,
    pub(crate) view_tx: Option<oneshot::Sender<Signal<T, E>>>,
    next_continuation: u64,
}

/// Everything released once an outcome is sealed.
struct Released<T, E> {
    reactions: Vec<Reaction<T, E>>,
    wakers: Vec<Waker>,
    view_tx: Option<oneshot::Sender<Signal<T, E>>>,
}

impl<T: Clone, E: Clone> Machine<T, E> {
    pub(crate) fn new() -> Self {
        Self {
            state: SettlementState::Pending,
            realm: None,
            resolved: false,
            oversaturated: false,
            fate: Fate::default(),
            outcome: None,
            panicked: None,
            reactions: Vec::new(),
            wakers: Vec::new(),
            following: None,
            view_tx: None,
            next_continuation: 1,
        }
    }

    fn seal(&mut self, outcome: &Result<T, E>) -> Released<T, E> {
        self.state = match outcome {
            Ok(_) => SettlementState::Fulfilled,
            Err(_) => SettlementState::Rejected,
        };
        self.outcome = Some(outcome.clone());
        self.release_all()
    }

    fn poison(&mut self, panicked: &Panicked) -> Released<T, E> {
        self.panicked = Some(panicked.clone());
        self.release_all()
    }

    fn release_all(&mut self) -> Released<T, E> {
        Released {
            reactions: mem::take(&mut self.reactions),
            wakers: mem::take(&mut self.wakers),
            view_tx: self.view_tx.take(),
        }
    }

    fn continuation(&mut self) -> ContinuationId {
        let id = ContinuationId::new(self.next_continuation);
        self.next_continuation += 1;
        id
    }
}

/// A settlement call.
pub(crate) enum Request<T, E> {
    Resolve(T),
    Reject(E),
    /// `cycle` carries the rejection to use when adopting `thenable` would
    /// close a loop.
    Follow {
        thenable: Thenable<T, E>,
        cycle: Option<E>,
    },
}

impl<T, E> From<Result<T, E>> for Request<T, E> {
    fn from(outcome: Result<T, E>) -> Self {
        match outcome {
            Ok(value) => Self::Resolve(value),
            Err(error) => Self::Reject(error),
        }
    }
}

impl<T: Payload, E: Payload> Request<T, E> {
    fn into_attempt(self) -> Attempt<T, E> {
        match self {
            Self::Resolve(value) => Attempt::Resolve(value),
            Self::Reject(error) => Attempt::Reject(error),
            Self::Follow { thenable, .. } => Attempt::Follow(thenable.kind()),
        }
    }
}

/// Which continuation kinds an attachment registers.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Attach {
    Then,
    Catch,
    ThenCatch,
    Finally,
}

impl<T: Payload, E: Payload> Deferred<T, E> {
    /// Run one settlement call from `realm`.
    pub(crate) fn request(&self, realm: Realm, request: Request<T, E>) {
        let mut machine = lock(&self.inner.machine);
        if machine.state.is_locked() || machine.panicked.is_some() {
            machine.oversaturated = true;
            drop(machine);
            tracing::debug!(deferred = %self.id(), %realm, "Settlement call after the winning one");
            self.emit_with(EventKind::Oversaturated, || {
                Event::Oversaturated(request.into_attempt())
            });
            return;
        }
        machine.realm = Some(realm);

        match request {
            Request::Resolve(value) => {
                machine.resolved = true;
                let outcome = Ok(value.clone());
                let released = machine.seal(&outcome);
                drop(machine);
                tracing::debug!(deferred = %self.id(), %realm, "Fulfilled");
                self.emit_with(EventKind::Resolved, || {
                    Event::Resolved(Resolution::Value(value.clone()))
                });
                self.emit_with(EventKind::Settled, || Event::Settled(outcome.clone()));
                self.emit_with(EventKind::Fulfilled, || Event::Fulfilled(value));
                self.release(Signal::Outcome(outcome), released);
            }
            Request::Reject(error) => {
                let outcome = Err(error.clone());
                let released = machine.seal(&outcome);
                drop(machine);
                tracing::debug!(deferred = %self.id(), %realm, "Rejected");
                self.emit_with(EventKind::Resolved, || {
                    Event::Resolved(Resolution::Error(error.clone()))
                });
                self.emit_with(EventKind::Settled, || Event::Settled(outcome.clone()));
                self.emit_with(EventKind::Rejected, || Event::Rejected(error));
                self.release(Signal::Outcome(outcome), released);
            }
            Request::Follow {
                cycle: Some(error), ..
            } => {
                let outcome = Err(error.clone());
                let released = machine.seal(&outcome);
                drop(machine);
                tracing::debug!(deferred = %self.id(), %realm, "Rejected a chaining cycle");
                self.emit_with(EventKind::Settled, || Event::Settled(outcome.clone()));
                self.emit_with(EventKind::Rejected, || Event::Rejected(error));
                self.release(Signal::Outcome(outcome), released);
            }
            Request::Follow {
                thenable,
                cycle: None,
            } => {
                machine.state = SettlementState::Following;
                machine.resolved = true;
                if let Thenable::Deferred(target) = &thenable {
                    machine.following = Some(Arc::downgrade(&target.inner));
                }
                drop(machine);
                let kind = thenable.kind();
                tracing::debug!(deferred = %self.id(), %realm, ?kind, "Following");
                self.emit_with(EventKind::Follows, || Event::Follows(kind));
                self.emit_with(EventKind::Resolved, || {
                    Event::Resolved(Resolution::Thenable(kind))
                });
                self.adopt(thenable);
            }
        }
    }

    fn adopt(&self, thenable: Thenable<T, E>) {
        let follower = self.clone();
        match thenable {
            Thenable::Deferred(target) => {
                target.react(Box::new(move |signal, _| follower.complete(signal)));
            }
            Thenable::Future(future) => {
                self.inner.registry.scheduler().spawn(Box::pin(async move {
                    let signal = match AssertUnwindSafe(future).catch_unwind().await {
                        Ok(outcome) => Signal::Outcome(outcome),
                        Err(payload) => Signal::Panicked(Panicked::from_payload(&*payload)),
                    };
                    follower.complete(signal);
                }));
            }
        }
    }

    /// Settle a following Deferred with the adopted outcome.
    fn complete(&self, signal: Signal<T, E>) {
        let mut machine = lock(&self.inner.machine);
        if machine.state != SettlementState::Following {
            return;
        }
        let outcome = match signal {
            Signal::Outcome(outcome) => outcome,
            Signal::Panicked(panicked) => {
                let released = machine.poison(&panicked);
                drop(machine);
                tracing::debug!(deferred = %self.id(), %panicked, "Adopted a panic");
                self.release(Signal::Panicked(panicked), released);
                return;
            }
        };
        let released = machine.seal(&outcome);
        drop(machine);
        tracing::debug!(deferred = %self.id(), ok = outcome.is_ok(), "Adopted outcome");
        self.emit_with(EventKind::Settled, || Event::Settled(outcome.clone()));
        match &outcome {
            Ok(value) => self.emit_with(EventKind::Fulfilled, || Event::Fulfilled(value.clone())),
            Err(error) => self.emit_with(EventKind::Rejected, || Event::Rejected(error.clone())),
        }
        self.release(Signal::Outcome(outcome), released);
    }

    /// Record that the continuation meant to settle this Deferred panicked.
    /// Awaiting it re-raises the panic and later settlement calls
    /// oversaturate.
    pub(crate) fn poison(&self, panicked: Panicked) {
        let mut machine = lock(&self.inner.machine);
        if machine.state != SettlementState::Pending || machine.panicked.is_some() {
            drop(machine);
            tracing::trace!(deferred = %self.id(), "Panic arrived after settlement; ignoring");
            return;
        }
        let released = machine.poison(&panicked);
        drop(machine);
        tracing::debug!(deferred = %self.id(), %panicked, "Poisoned by a panicking continuation");
        self.release(Signal::Panicked(panicked), released);
    }

    fn release(&self, signal: Signal<T, E>, released: Released<T, E>) {
        for waker in released.wakers {
            waker.wake();
        }
        if let Some(view_tx) = released.view_tx
            && view_tx.send(signal.clone()).is_err()
        {
            tracing::trace!(deferred = %self.id(), "Promise view dropped before settlement");
        }
        if released.reactions.is_empty() {
            return;
        }

        let count = released.reactions.len();
        let deferred = self.clone();
        tracing::trace!(deferred = %self.id(), count, "Scheduling reactions");
        self.inner.registry.scheduler().schedule(Box::new(move || {
            for reaction in released.reactions {
                deferred.run(reaction, signal.clone());
            }
        }));
    }

    /// Queue `reaction` for the outcome. After settlement it gets a task of
    /// its own.
    pub(crate) fn react(&self, reaction: Reaction<T, E>) {
        let mut machine = lock(&self.inner.machine);
        let signal = match (&machine.outcome, &machine.panicked) {
            (Some(outcome), _) => Signal::Outcome(outcome.clone()),
            (None, Some(panicked)) => Signal::Panicked(panicked.clone()),
            (None, None) => {
                machine.reactions.push(reaction);
                return;
            }
        };
        drop(machine);

        let deferred = self.clone();
        tracing::trace!(deferred = %self.id(), "Scheduling late reaction");
        self.inner
            .registry
            .scheduler()
            .schedule(Box::new(move || deferred.run(reaction, signal)));
    }

    /// A panicking reaction must not take the rest of its batch down with it.
    fn run(&self, reaction: Reaction<T, E>, signal: Signal<T, E>) {
        if panic::catch_unwind(AssertUnwindSafe(|| reaction(signal, self))).is_err() {
            tracing::warn!(deferred = %self.id(), "Continuation panicked");
        }
    }

    /// Mark fate for a new continuation and announce it.
    pub(crate) fn attach(&self, attach: Attach) -> ContinuationId {
        let id = {
            let mut machine = lock(&self.inner.machine);
            match attach {
                Attach::Then => machine.fate.claimed = true,
                Attach::Catch => machine.fate.caught = true,
                Attach::ThenCatch => {
                    machine.fate.claimed = true;
                    machine.fate.caught = true;
                }
                Attach::Finally => machine.fate.finalized = true,
            }
            machine.continuation()
        };
        if matches!(attach, Attach::Then | Attach::ThenCatch) {
            self.emit_with(EventKind::Then, || Event::Then(id));
        }
        if matches!(attach, Attach::Catch | Attach::ThenCatch) {
            self.emit_with(EventKind::Catch, || Event::Catch(id));
        }
        if matches!(attach, Attach::Finally) {
            self.emit_with(EventKind::Finally, || Event::Finally(id));
        }
        id
    }

    /// Whether `target` is this Deferred or already follows it, directly or
    /// through a chain.
    ///
    /// Two racing `follow` calls can both pass this check and close a loop
    /// that does not include `self`; reaching such a loop counts as a cycle
    /// too, so the walk always ends.
    pub(crate) fn is_upstream_of(&self, target: &Deferred<T, E>) -> bool {
        let mut visited = HashSet::new();
        let mut cursor = Some(Arc::clone(&target.inner));
        while let Some(inner) = cursor {
            if Arc::ptr_eq(&inner, &self.inner) || !visited.insert(Arc::as_ptr(&inner)) {
                return true;
            }
            cursor = lock(&inner.machine)
                .following
                .as_ref()
                .and_then(Weak::upgrade);
        }
        false
    }
}
