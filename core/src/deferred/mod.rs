//! The externally-settleable future.
//!
//! A [`Deferred`] is a cheap handle; clones refer to the same instance. It
//! settles at most once, either through the remote accessors on the handle
//! ([`Deferred::resolve`], [`Deferred::reject`], [`Deferred::follow`]) or
//! through the [`Resolver`] handed to an initializer. Whichever call comes
//! first wins and fixes the realm; every later call only marks the Deferred
//! oversaturated.
//!
//! The read-only surface is enforced by the type system. Status is only
//! reachable through accessors:
//!
//! ```compile_fail
//! use remoter_core::Deferred;
//! use remoter_types::SettlementState;
//!
//! let deferred: Deferred<i32, String> = Deferred::new();
//! deferred.state = SettlementState::Fulfilled;
//! ```
//!
//! ```compile_fail
//! use remoter_core::Deferred;
//! use remoter_types::Realm;
//!
//! let deferred: Deferred<i32, String> = Deferred::new();
//! deferred.realm = Some(Realm::Remote);
//! ```
//!
//! ```compile_fail
//! use remoter_core::Deferred;
//!
//! let deferred: Deferred<i32, String> = Deferred::new();
//! deferred.oversaturated = true;
//! ```

mod machine;
mod resolver;

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::task::{Context, Poll};

use remoter_types::{
    DeferredError, DeferredId, EventKind, Fate, Realm, ResolvedSettings, Setting, Settings,
    SettlementState, Signature, Topic,
};

use crate::Payload;
use crate::event::Event;
use crate::introspect::Introspect;
use crate::promise::PromiseView;
use crate::registry::Registry;
use crate::sync::{lock, read, write};
use crate::tracer::{Listener, Tracer};

pub(crate) use machine::{Attach, Machine, Panicked, Request, Signal};
pub use resolver::{Resolver, Thenable};

/// Listener on a Deferred's own tracer.
pub type DeferredListener<T, E> = Listener<Deferred<T, E>, Event<T, E>>;

pub(crate) struct Inner<T, E> {
    pub(crate) id: DeferredId,
    pub(crate) registry: Arc<Registry>,
    pub(crate) machine: Mutex<Machine<T, E>>,
    settings: RwLock<Settings>,
    tracer: Tracer<Deferred<T, E>, Event<T, E>>,
    pub(crate) error_result: OnceLock<Arc<Signature>>,
    pub(crate) result_error: OnceLock<Arc<Signature>>,
    pub(crate) promise: OnceLock<PromiseView<T, E>>,
}

pub struct Deferred<T, E> {
    pub(crate) inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Configures a Deferred before it exists: registry and instance settings.
pub struct DeferredBuilder<T, E> {
    registry: Option<Arc<Registry>>,
    settings: Settings,
    _marker: PhantomData<fn() -> (T, E)>,
}

impl<T: Payload, E: Payload> DeferredBuilder<T, E> {
    fn new() -> Self {
        Self {
            registry: None,
            settings: Settings::default(),
            _marker: PhantomData,
        }
    }

    /// Create in `registry` instead of the global one.
    #[must_use]
    pub fn registry(mut self, registry: &Arc<Registry>) -> Self {
        self.registry = Some(Arc::clone(registry));
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn instance_argument(mut self, setting: impl Into<Setting>) -> Self {
        self.settings.instance_argument = setting.into();
        self
    }

    #[must_use]
    pub fn finally_argument(mut self, setting: impl Into<Setting>) -> Self {
        self.settings.finally_argument = setting.into();
        self
    }

    #[must_use]
    pub fn native_composition(mut self, setting: impl Into<Setting>) -> Self {
        self.settings.native_composition = setting.into();
        self
    }

    #[must_use]
    pub fn build(self) -> Deferred<T, E> {
        let registry = self.registry.unwrap_or_else(Registry::global);
        Deferred::create(registry, self.settings)
    }

    /// Build, then run `init` synchronously with the intrinsic resolver.
    ///
    /// An `Err` from `init` rejects the Deferred if nothing settled it yet
    /// and is dropped otherwise.
    pub fn build_with(
        self,
        init: impl FnOnce(&Resolver<T, E>) -> Result<(), E>,
    ) -> Deferred<T, E> {
        let deferred = self.build();
        let resolver = Resolver::new(deferred.clone());
        if let Err(error) = init(&resolver) {
            if deferred.state().is_locked() {
                tracing::trace!(
                    deferred = %deferred.id(),
                    "Initializer failed after settlement; ignoring"
                );
            } else {
                deferred.request(Realm::Intrinsic, Request::Reject(error));
            }
        }
        deferred
    }
}

impl<T: Payload, E: Payload> Default for DeferredBuilder<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Payload, E: Payload> Deferred<T, E> {
    // ========================================================================
    // Construction
    // ========================================================================

    /// A pending Deferred in the global registry, with no initializer.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub fn new_in(registry: &Arc<Registry>) -> Self {
        Self::builder().registry(registry).build()
    }

    pub fn with_initializer(init: impl FnOnce(&Resolver<T, E>) -> Result<(), E>) -> Self {
        Self::builder().build_with(init)
    }

    #[must_use]
    pub fn builder() -> DeferredBuilder<T, E> {
        DeferredBuilder::new()
    }

    fn create(registry: Arc<Registry>, settings: Settings) -> Self {
        let id = registry.next_id();
        let deferred = Self {
            inner: Arc::new(Inner {
                id,
                registry,
                machine: Mutex::new(Machine::new()),
                settings: RwLock::new(settings),
                tracer: Tracer::new(),
                error_result: OnceLock::new(),
                result_error: OnceLock::new(),
                promise: OnceLock::new(),
            }),
        };
        tracing::trace!(deferred = %id, "Created deferred");
        deferred.inner.registry.announce(&deferred);
        deferred
    }

    /// A Deferred sharing this one's registry and instance settings.
    pub(crate) fn sibling<U: Payload>(&self) -> Deferred<U, E> {
        Deferred::create(Arc::clone(&self.inner.registry), self.settings())
    }

    // ========================================================================
    // Remote settlement
    // ========================================================================

    /// Fulfill with `value` from outside.
    pub fn resolve(&self, value: T) -> &Self {
        self.request(Realm::Remote, Request::Resolve(value));
        self
    }

    /// Alias of [`Deferred::resolve`].
    pub fn fulfill(&self, value: T) -> &Self {
        self.resolve(value)
    }

    /// Reject with `error` from outside.
    ///
    /// The error is taken verbatim, even when `E` is itself awaitable.
    pub fn reject(&self, error: E) -> &Self {
        self.request(Realm::Remote, Request::Reject(error));
        self
    }

    /// Adopt the outcome of `thenable` from outside.
    ///
    /// Following a Deferred that already (transitively) follows this one
    /// rejects with [`DeferredError::ChainingCycle`]. Futures are opaque,
    /// [`PromiseView`] included, so following this Deferred's own promise
    /// view is not recognized as a cycle and never settles.
    pub fn follow(&self, thenable: impl Into<Thenable<T, E>>) -> &Self
    where
        E: From<DeferredError>,
    {
        self.follow_in(Realm::Remote, thenable.into());
        self
    }

    pub(crate) fn follow_in(&self, realm: Realm, thenable: Thenable<T, E>)
    where
        E: From<DeferredError>,
    {
        let cycle = match &thenable {
            Thenable::Deferred(target) if self.is_upstream_of(target) => {
                Some(E::from(DeferredError::ChainingCycle(self.id())))
            }
            _ => None,
        };
        self.request(realm, Request::Follow { thenable, cycle });
    }

    // ========================================================================
    // Status
    // ========================================================================

    #[must_use]
    pub fn id(&self) -> DeferredId {
        self.inner.id
    }

    #[must_use]
    pub fn state(&self) -> SettlementState {
        lock(&self.inner.machine).state
    }

    /// `None` while pending; the side of the winning call afterwards.
    #[must_use]
    pub fn realm(&self) -> Option<Realm> {
        lock(&self.inner.machine).realm
    }

    /// No settlement call has won yet. A following Deferred is neither
    /// pending nor settled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        let machine = lock(&self.inner.machine);
        machine.state == SettlementState::Pending && machine.panicked.is_none()
    }

    /// The continuation that should have settled this Deferred panicked.
    /// Awaiting it panics with the same message.
    #[must_use]
    pub fn is_panicked(&self) -> bool {
        lock(&self.inner.machine).panicked.is_some()
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }

    /// The resolve or follow path won, whether or not the outcome is known.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        lock(&self.inner.machine).resolved
    }

    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.state() == SettlementState::Fulfilled
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.state() == SettlementState::Rejected
    }

    #[must_use]
    pub fn is_oversaturated(&self) -> bool {
        lock(&self.inner.machine).oversaturated
    }

    #[must_use]
    pub fn fate(&self) -> Fate {
        lock(&self.inner.machine).fate
    }

    #[must_use]
    pub fn is_claimed(&self) -> bool {
        self.fate().claimed
    }

    #[must_use]
    pub fn is_caught(&self) -> bool {
        self.fate().caught
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.fate().finalized
    }

    fn remotely(&self, status: impl FnOnce(&Machine<T, E>) -> bool) -> bool {
        let machine = lock(&self.inner.machine);
        status(&machine) && machine.realm == Some(Realm::Remote)
    }

    #[must_use]
    pub fn is_settled_remotely(&self) -> bool {
        self.remotely(|machine| machine.state.is_settled())
    }

    #[must_use]
    pub fn is_resolved_remotely(&self) -> bool {
        self.remotely(|machine| machine.resolved)
    }

    #[must_use]
    pub fn is_fulfilled_remotely(&self) -> bool {
        self.remotely(|machine| machine.state == SettlementState::Fulfilled)
    }

    #[must_use]
    pub fn is_rejected_remotely(&self) -> bool {
        self.remotely(|machine| machine.state == SettlementState::Rejected)
    }

    /// The settled outcome, if there is one yet.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<T, E>> {
        lock(&self.inner.machine).outcome.clone()
    }

    // ========================================================================
    // Settings
    // ========================================================================

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    /// Instance layer only; `Inherit` where nothing was set.
    #[must_use]
    pub fn settings(&self) -> Settings {
        *read(&self.inner.settings)
    }

    #[must_use]
    pub fn instance_argument(&self) -> Setting {
        self.settings().instance_argument
    }

    #[must_use]
    pub fn finally_argument(&self) -> Setting {
        self.settings().finally_argument
    }

    #[must_use]
    pub fn native_composition(&self) -> Setting {
        self.settings().native_composition
    }

    pub fn set_instance_argument(&self, setting: impl Into<Setting>) -> &Self {
        write(&self.inner.settings).instance_argument = setting.into();
        self
    }

    pub fn set_finally_argument(&self, setting: impl Into<Setting>) -> &Self {
        write(&self.inner.settings).finally_argument = setting.into();
        self
    }

    pub fn set_native_composition(&self, setting: impl Into<Setting>) -> &Self {
        write(&self.inner.settings).native_composition = setting.into();
        self
    }

    /// Instance settings resolved against the registry defaults right now.
    #[must_use]
    pub fn resolved_settings(&self) -> ResolvedSettings {
        self.settings().resolve(&self.inner.registry.defaults())
    }

    // ========================================================================
    // Lifecycle tracing
    // ========================================================================

    pub fn on(&self, topic: impl Into<Topic>, listener: DeferredListener<T, E>) -> &Self {
        self.inner.tracer.on(topic.into(), listener);
        self
    }

    pub fn off(&self, topic: impl Into<Topic>, listener: &DeferredListener<T, E>) -> &Self {
        self.inner.tracer.off(topic.into(), listener);
        self
    }

    pub fn off_topic(&self, topic: impl Into<Topic>) -> &Self {
        self.inner.tracer.off_topic(topic.into());
        self
    }

    pub fn off_all(&self) -> &Self {
        self.inner.tracer.off_all();
        self
    }

    /// Whether this instance's tracer registry is currently allocated.
    #[must_use]
    pub fn is_tracing(&self) -> bool {
        self.inner.tracer.is_active()
    }

    /// Emit the event built by `event` if anybody listens for `kind`.
    pub(crate) fn emit_with(&self, kind: EventKind, event: impl FnOnce() -> Event<T, E>) {
        if self.inner.tracer.wants(kind) {
            self.inner.tracer.emit(&event(), self);
        }
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// Both handles refer to the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Payload, E: Payload> Default for Deferred<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Awaiting observes the outcome. It is not a continuation, so fate is left
/// alone.
impl<T: Payload, E: Payload> Future for Deferred<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut machine = lock(&self.inner.machine);
        if let Some(outcome) = &machine.outcome {
            return Poll::Ready(outcome.clone());
        }
        if let Some(panicked) = machine.panicked.clone() {
            drop(machine);
            return panicked.resume();
        }
        if !machine.wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
            machine.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<T: Payload, E: Payload> Introspect for Deferred<T, E> {
    fn id(&self) -> DeferredId {
        Deferred::id(self)
    }

    fn state(&self) -> SettlementState {
        Deferred::state(self)
    }

    fn realm(&self) -> Option<Realm> {
        Deferred::realm(self)
    }

    fn fate(&self) -> Fate {
        Deferred::fate(self)
    }

    fn is_oversaturated(&self) -> bool {
        Deferred::is_oversaturated(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let machine = lock(&self.inner.machine);
        f.debug_struct("Deferred")
            .field("id", &self.inner.id)
            .field("state", &machine.state)
            .field("realm", &machine.realm)
            .field("oversaturated", &machine.oversaturated)
            .field("fate", &machine.fate)
            .finish_non_exhaustive()
    }
}
