//! Lazy publish/subscribe registry for lifecycle events.
//!
//! A [`Tracer`] costs one empty mutex until the first subscription. The
//! subscription list is allocated on `on` and torn down again as soon as the
//! last listener is removed, so a Deferred nobody watches carries no registry.
//!
//! Listeners are invoked synchronously at emission time, after the list has
//! been snapshotted and the lock released. A listener may therefore read the
//! source, subscribe or unsubscribe without deadlocking.

use std::fmt;
use std::sync::{Arc, Mutex};

use remoter_types::{EventKind, Topic};

use crate::sync::lock;

/// An event type that knows its own name.
pub trait Traced {
    fn kind(&self) -> EventKind;
}

enum Dispatch<S: ?Sized, Ev> {
    /// The source is appended after the event.
    Arrow(Box<dyn Fn(&Ev, &S) + Send + Sync>),
    /// The source is the receiver.
    Method(Box<dyn Fn(&S, &Ev) + Send + Sync>),
}

/// A subscribed callback with an explicit calling convention.
///
/// Clones share identity: `off` removes a registration made with any clone
/// of the same listener.
pub struct Listener<S: ?Sized, Ev> {
    dispatch: Arc<Dispatch<S, Ev>>,
}

impl<S: ?Sized, Ev> Listener<S, Ev> {
    /// Lambda-style listener: receives the event, then the firing source.
    pub fn arrow(f: impl Fn(&Ev, &S) + Send + Sync + 'static) -> Self {
        Self {
            dispatch: Arc::new(Dispatch::Arrow(Box::new(f))),
        }
    }

    /// Method-style listener: the firing source is the receiver.
    pub fn method(f: impl Fn(&S, &Ev) + Send + Sync + 'static) -> Self {
        Self {
            dispatch: Arc::new(Dispatch::Method(Box::new(f))),
        }
    }

    /// Listener that ignores the source.
    pub fn new(f: impl Fn(&Ev) + Send + Sync + 'static) -> Self {
        Self::arrow(move |event, _| f(event))
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.dispatch, &other.dispatch)
    }

    fn invoke(&self, event: &Ev, source: &S) {
        match &*self.dispatch {
            Dispatch::Arrow(f) => f(event, source),
            Dispatch::Method(f) => f(source, event),
        }
    }
}

impl<S: ?Sized, Ev> Clone for Listener<S, Ev> {
    fn clone(&self) -> Self {
        Self {
            dispatch: Arc::clone(&self.dispatch),
        }
    }
}

impl<S: ?Sized, Ev> fmt::Debug for Listener<S, Ev> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let convention = match &*self.dispatch {
            Dispatch::Arrow(_) => "arrow",
            Dispatch::Method(_) => "method",
        };
        f.debug_struct("Listener")
            .field("convention", &convention)
            .finish_non_exhaustive()
    }
}

struct Subscriptions<S: ?Sized, Ev> {
    entries: Vec<(Topic, Listener<S, Ev>)>,
}

pub struct Tracer<S: ?Sized, Ev> {
    subscriptions: Mutex<Option<Subscriptions<S, Ev>>>,
}

impl<S: ?Sized, Ev> Default for Tracer<S, Ev> {
    fn default() -> Self {
        Self {
            subscriptions: Mutex::new(None),
        }
    }
}

impl<S: ?Sized, Ev: Traced> Tracer<S, Ev> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, topic: Topic, listener: Listener<S, Ev>) {
        let mut subscriptions = lock(&self.subscriptions);
        let registry = subscriptions.get_or_insert_with(|| {
            tracing::trace!("Allocating lifecycle tracer registry");
            Subscriptions {
                entries: Vec::new(),
            }
        });
        registry.entries.push((topic, listener));
    }

    /// Remove one registration of `listener` under `topic`.
    ///
    /// Returns whether a registration was found. Absent listeners are not an
    /// error.
    pub fn off(&self, topic: Topic, listener: &Listener<S, Ev>) -> bool {
        let mut subscriptions = lock(&self.subscriptions);
        let Some(registry) = subscriptions.as_mut() else {
            return false;
        };
        let position = registry
            .entries
            .iter()
            .position(|(own, existing)| *own == topic && existing.ptr_eq(listener));
        if let Some(position) = position {
            registry.entries.remove(position);
        }
        if registry.entries.is_empty() {
            *subscriptions = None;
        }
        position.is_some()
    }

    /// Remove every registration under `topic`.
    pub fn off_topic(&self, topic: Topic) {
        let mut subscriptions = lock(&self.subscriptions);
        if let Some(registry) = subscriptions.as_mut() {
            registry.entries.retain(|(own, _)| *own != topic);
            if registry.entries.is_empty() {
                *subscriptions = None;
            }
        }
    }

    /// Remove everything and release the registry.
    pub fn off_all(&self) {
        *lock(&self.subscriptions) = None;
    }

    /// Whether the registry is currently allocated.
    #[must_use]
    pub fn is_active(&self) -> bool {
        lock(&self.subscriptions).is_some()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        lock(&self.subscriptions)
            .as_ref()
            .map_or(0, |registry| registry.entries.len())
    }

    /// Whether an event of `kind` would reach anybody.
    #[must_use]
    pub fn wants(&self, kind: EventKind) -> bool {
        lock(&self.subscriptions).as_ref().is_some_and(|registry| {
            registry
                .entries
                .iter()
                .any(|(topic, _)| topic.matches(kind))
        })
    }

    /// Deliver `event` to wildcard listeners first, then to listeners of its
    /// own topic, each group in registration order.
    pub fn emit(&self, event: &Ev, source: &S) {
        let kind = event.kind();
        let targets: Vec<Listener<S, Ev>> = {
            let subscriptions = lock(&self.subscriptions);
            let Some(registry) = subscriptions.as_ref() else {
                return;
            };
            let wildcard = registry
                .entries
                .iter()
                .filter(|(topic, _)| *topic == Topic::All);
            let named = registry
                .entries
                .iter()
                .filter(|(topic, _)| *topic == Topic::Event(kind));
            wildcard
                .chain(named)
                .map(|(_, listener)| listener.clone())
                .collect()
        };

        tracing::trace!(event = %kind, listeners = targets.len(), "Emitting lifecycle event");
        for listener in &targets {
            listener.invoke(event, source);
        }
    }
}
