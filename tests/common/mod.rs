//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use remoter_core::{Deferred, Event, Listener, Payload, Registry};
use remoter_types::{EventKind, Topic};

/// Fresh registry so tests never share listeners or defaults.
pub fn registry() -> Arc<Registry> {
    Registry::new()
}

/// Records every event a Deferred emits.
pub struct Recorder<T, E> {
    events: Arc<Mutex<Vec<Event<T, E>>>>,
}

impl<T: Payload, E: Payload> Recorder<T, E> {
    pub fn attach(deferred: &Deferred<T, E>) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        deferred.on(
            Topic::All,
            Listener::new(move |event: &Event<T, E>| sink.lock().unwrap().push(event.clone())),
        );
        Self { events }
    }

    pub fn events(&self) -> Vec<Event<T, E>> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(Event::kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}

/// Counts invocations of a listener or handler.
#[derive(Clone, Default)]
pub struct Counter(Arc<Mutex<usize>>);

impl Counter {
    pub fn hit(&self) {
        *self.0.lock().unwrap() += 1;
    }

    pub fn get(&self) -> usize {
        *self.0.lock().unwrap()
    }
}
