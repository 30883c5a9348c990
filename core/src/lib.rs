//! Externally-settleable futures with lifecycle introspection.
//!
//! A [`Deferred`] can be settled from inside an initializer or later by any
//! code holding a handle, and it remembers how that happened: which side won
//! ([`Realm`]), whether later calls oversaturated it, and which kinds of
//! continuation were attached ([`Fate`]). Lifecycle events are published on
//! lazily allocated tracers, per instance and per [`Registry`].
//!
//! ```no_run
//! use remoter_core::{Deferred, Handler};
//!
//! # async fn demo() {
//! let deferred: Deferred<u32, String> = Deferred::new();
//! let doubled = deferred.then(Handler::new(|v: u32| Ok(v * 2)));
//! deferred.resolve(21);
//! assert_eq!(doubled.await, Ok(42));
//! assert!(deferred.is_fulfilled_remotely());
//! # }
//! ```
//!
//! [`Realm`]: remoter_types::Realm
//! [`Fate`]: remoter_types::Fate

mod callback;
mod combinators;
mod decorator;
mod deferred;
pub mod event;
mod introspect;
mod promise;
mod registry;
pub mod scheduler;
mod sync;
pub mod tracer;

pub use callback::SignatureCallback;
pub use decorator::{Chained, Handler, Native, OnFinally, OnFulfilled, OnRejected};
pub use deferred::{Deferred, DeferredBuilder, DeferredListener, Resolver, Thenable};
pub use event::{Attempt, ClassEvent, Event, Resolution, ThenableKind};
pub use introspect::Introspect;
pub use promise::PromiseView;
pub use registry::{ClassListener, Registry};
pub use scheduler::{Job, Scheduler, TokioScheduler};
pub use tracer::{Listener, Tracer};

/// Values a Deferred can carry. A settled outcome is handed to every
/// continuation, so it has to be cloneable and shareable across tasks.
pub trait Payload: Clone + Send + Sync + 'static {}

impl<P: Clone + Send + Sync + 'static> Payload for P {}
