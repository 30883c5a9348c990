//! Shared state of a family of Deferreds.
//!
//! A [`Registry`] owns what the Deferreds created in it share: the default
//! settings, the class-wide tracer (which only carries `create`), the
//! scheduler and the id counter. Tests build their own registry with
//! [`Registry::new`] and stay isolated from each other; application code can
//! use the lazily created [`Registry::global`], whose defaults come from the
//! config file.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use remoter_types::{DeferredId, Settings, Topic};

use crate::event::ClassEvent;
use crate::introspect::Introspect;
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::sync::{read, write};
use crate::tracer::{Listener, Tracer};

/// Listener on the class-wide tracer.
pub type ClassListener = Listener<dyn Introspect, ClassEvent>;

static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();

pub struct Registry {
    defaults: RwLock<Settings>,
    tracer: Tracer<dyn Introspect, ClassEvent>,
    scheduler: Arc<dyn Scheduler>,
    next_id: AtomicU64,
}

impl Registry {
    /// Isolated registry with all-inherit defaults on the tokio scheduler.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_parts(Settings::default(), Arc::new(TokioScheduler))
    }

    #[must_use]
    pub fn with_defaults(defaults: Settings) -> Arc<Self> {
        Self::with_parts(defaults, Arc::new(TokioScheduler))
    }

    #[must_use]
    pub fn with_parts(defaults: Settings, scheduler: Arc<dyn Scheduler>) -> Arc<Self> {
        Arc::new(Self {
            defaults: RwLock::new(defaults),
            tracer: Tracer::new(),
            scheduler,
            next_id: AtomicU64::new(1),
        })
    }

    /// The ambient registry. Defaults are read from the config file once, on
    /// first use.
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| {
            let defaults = remoter_config::load_defaults();
            tracing::debug!(?defaults, "Initialized global Remoter registry");
            Self::with_defaults(defaults)
        }))
    }

    #[must_use]
    pub fn defaults(&self) -> Settings {
        *read(&self.defaults)
    }

    pub fn set_defaults(&self, defaults: Settings) {
        *write(&self.defaults) = defaults;
    }

    /// Change the defaults in place.
    pub fn update_defaults(&self, update: impl FnOnce(&mut Settings)) {
        update(&mut write(&self.defaults));
    }

    /// Restore all-inherit defaults and drop every class-wide listener.
    pub fn reset(&self) {
        self.set_defaults(Settings::default());
        self.tracer.off_all();
    }

    pub fn on(&self, topic: impl Into<Topic>, listener: ClassListener) -> &Self {
        self.tracer.on(topic.into(), listener);
        self
    }

    pub fn off(&self, topic: impl Into<Topic>, listener: &ClassListener) -> &Self {
        self.tracer.off(topic.into(), listener);
        self
    }

    pub fn off_topic(&self, topic: impl Into<Topic>) -> &Self {
        self.tracer.off_topic(topic.into());
        self
    }

    pub fn off_all(&self) -> &Self {
        self.tracer.off_all();
        self
    }

    /// Whether the class-wide tracer registry is currently allocated.
    #[must_use]
    pub fn is_tracing(&self) -> bool {
        self.tracer.is_active()
    }

    pub(crate) fn next_id(&self) -> DeferredId {
        DeferredId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }

    pub(crate) fn announce(&self, deferred: &(dyn Introspect + 'static)) {
        self.tracer.emit(&ClassEvent::Create(deferred.id()), deferred);
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("defaults", &self.defaults())
            .field("listeners", &self.tracer.listener_count())
            .finish_non_exhaustive()
    }
}
