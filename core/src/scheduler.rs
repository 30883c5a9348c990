//! The seam to the base future engine.
//!
//! Deferreds never run continuations inside the call that settles them.
//! Reactions are handed to a [`Scheduler`] as a job and run later as their own
//! task. Adoption of a foreign future is likewise spawned here.

use std::thread;

use futures_util::future::BoxFuture;
use tokio::runtime::{Builder, Handle};

/// A batch of synchronous work to run as one deferred task.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Scheduler: Send + Sync {
    /// Run `job` as a deferred task. Jobs scheduled from one thread start in
    /// submission order on a single-threaded runtime.
    fn schedule(&self, job: Job);

    /// Drive `task` to completion in the background.
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// Schedules onto the ambient tokio runtime.
///
/// Outside a runtime the task gets a dedicated thread with a current-thread
/// runtime of its own, so Deferreds still settle in plain synchronous code.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl TokioScheduler {
    fn spawn_detached(task: BoxFuture<'static, ()>) {
        tracing::warn!("No tokio runtime available; running Deferred task on a dedicated thread");
        let spawned = thread::Builder::new()
            .name("remoter-task".to_string())
            .spawn(move || match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime.block_on(task),
                Err(e) => tracing::warn!("Failed to build fallback runtime: {e}"),
            });
        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn fallback thread: {e}");
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, job: Job) {
        self.spawn(Box::pin(async move { job() }));
    }

    fn spawn(&self, task: BoxFuture<'static, ()>) {
        match Handle::try_current() {
            Ok(handle) => {
                drop(handle.spawn(task));
            }
            Err(_) => Self::spawn_detached(task),
        }
    }
}
