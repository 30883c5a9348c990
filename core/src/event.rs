//! Lifecycle event payloads.

use remoter_types::{ContinuationId, DeferredId, EventKind};

use crate::tracer::Traced;

/// What a Deferred was asked to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThenableKind {
    /// Another Deferred, by id.
    Deferred(DeferredId),
    /// An opaque future.
    Future,
}

/// The argument a `resolved` event reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T, E> {
    Value(T),
    Error(E),
    Thenable(ThenableKind),
}

/// A settlement call, as reported by an `oversaturated` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T, E> {
    Resolve(T),
    Reject(E),
    Follow(ThenableKind),
}

/// An event fired on a Deferred's own tracer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<T, E> {
    Follows(ThenableKind),
    Resolved(Resolution<T, E>),
    Settled(Result<T, E>),
    Fulfilled(T),
    Rejected(E),
    Oversaturated(Attempt<T, E>),
    Then(ContinuationId),
    Catch(ContinuationId),
    Finally(ContinuationId),
    Claimed {
        value: T,
        continuation: ContinuationId,
    },
    Caught {
        error: E,
        continuation: ContinuationId,
    },
    Finalized {
        outcome: Result<T, E>,
        continuation: ContinuationId,
    },
}

impl<T, E> Event<T, E> {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Follows(_) => EventKind::Follows,
            Self::Resolved(_) => EventKind::Resolved,
            Self::Settled(_) => EventKind::Settled,
            Self::Fulfilled(_) => EventKind::Fulfilled,
            Self::Rejected(_) => EventKind::Rejected,
            Self::Oversaturated(_) => EventKind::Oversaturated,
            Self::Then(_) => EventKind::Then,
            Self::Catch(_) => EventKind::Catch,
            Self::Finally(_) => EventKind::Finally,
            Self::Claimed { .. } => EventKind::Claimed,
            Self::Caught { .. } => EventKind::Caught,
            Self::Finalized { .. } => EventKind::Finalized,
        }
    }

    /// The continuation an attach or invocation event refers to.
    #[must_use]
    pub fn continuation(&self) -> Option<ContinuationId> {
        match self {
            Self::Then(id) | Self::Catch(id) | Self::Finally(id) => Some(*id),
            Self::Claimed { continuation, .. }
            | Self::Caught { continuation, .. }
            | Self::Finalized { continuation, .. } => Some(*continuation),
            _ => None,
        }
    }
}

impl<T, E> Traced for Event<T, E> {
    fn kind(&self) -> EventKind {
        Event::kind(self)
    }
}

/// An event fired on the class-wide tracer of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassEvent {
    Create(DeferredId),
}

impl Traced for ClassEvent {
    fn kind(&self) -> EventKind {
        match self {
            Self::Create(_) => EventKind::Create,
        }
    }
}
