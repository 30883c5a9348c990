//! Lifecycle event names and subscription topics.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Name of a lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// A Deferred was constructed. Class-wide tracer only.
    Create,
    /// The winning settlement value is a thenable being adopted.
    Follows,
    /// Intent to fulfill is fixed (resolve or follow won).
    Resolved,
    /// The outcome is final.
    Settled,
    Fulfilled,
    Rejected,
    /// A settlement call arrived after the winning one.
    Oversaturated,
    /// A fulfillment handler was attached.
    Then,
    /// A rejection handler was attached.
    Catch,
    /// A finally handler was attached.
    Finally,
    /// A fulfillment handler is being invoked.
    Claimed,
    /// A rejection handler is being invoked.
    Caught,
    /// A finally handler is being invoked.
    Finalized,
}

impl EventKind {
    pub const ALL: [EventKind; 13] = [
        Self::Create,
        Self::Follows,
        Self::Resolved,
        Self::Settled,
        Self::Fulfilled,
        Self::Rejected,
        Self::Oversaturated,
        Self::Then,
        Self::Catch,
        Self::Finally,
        Self::Claimed,
        Self::Caught,
        Self::Finalized,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Follows => "follows",
            Self::Resolved => "resolved",
            Self::Settled => "settled",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
            Self::Oversaturated => "oversaturated",
            Self::Then => "then",
            Self::Catch => "catch",
            Self::Finally => "finally",
            Self::Claimed => "claimed",
            Self::Caught => "caught",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown lifecycle event '{0}'")]
pub struct UnknownEventError(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventError(s.to_string()))
    }
}

/// What a listener subscribes to: one event, or every event (`"*"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    All,
    Event(EventKind),
}

impl Topic {
    #[must_use]
    pub fn matches(self, kind: EventKind) -> bool {
        match self {
            Self::All => true,
            Self::Event(own) => own == kind,
        }
    }
}

impl From<EventKind> for Topic {
    fn from(kind: EventKind) -> Self {
        Self::Event(kind)
    }
}

impl FromStr for Topic {
    type Err = UnknownEventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            Ok(Self::All)
        } else {
            s.parse().map(Self::Event)
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Event(kind) => kind.fmt(f),
        }
    }
}
