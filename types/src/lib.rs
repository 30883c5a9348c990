//! Core domain types for Remoter.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer: the settlement vocabulary
//! (state, realm, fate), the tri-state settings, lifecycle event names, and
//! the callback signature interpreter.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod error;
mod event;
mod ids;
mod settings;
mod signature;

pub use error::DeferredError;
pub use event::{EventKind, Topic, UnknownEventError};
pub use ids::{ContinuationId, DeferredId};
pub use settings::{FALLBACK, ResolvedSettings, Setting, Settings};
pub use signature::{Argument, Signature, SignatureError, Token, Verdict};

use std::fmt;

// ============================================================================
// Settlement State
// ============================================================================

/// Where a Deferred is in its settlement lifecycle.
///
/// Transitions are monotonic: `Pending -> Following -> {Fulfilled, Rejected}`
/// or `Pending -> {Fulfilled, Rejected}`. Nothing ever moves back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SettlementState {
    #[default]
    Pending,
    /// Adopting the outcome of a thenable. Intent is fixed, outcome is not.
    Following,
    Fulfilled,
    Rejected,
}

impl SettlementState {
    /// The outcome is final.
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Fulfilled | Self::Rejected)
    }

    /// A settlement call already won. Further calls oversaturate.
    #[must_use]
    pub fn is_locked(self) -> bool {
        self != Self::Pending
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Following => "following",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SettlementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Realm
// ============================================================================

/// Which side of the Deferred made the winning settlement call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Realm {
    /// Through the externally exposed accessor (or a generated callback).
    Remote,
    /// Through the resolver handed to the initializer.
    Intrinsic,
}

impl Realm {
    #[must_use]
    pub fn is_remote(self) -> bool {
        self == Self::Remote
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Intrinsic => "intrinsic",
        }
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Fate
// ============================================================================

/// Which kinds of continuation have been attached.
///
/// Each flag flips on attachment, not on invocation, and never flips back.
/// `finalized` is independent: a finally handler marks neither of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fate {
    pub claimed: bool,
    pub caught: bool,
    pub finalized: bool,
}

impl Fate {
    /// At least one continuation of any kind is attached.
    #[must_use]
    pub fn is_handled(self) -> bool {
        self.claimed || self.caught || self.finalized
    }
}
