use std::any::Any;

use remoter_types::{DeferredId, Fate, Realm, SettlementState};

/// Type-erased view of a Deferred, handed to class-wide listeners.
///
/// Class-wide listeners observe Deferreds of every value type created in a
/// registry, so they see this trait object. `as_any` downcasts back to the
/// concrete `Deferred<T, E>` when the listener knows the types.
pub trait Introspect: Send + Sync {
    fn id(&self) -> DeferredId;

    fn state(&self) -> SettlementState;

    fn realm(&self) -> Option<Realm>;

    fn fate(&self) -> Fate;

    fn is_oversaturated(&self) -> bool;

    fn as_any(&self) -> &dyn Any;
}
