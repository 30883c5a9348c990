use serde_json::Value;
use thiserror::Error;

use crate::DeferredId;

/// Failures produced by the Deferred machinery itself, as opposed to the
/// rejection values users settle with.
///
/// These travel through the rejection channel, so the rejection type of a
/// Deferred that can hit them must be constructible from this error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeferredError {
    /// The Deferred was asked to follow a chain that leads back to itself.
    #[error("chaining cycle detected for deferred {0}")]
    ChainingCycle(DeferredId),
}

impl From<DeferredError> for String {
    fn from(error: DeferredError) -> Self {
        error.to_string()
    }
}

impl From<DeferredError> for Value {
    fn from(error: DeferredError) -> Self {
        Value::String(error.to_string())
    }
}
