//! Semantic error categories. These are not exception classes: the engine
//! never throws across its public surface. Adapter failures are surfaced as
//! events; local failures are recovered locally and logged once.

use std::fmt;

/// Failure categories a load can resolve to. `Cancellation` is deliberately
/// not treated as an error by callers — it resolves the load, it never
/// rejects it.
#[derive(Clone, Debug)]
pub enum LoadError {
    /// The adapter rejected the call with a generic error.
    TransportFailure { message: String },
    /// Cursor-mode page N requested before page N-1's cursor was known.
    SequentialRequired { missing_page: u64 },
    /// Adapter returned a shape the core couldn't recognize as items.
    ProtocolMismatch,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::TransportFailure { message } => write!(f, "transport failure: {message}"),
            LoadError::SequentialRequired { missing_page } => {
                write!(f, "sequential load required: missing cursor for page {missing_page}")
            }
            LoadError::ProtocolMismatch => write!(f, "adapter response shape not recognized"),
        }
    }
}

impl std::error::Error for LoadError {}

/// A completed-but-discarded load: eviction aborted it, or the velocity gate
/// dropped it before dispatch. Not an error kind — it carries no message and
/// never increments a failure counter. Eviction-triggered cancellation
/// surfaces as `AbortSignal`: the abort channel carries no "why", only that
/// the in-flight transport was told to stop (eviction is the sole caller of
/// `AbortHandle::abort`, so the two are equivalent in practice).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    VelocityGate,
    DraggingResidual,
    AbortSignal,
    QueuePurged,
    QueueFull,
}

/// Logs a local invariant violation (NaN range, negative index, a sequential
/// cursor chain exceeding its depth ceiling, etc). Normalized to a safe
/// default by the caller and logged here; never propagated.
pub fn log_invariant_violation(detail: impl Into<String>) {
    log::warn!("viewport invariant violation (normalized to safe default): {}", detail.into());
}
