use crate::state::{PromiseState, SettleEvent};
use crate::types::PromiseId;

/// Misuse of the one-shot promise invariants.
///
/// These are never produced by user code; values passed to `reject` or
/// returned as `Err` from executors and callbacks travel down the chain as
/// the promise's own error type instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromiseError {
    #[error("promise already settled ({state}), cannot {event}")]
    AlreadySettled {
        state: PromiseState,
        event: SettleEvent,
    },

    #[error("promise {promise} already has a continuation, then()/catch() may be attached once")]
    AlreadyHasContinuation { promise: PromiseId },

    #[error("promise {promise} already has a deferred notification outstanding")]
    DoubleScheduled { promise: PromiseId },

    #[error("scheduler drain exceeded its budget of {budget} tasks ({remaining} still queued)")]
    DrainBudgetExceeded { budget: usize, remaining: usize },
}
