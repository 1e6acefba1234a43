use std::fmt;

use crate::error::PromiseError;

/// The states of a settlement core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PromiseState {
    /// Nothing has been decided yet.
    Pending,
    /// Waiting on a nested thenable whose outcome this core will mirror.
    Adopting,
    /// Settled with a value. Final state.
    Fulfilled,
    /// Settled with an error. Final state.
    Rejected,
}

impl PromiseState {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Fulfilled | Self::Rejected)
    }
}

impl fmt::Display for PromiseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Adopting => write!(f, "Adopting"),
            Self::Fulfilled => write!(f, "Fulfilled"),
            Self::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Events that trigger settlement transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SettleEvent {
    /// Fulfill with a plain (non-thenable) value.
    Fulfill,
    /// Fulfill with a thenable, adopting its eventual outcome.
    Adopt,
    /// Reject with an error.
    Reject,
}

impl fmt::Display for SettleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fulfill => write!(f, "fulfill"),
            Self::Adopt => write!(f, "adopt"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Settlement transition table.
///
/// Valid transitions:
/// - Pending → Fulfilled (Fulfill)
/// - Pending → Adopting (Adopt)
/// - Pending → Rejected (Reject)
/// - Adopting → Fulfilled (Fulfill, the nested thenable fulfilled)
/// - Adopting → Adopting (Adopt, the nested thenable resolved with another)
/// - Adopting → Rejected (Reject)
///
/// Nothing leaves a final state.
pub struct PromiseStateMachine;

impl PromiseStateMachine {
    /// Attempt a transition. Returns the new state, or `AlreadySettled`
    /// when `current` is final.
    pub fn transition(current: PromiseState, event: SettleEvent) -> Result<PromiseState, PromiseError> {
        let new_state = match (current, event) {
            (PromiseState::Pending | PromiseState::Adopting, SettleEvent::Fulfill) => {
                PromiseState::Fulfilled
            }
            (PromiseState::Pending | PromiseState::Adopting, SettleEvent::Adopt) => {
                PromiseState::Adopting
            }
            (PromiseState::Pending | PromiseState::Adopting, SettleEvent::Reject) => {
                PromiseState::Rejected
            }
            (PromiseState::Fulfilled | PromiseState::Rejected, _) => {
                return Err(PromiseError::AlreadySettled {
                    state: current,
                    event,
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = %event,
            "promise state transition"
        );

        Ok(new_state)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: PromiseState, event: SettleEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
