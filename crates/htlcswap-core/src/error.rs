use crate::state_machine::{SwapEvent, SwapStatus};

/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("illegal transition: cannot apply {event} to a swap in status {from}")]
    InvalidStateTransition { from: SwapStatus, event: SwapEvent },

    #[error("validation failed: {0}")]
    ValidationError(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid timelock: {0}")]
    InvalidTimelock(String),

    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("unknown swap status: {0}")]
    UnknownStatus(String),
}
