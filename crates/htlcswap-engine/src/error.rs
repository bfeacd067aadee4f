use htlcswap_core::{Actor, CoreError, SwapEvent, SwapId, SwapStatus, Timestamp};
use htlcswap_crypto::CryptoError;
use htlcswap_ledger::LedgerError;

/// Engine-level errors returned by every swap operation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("swap not found: {0}")]
    NotFound(SwapId),

    #[error("cannot {operation} swap {swap_id} in status {status}")]
    IllegalTransition {
        swap_id: SwapId,
        status: SwapStatus,
        operation: SwapEvent,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("timelock of swap {swap_id} has not expired: expires at {timelock} (now {now})")]
    TimelockNotExpired {
        swap_id: SwapId,
        timelock: Timestamp,
        now: Timestamp,
    },

    #[error("timelock of swap {swap_id} expired at {timelock} (now {now})")]
    TimelockExpired {
        swap_id: SwapId,
        timelock: Timestamp,
        now: Timestamp,
    },

    #[error("secret does not open the hashlock of swap {0}")]
    SecretMismatch(SwapId),

    #[error("ledger call for {operation} on swap {swap_id} failed: {source}")]
    LedgerAdapterFailure {
        swap_id: SwapId,
        operation: SwapEvent,
        #[source]
        source: LedgerError,
    },

    #[error("swap {swap_id} already has {operation} in flight")]
    OperationInProgress {
        swap_id: SwapId,
        operation: SwapEvent,
    },

    #[error("{actor} is not allowed to {operation} swap {swap_id}")]
    Unauthorized {
        swap_id: SwapId,
        actor: Actor,
        operation: SwapEvent,
    },

    #[error("swap already exists: {0}")]
    AlreadyExists(SwapId),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::IllegalTransition { .. } => "illegal_transition",
            Self::Validation(_) => "validation",
            Self::TimelockNotExpired { .. } => "timelock_not_expired",
            Self::TimelockExpired { .. } => "timelock_expired",
            Self::SecretMismatch(_) => "secret_mismatch",
            Self::LedgerAdapterFailure { .. } => "ledger_adapter_failure",
            Self::OperationInProgress { .. } => "operation_in_progress",
            Self::Unauthorized { .. } => "unauthorized",
            Self::AlreadyExists(_) => "already_exists",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether repeating the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LedgerAdapterFailure { source, .. } => source.is_retryable(),
            Self::OperationInProgress { .. } | Self::TimelockNotExpired { .. } => true,
            _ => false,
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<CryptoError> for EngineError {
    fn from(err: CryptoError) -> Self {
        Self::Validation(err.to_string())
    }
}
