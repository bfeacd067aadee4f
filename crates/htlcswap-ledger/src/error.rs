use htlcswap_core::{AssetId, Timestamp, TxRef};
use rust_decimal::Decimal;

/// Ledger-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("lock transaction not found: {0}")]
    NotFound(TxRef),

    #[error("unsupported asset: {0}")]
    UnsupportedAsset(AssetId),

    #[error("lock {tx} holds {actual}, not {requested}")]
    AssetMismatch {
        tx: TxRef,
        requested: AssetId,
        actual: AssetId,
    },

    #[error("invalid HTLC state transition: {0}")]
    InvalidStateTransition(String),

    #[error("preimage mismatch for lock {0}")]
    PreimageMismatch(TxRef),

    #[error("lock {tx} expired at {timelock} (now {now})")]
    Expired {
        tx: TxRef,
        timelock: Timestamp,
        now: Timestamp,
    },

    #[error("lock {tx} not expired yet: expires at {timelock} (now {now})")]
    NotExpired {
        tx: TxRef,
        timelock: Timestamp,
        now: Timestamp,
    },

    #[error("insufficient {asset} balance: available {available}, required {required}")]
    InsufficientBalance {
        asset: AssetId,
        available: Decimal,
        required: Decimal,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("ledger call timed out: {0}")]
    Timeout(String),

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Whether repeating the same call may succeed without changing inputs.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LedgerError::Unavailable("rpc down".into()).is_retryable());
        assert!(LedgerError::Timeout("30s".into()).is_retryable());
        assert!(!LedgerError::PreimageMismatch(TxRef::new("tx")).is_retryable());
        assert!(!LedgerError::Rejected("dust".into()).is_retryable());
    }
}
