use std::fmt;

use htlcswap_core::{Address, AssetId, Hashlock, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Parameters for opening an HTLC on one leg of a swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRequest {
    /// Asset being locked.
    pub asset: AssetId,
    /// Quantity, in the asset's native unit.
    pub amount: Decimal,
    /// Commitment the claimant must open.
    pub hashlock: Hashlock,
    /// Absolute expiry after which the funder can refund.
    pub timelock: Timestamp,
    /// Party that can claim with the secret.
    pub recipient: Address,
    /// Where a refund goes. `None` returns funds to the funding wallet.
    pub refund_address: Option<Address>,
}

/// Operations of the ledger capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerOp {
    Lock,
    Claim,
    Refund,
    Balance,
}

impl fmt::Display for LedgerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lock => write!(f, "lock"),
            Self::Claim => write!(f, "claim"),
            Self::Refund => write!(f, "refund"),
            Self::Balance => write!(f, "balance"),
        }
    }
}
