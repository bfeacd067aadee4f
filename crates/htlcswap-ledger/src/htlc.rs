use chrono::{DateTime, Utc};
use dashmap::DashMap;
use htlcswap_core::{Address, AssetId, Hashlock, Timestamp, TxRef};
use htlcswap_crypto::Secret;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::types::LockRequest;

/// Status of a Hash Time-Locked Contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HtlcStatus {
    /// HTLC is funded and awaiting claim or expiry.
    Active,
    /// The recipient claimed the HTLC by revealing the preimage.
    Claimed,
    /// The HTLC expired and funds went back to the funder.
    Refunded,
}

impl std::fmt::Display for HtlcStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Claimed => write!(f, "Claimed"),
            Self::Refunded => write!(f, "Refunded"),
        }
    }
}

/// A Hash Time-Locked Contract on one leg of a swap.
#[derive(Debug, Clone)]
pub struct HtlcContract {
    /// Reference of the funding transaction.
    pub lock_tx: TxRef,
    pub asset: AssetId,
    pub amount: Decimal,
    /// SHA-256 of the preimage; the recipient must reveal the preimage to claim.
    pub hashlock: Hashlock,
    /// Absolute expiry in seconds since UNIX epoch.
    pub timelock: Timestamp,
    pub recipient: Address,
    pub refund_address: Option<Address>,
    pub status: HtlcStatus,
    /// Spending transaction, once claimed or refunded.
    pub spend_tx: Option<TxRef>,
    /// Preimage published by the claim, readable by anyone afterwards.
    pub revealed_secret: Option<Secret>,
    pub created_at: DateTime<Utc>,
}

/// Book of HTLCs keyed by funding transaction.
///
/// Thread-safe: uses `DashMap` for concurrent access. Each mutation holds
/// the entry for the duration of its check-and-update.
pub struct HtlcBook {
    htlcs: DashMap<TxRef, HtlcContract>,
}

impl HtlcBook {
    /// Create a new, empty book.
    pub fn new() -> Self {
        Self {
            htlcs: DashMap::new(),
        }
    }

    /// Record a funded HTLC under `lock_tx`.
    pub fn open(&self, lock_tx: TxRef, request: LockRequest) -> HtlcContract {
        let htlc = HtlcContract {
            lock_tx: lock_tx.clone(),
            asset: request.asset,
            amount: request.amount,
            hashlock: request.hashlock,
            timelock: request.timelock,
            recipient: request.recipient,
            refund_address: request.refund_address,
            status: HtlcStatus::Active,
            spend_tx: None,
            revealed_secret: None,
            created_at: Utc::now(),
        };
        self.htlcs.insert(lock_tx.clone(), htlc.clone());
        tracing::info!(lock_tx = %lock_tx, asset = %htlc.asset, "HTLC opened");
        htlc
    }

    /// Claim an HTLC by revealing the preimage.
    ///
    /// Fails once `now` reaches the timelock, or if SHA-256 of the preimage
    /// does not match the stored hashlock.
    pub fn claim(
        &self,
        lock_tx: &TxRef,
        secret: &Secret,
        spend_tx: TxRef,
        now: Timestamp,
    ) -> Result<HtlcContract, LedgerError> {
        let mut entry = self
            .htlcs
            .get_mut(lock_tx)
            .ok_or_else(|| LedgerError::NotFound(lock_tx.clone()))?;

        let htlc = entry.value_mut();

        if htlc.status != HtlcStatus::Active {
            return Err(LedgerError::InvalidStateTransition(format!(
                "cannot claim HTLC in status {}",
                htlc.status
            )));
        }

        if now >= htlc.timelock {
            return Err(LedgerError::Expired {
                tx: lock_tx.clone(),
                timelock: htlc.timelock,
                now,
            });
        }

        if !htlcswap_crypto::verify(secret, &htlc.hashlock) {
            return Err(LedgerError::PreimageMismatch(lock_tx.clone()));
        }

        htlc.status = HtlcStatus::Claimed;
        htlc.spend_tx = Some(spend_tx);
        htlc.revealed_secret = Some(secret.clone());
        tracing::info!(lock_tx = %lock_tx, "HTLC claimed");
        Ok(htlc.clone())
    }

    /// Refund an HTLC whose timelock has passed.
    pub fn refund(
        &self,
        lock_tx: &TxRef,
        spend_tx: TxRef,
        now: Timestamp,
    ) -> Result<HtlcContract, LedgerError> {
        let mut entry = self
            .htlcs
            .get_mut(lock_tx)
            .ok_or_else(|| LedgerError::NotFound(lock_tx.clone()))?;

        let htlc = entry.value_mut();

        if htlc.status != HtlcStatus::Active {
            return Err(LedgerError::InvalidStateTransition(format!(
                "cannot refund HTLC in status {}",
                htlc.status
            )));
        }

        if now < htlc.timelock {
            return Err(LedgerError::NotExpired {
                tx: lock_tx.clone(),
                timelock: htlc.timelock,
                now,
            });
        }

        htlc.status = HtlcStatus::Refunded;
        htlc.spend_tx = Some(spend_tx);
        tracing::info!(lock_tx = %lock_tx, "HTLC refunded");
        Ok(htlc.clone())
    }

    /// Count active HTLCs whose timelock has passed at `now`.
    pub fn count_expired(&self, now: Timestamp) -> usize {
        self.htlcs
            .iter()
            .filter(|entry| entry.status == HtlcStatus::Active && now >= entry.timelock)
            .count()
    }

    /// Get an HTLC by its funding transaction.
    pub fn get(&self, lock_tx: &TxRef) -> Option<HtlcContract> {
        self.htlcs.get(lock_tx).map(|entry| entry.clone())
    }

    /// Get the number of tracked HTLCs.
    pub fn len(&self) -> usize {
        self.htlcs.len()
    }

    /// Check if the book has no HTLCs.
    pub fn is_empty(&self) -> bool {
        self.htlcs.is_empty()
    }
}

impl Default for HtlcBook {
    fn default() -> Self {
        Self::new()
    }
}
