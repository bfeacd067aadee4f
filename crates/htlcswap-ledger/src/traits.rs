use async_trait::async_trait;
use htlcswap_core::{Address, AssetId, TxRef};
use htlcswap_crypto::Secret;
use rust_decimal::Decimal;

use crate::error::LedgerError;
use crate::types::LockRequest;

/// Ledger adapter interface.
///
/// Each implementation bridges the swap engine to one or more concrete
/// chains (a Bitcoin wallet, an Elements node, an in-memory ledger). A call
/// returns only once the ledger has accepted the transaction; the returned
/// reference is what later calls use to address the lock.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Open an HTLC paying `request.recipient` against `request.hashlock`,
    /// refundable after `request.timelock`.
    async fn lock(&self, request: LockRequest) -> Result<TxRef, LedgerError>;

    /// Spend the HTLC created by `lock_tx` to `destination` by revealing `secret`.
    /// `destination` must be the recipient the lock was opened for.
    async fn claim(
        &self,
        asset: &AssetId,
        lock_tx: &TxRef,
        secret: &Secret,
        destination: &Address,
    ) -> Result<TxRef, LedgerError>;

    /// Return the funds of an expired HTLC to its funder.
    async fn refund(&self, asset: &AssetId, lock_tx: &TxRef) -> Result<TxRef, LedgerError>;

    /// Spendable balance of the adapter's funding wallet for `asset`.
    async fn balance(&self, asset: &AssetId) -> Result<Decimal, LedgerError>;

    /// Assets this adapter can lock.
    fn supported_assets(&self) -> Vec<AssetId>;

    /// Unique identifier of this adapter (e.g. "ledger-memory").
    fn adapter_id(&self) -> &str;
}
