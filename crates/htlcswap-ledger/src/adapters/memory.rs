use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use htlcswap_core::{Address, AssetId, Clock, TxRef};
use htlcswap_crypto::Secret;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::htlc::{HtlcBook, HtlcContract};
use crate::traits::LedgerAdapter;
use crate::types::{LedgerOp, LockRequest};

/// In-memory HTLC ledger.
///
/// Keeps a funding wallet balance per asset, a book of HTLCs, and the
/// amounts credited to external addresses by claims and refunds. Timelocks
/// are checked against the injected clock, so tests can move time without
/// sleeping. Useful for tests and for running a node with no chain access.
pub struct MemoryLedger {
    id: String,
    clock: Arc<dyn Clock>,
    /// Funding wallet balance per asset. Presence of a key means the asset is supported.
    wallet: DashMap<AssetId, Decimal>,
    /// Amounts received by external addresses: (asset, address) -> total.
    credits: DashMap<(AssetId, Address), Decimal>,
    book: HtlcBook,
    latency: Duration,
    /// Number of upcoming calls per operation that fail with `Unavailable`.
    faults: DashMap<LedgerOp, u32>,
}

impl MemoryLedger {
    /// Create a ledger with no assets.
    pub fn new(id: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            id: id.into(),
            clock,
            wallet: DashMap::new(),
            credits: DashMap::new(),
            book: HtlcBook::new(),
            latency: Duration::ZERO,
            faults: DashMap::new(),
        }
    }

    /// Support `asset` with an initial funding balance.
    pub fn with_asset(self, asset: AssetId, balance: Decimal) -> Self {
        self.wallet.insert(asset, balance);
        self
    }

    /// Delay every call by `latency`, standing in for network confirmation time.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Add funds to the wallet for a supported asset.
    pub fn fund(&self, asset: &AssetId, amount: Decimal) -> Result<(), LedgerError> {
        let mut balance = self
            .wallet
            .get_mut(asset)
            .ok_or_else(|| LedgerError::UnsupportedAsset(asset.clone()))?;
        *balance += amount;
        Ok(())
    }

    /// Make the next `count` calls of `op` fail with a retryable error.
    pub fn fail_next(&self, op: LedgerOp, count: u32) {
        *self.faults.entry(op).or_insert(0) += count;
    }

    /// Total credited to `address` in `asset` by claims and refunds.
    pub fn credited(&self, asset: &AssetId, address: &Address) -> Decimal {
        self.credits
            .get(&(asset.clone(), address.clone()))
            .map(|v| *v)
            .unwrap_or(Decimal::ZERO)
    }

    /// Look up an HTLC by its funding transaction.
    pub fn contract(&self, lock_tx: &TxRef) -> Option<HtlcContract> {
        self.book.get(lock_tx)
    }

    /// The preimage published by claiming `lock_tx`, as an observer of the
    /// chain would read it.
    pub fn revealed_secret(&self, lock_tx: &TxRef) -> Option<Secret> {
        self.book.get(lock_tx).and_then(|htlc| htlc.revealed_secret)
    }

    /// Number of HTLCs past their timelock that nobody has spent.
    pub fn expired_lock_count(&self) -> usize {
        self.book.count_expired(self.clock.now())
    }

    async fn enter(&self, op: LedgerOp) -> Result<(), LedgerError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(mut remaining) = self.faults.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                tracing::warn!(adapter_id = %self.id, op = %op, "injected ledger fault");
                return Err(LedgerError::Unavailable(format!("injected {} fault", op)));
            }
        }
        Ok(())
    }

    fn ensure_supported(&self, asset: &AssetId) -> Result<(), LedgerError> {
        if self.wallet.contains_key(asset) {
            Ok(())
        } else {
            Err(LedgerError::UnsupportedAsset(asset.clone()))
        }
    }

    fn next_tx(&self, kind: &str) -> TxRef {
        TxRef::new(format!("{}-{}-{}", self.id, kind, Uuid::now_v7().simple()))
    }

    fn credit(&self, asset: &AssetId, address: &Address, amount: Decimal) {
        self.credits
            .entry((asset.clone(), address.clone()))
            .and_modify(|b| *b += amount)
            .or_insert(amount);
    }

    fn contract_for(&self, asset: &AssetId, lock_tx: &TxRef) -> Result<HtlcContract, LedgerError> {
        let htlc = self
            .book
            .get(lock_tx)
            .ok_or_else(|| LedgerError::NotFound(lock_tx.clone()))?;
        if &htlc.asset != asset {
            return Err(LedgerError::AssetMismatch {
                tx: lock_tx.clone(),
                requested: asset.clone(),
                actual: htlc.asset,
            });
        }
        Ok(htlc)
    }
}

#[async_trait]
impl LedgerAdapter for MemoryLedger {
    async fn lock(&self, request: LockRequest) -> Result<TxRef, LedgerError> {
        self.enter(LedgerOp::Lock).await?;
        if request.amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(request.amount));
        }

        {
            let mut balance = self
                .wallet
                .get_mut(&request.asset)
                .ok_or_else(|| LedgerError::UnsupportedAsset(request.asset.clone()))?;
            if *balance < request.amount {
                return Err(LedgerError::InsufficientBalance {
                    asset: request.asset.clone(),
                    available: *balance,
                    required: request.amount,
                });
            }
            *balance -= request.amount;
        }

        let lock_tx = self.next_tx("lock");
        self.book.open(lock_tx.clone(), request);
        Ok(lock_tx)
    }

    async fn claim(
        &self,
        asset: &AssetId,
        lock_tx: &TxRef,
        secret: &Secret,
        destination: &Address,
    ) -> Result<TxRef, LedgerError> {
        self.enter(LedgerOp::Claim).await?;
        self.ensure_supported(asset)?;
        let contract = self.contract_for(asset, lock_tx)?;
        if &contract.recipient != destination {
            return Err(LedgerError::Rejected(format!(
                "lock {} pays {}, not {}",
                lock_tx, contract.recipient, destination
            )));
        }

        let spend_tx = self.next_tx("claim");
        let htlc = self
            .book
            .claim(lock_tx, secret, spend_tx.clone(), self.clock.now())?;
        self.credit(asset, destination, htlc.amount);
        tracing::info!(
            adapter_id = %self.id,
            lock_tx = %lock_tx,
            claim_tx = %spend_tx,
            destination = %destination,
            "memory ledger claim"
        );
        Ok(spend_tx)
    }

    async fn refund(&self, asset: &AssetId, lock_tx: &TxRef) -> Result<TxRef, LedgerError> {
        self.enter(LedgerOp::Refund).await?;
        self.ensure_supported(asset)?;
        self.contract_for(asset, lock_tx)?;

        let spend_tx = self.next_tx("refund");
        let htlc = self
            .book
            .refund(lock_tx, spend_tx.clone(), self.clock.now())?;
        match &htlc.refund_address {
            Some(address) => self.credit(asset, address, htlc.amount),
            None => {
                self.wallet
                    .entry(asset.clone())
                    .and_modify(|b| *b += htlc.amount)
                    .or_insert(htlc.amount);
            }
        }
        tracing::info!(adapter_id = %self.id, lock_tx = %lock_tx, refund_tx = %spend_tx, "memory ledger refund");
        Ok(spend_tx)
    }

    async fn balance(&self, asset: &AssetId) -> Result<Decimal, LedgerError> {
        self.enter(LedgerOp::Balance).await?;
        self.wallet
            .get(asset)
            .map(|b| *b)
            .ok_or_else(|| LedgerError::UnsupportedAsset(asset.clone()))
    }

    fn supported_assets(&self) -> Vec<AssetId> {
        let mut assets: Vec<AssetId> = self.wallet.iter().map(|e| e.key().clone()).collect();
        assets.sort();
        assets
    }

    fn adapter_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use htlcswap_core::ManualClock;
    use htlcswap_crypto::{commit, generate_secret};

    const NOW: i64 = 1_700_000_000;

    fn btc() -> AssetId {
        AssetId::new("btc").unwrap()
    }

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn ledger() -> (MemoryLedger, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(NOW));
        let ledger = MemoryLedger::new("mem", clock.clone()).with_asset(btc(), Decimal::from(1));
        (ledger, clock)
    }

    fn lock_req(secret: &Secret, amount: Decimal, refund: Option<Address>) -> LockRequest {
        LockRequest {
            asset: btc(),
            amount,
            hashlock: commit(secret),
            timelock: NOW + 100,
            recipient: addr("bob"),
            refund_address: refund,
        }
    }

    #[tokio::test]
    async fn test_lock_debits_wallet() {
        let (ledger, _) = ledger();
        let secret = generate_secret();
        let tx = ledger.lock(lock_req(&secret, Decimal::new(25, 2), None)).await.unwrap();

        assert_eq!(ledger.balance(&btc()).await.unwrap(), Decimal::new(75, 2));
        assert!(tx.as_str().starts_with("mem-lock-"));
        assert!(ledger.contract(&tx).is_some());
    }

    #[tokio::test]
    async fn test_lock_insufficient_balance() {
        let (ledger, _) = ledger();
        let result = ledger
            .lock(lock_req(&generate_secret(), Decimal::from(2), None))
            .await;
        assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
        assert_eq!(ledger.balance(&btc()).await.unwrap(), Decimal::from(1));
    }

    #[tokio::test]
    async fn test_claim_credits_destination_and_reveals_secret() {
        let (ledger, _) = ledger();
        let secret = generate_secret();
        let tx = ledger.lock(lock_req(&secret, Decimal::new(5, 1), None)).await.unwrap();

        ledger.claim(&btc(), &tx, &secret, &addr("bob")).await.unwrap();
        assert_eq!(ledger.credited(&btc(), &addr("bob")), Decimal::new(5, 1));
        assert_eq!(ledger.revealed_secret(&tx), Some(secret));
    }

    #[tokio::test]
    async fn test_refund_to_wallet_or_address() {
        let (ledger, clock) = ledger();
        let a = ledger
            .lock(lock_req(&generate_secret(), Decimal::new(2, 1), None))
            .await
            .unwrap();
        let b = ledger
            .lock(lock_req(&generate_secret(), Decimal::new(3, 1), Some(addr("alice-refund"))))
            .await
            .unwrap();
        assert_eq!(ledger.expired_lock_count(), 0);

        clock.advance(100);
        assert_eq!(ledger.expired_lock_count(), 2);
        ledger.refund(&btc(), &a).await.unwrap();
        ledger.refund(&btc(), &b).await.unwrap();

        assert_eq!(ledger.balance(&btc()).await.unwrap(), Decimal::new(7, 1));
        assert_eq!(ledger.credited(&btc(), &addr("alice-refund")), Decimal::new(3, 1));
        assert_eq!(ledger.expired_lock_count(), 0);
    }

    #[tokio::test]
    async fn test_fault_injection_is_one_shot() {
        let (ledger, _) = ledger();
        ledger.fail_next(LedgerOp::Lock, 1);

        let req = lock_req(&generate_secret(), Decimal::new(1, 1), None);
        let err = ledger.lock(req.clone()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(ledger.balance(&btc()).await.unwrap(), Decimal::from(1));

        assert!(ledger.lock(req).await.is_ok());
    }

    #[tokio::test]
    async fn test_asset_mismatch() {
        let (ledger, _) = ledger();
        let ledger = ledger.with_asset(AssetId::new("depix").unwrap(), Decimal::from(100));
        let secret = generate_secret();
        let tx = ledger.lock(lock_req(&secret, Decimal::new(1, 1), None)).await.unwrap();

        let result = ledger
            .claim(&AssetId::new("depix").unwrap(), &tx, &secret, &addr("bob"))
            .await;
        assert!(matches!(result, Err(LedgerError::AssetMismatch { .. })));
    }

    #[tokio::test]
    async fn test_fund_and_supported_assets() {
        let (ledger, _) = ledger();
        ledger.fund(&btc(), Decimal::from(2)).unwrap();
        assert_eq!(ledger.balance(&btc()).await.unwrap(), Decimal::from(3));
        assert!(ledger.fund(&AssetId::new("eth").unwrap(), Decimal::ONE).is_err());
        assert_eq!(ledger.supported_assets(), vec![btc()]);
        assert_eq!(ledger.adapter_id(), "mem");
    }
}
