use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use htlcswap_core::{Address, AssetId, TxRef};
use htlcswap_crypto::Secret;
use rust_decimal::Decimal;

use crate::error::LedgerError;
use crate::traits::LedgerAdapter;
use crate::types::LockRequest;

/// Dispatches ledger operations to the adapter registered for each asset.
///
/// The router is itself a [`LedgerAdapter`], so the engine holds a single
/// capability regardless of how many chains are wired in.
pub struct LedgerRouter {
    routes: HashMap<AssetId, Arc<dyn LedgerAdapter>>,
}

impl LedgerRouter {
    /// Create a router with no adapters registered.
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Register an adapter for every asset it reports as supported.
    ///
    /// A later registration for the same asset replaces the earlier one.
    pub fn register(&mut self, adapter: Arc<dyn LedgerAdapter>) {
        for asset in adapter.supported_assets() {
            self.register_for(asset, adapter.clone());
        }
    }

    /// Route a single asset to `adapter`.
    pub fn register_for(&mut self, asset: AssetId, adapter: Arc<dyn LedgerAdapter>) {
        tracing::info!(asset = %asset, adapter_id = %adapter.adapter_id(), "Registering ledger route");
        self.routes.insert(asset, adapter);
    }

    /// Remove the route for `asset`.
    pub fn unregister(&mut self, asset: &AssetId) -> Option<Arc<dyn LedgerAdapter>> {
        self.routes.remove(asset)
    }

    /// The adapter responsible for `asset`.
    pub fn adapter_for(&self, asset: &AssetId) -> Result<&Arc<dyn LedgerAdapter>, LedgerError> {
        self.routes
            .get(asset)
            .ok_or_else(|| LedgerError::UnsupportedAsset(asset.clone()))
    }

    /// Routed assets, sorted.
    pub fn assets(&self) -> Vec<AssetId> {
        let mut assets: Vec<AssetId> = self.routes.keys().cloned().collect();
        assets.sort();
        assets
    }

    /// Number of routed assets.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

impl Default for LedgerRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerAdapter for LedgerRouter {
    async fn lock(&self, request: LockRequest) -> Result<TxRef, LedgerError> {
        let adapter = self.adapter_for(&request.asset)?;
        adapter.lock(request).await
    }

    async fn claim(
        &self,
        asset: &AssetId,
        lock_tx: &TxRef,
        secret: &Secret,
        destination: &Address,
    ) -> Result<TxRef, LedgerError> {
        let adapter = self.adapter_for(asset)?;
        adapter.claim(asset, lock_tx, secret, destination).await
    }

    async fn refund(&self, asset: &AssetId, lock_tx: &TxRef) -> Result<TxRef, LedgerError> {
        let adapter = self.adapter_for(asset)?;
        adapter.refund(asset, lock_tx).await
    }

    async fn balance(&self, asset: &AssetId) -> Result<Decimal, LedgerError> {
        let adapter = self.adapter_for(asset)?;
        adapter.balance(asset).await
    }

    fn supported_assets(&self) -> Vec<AssetId> {
        self.assets()
    }

    fn adapter_id(&self) -> &str {
        "ledger-router"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryLedger;
    use htlcswap_core::ManualClock;

    fn asset(s: &str) -> AssetId {
        AssetId::new(s).unwrap()
    }

    fn memory(id: &str, assets: &[&str]) -> Arc<MemoryLedger> {
        let clock = Arc::new(ManualClock::new(0));
        let mut ledger = MemoryLedger::new(id, clock);
        for a in assets {
            ledger = ledger.with_asset(asset(a), Decimal::from(10));
        }
        Arc::new(ledger)
    }

    #[tokio::test]
    async fn test_register_routes_every_supported_asset() {
        let mut router = LedgerRouter::new();
        router.register(memory("btc-node", &["btc"]));
        router.register(memory("elements-node", &["depix", "lbtc"]));

        assert_eq!(router.route_count(), 3);
        assert_eq!(router.assets(), vec![asset("btc"), asset("depix"), asset("lbtc")]);
        assert_eq!(router.adapter_for(&asset("lbtc")).unwrap().adapter_id(), "elements-node");
    }

    #[tokio::test]
    async fn test_unknown_asset() {
        let router = LedgerRouter::default();
        let result = router.balance(&asset("doge")).await;
        assert!(matches!(result, Err(LedgerError::UnsupportedAsset(_))));
    }

    #[tokio::test]
    async fn test_register_for_overrides() {
        let mut router = LedgerRouter::new();
        router.register(memory("a", &["btc"]));
        router.register_for(asset("btc"), memory("b", &["btc"]));
        assert_eq!(router.adapter_for(&asset("btc")).unwrap().adapter_id(), "b");

        assert!(router.unregister(&asset("btc")).is_some());
        assert_eq!(router.route_count(), 0);
    }

    #[tokio::test]
    async fn test_balance_dispatch() {
        let mut router = LedgerRouter::new();
        router.register(memory("m", &["btc"]));
        assert_eq!(router.balance(&asset("btc")).await.unwrap(), Decimal::from(10));
        assert_eq!(router.adapter_id(), "ledger-router");
    }
}
