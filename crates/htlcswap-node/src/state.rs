//! Shared node state for the HTTP handlers.

use std::sync::Arc;
use std::time::Instant;

use htlcswap_core::Clock;
use htlcswap_engine::{SwapController, SwapQuery};
use htlcswap_ledger::{LedgerAdapter, LedgerRouter, MemoryLedger};

use crate::config::SwapNodeConfig;

/// Shared state for the running node, accessible from HTTP handlers.
pub struct AppState {
    pub controller: SwapController,
    pub query: SwapQuery,
    /// When the node started.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(controller: SwapController) -> Self {
        let query = SwapQuery::new(controller.registry());
        Self {
            controller,
            query,
            start_time: Instant::now(),
        }
    }

    /// Wire the configured ledgers behind a router and build the engine.
    pub fn from_config(config: &SwapNodeConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let ledger = build_ledger(config, clock.clone());
        let controller = SwapController::new(ledger, clock, config.engine.clone())?;
        Ok(Self::new(controller))
    }
}

fn build_ledger(config: &SwapNodeConfig, clock: Arc<dyn Clock>) -> Arc<dyn LedgerAdapter> {
    let mut router = LedgerRouter::new();
    for entry in &config.ledgers {
        let mut ledger = MemoryLedger::new(entry.id.clone(), clock.clone()).with_latency(entry.latency());
        for (asset, balance) in &entry.balances {
            ledger = ledger.with_asset(asset.clone(), *balance);
        }
        router.register(Arc::new(ledger));
    }
    Arc::new(router)
}
