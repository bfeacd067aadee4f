//! Shared fixtures for the cross-crate tests.
//!
//! [`TwoChains`] wires one engine to two independent in-memory ledgers, one
//! per asset, behind a [`LedgerRouter`], the way a node with a BTC wallet
//! and a Liquid wallet is set up.

use std::str::FromStr;
use std::sync::Arc;

use htlcswap_core::{
    AcceptTerms, Address, AssetId, EngineConfig, ManualClock, OfferTerms, SwapId, Timestamp,
};
use htlcswap_engine::SwapController;
use htlcswap_ledger::{LedgerRouter, MemoryLedger};
use rust_decimal::Decimal;

pub const START: Timestamp = 1_700_000_000;

pub fn btc() -> AssetId {
    AssetId::new("btc").unwrap()
}

pub fn depix() -> AssetId {
    AssetId::new("depix").unwrap()
}

pub fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub struct TwoChains {
    pub controller: SwapController,
    pub bitcoin: Arc<MemoryLedger>,
    pub liquid: Arc<MemoryLedger>,
    pub clock: Arc<ManualClock>,
}

impl TwoChains {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let bitcoin = Arc::new(
            MemoryLedger::new("ledger-bitcoin", clock.clone()).with_asset(btc(), dec("1")),
        );
        let liquid = Arc::new(
            MemoryLedger::new("ledger-liquid", clock.clone()).with_asset(depix(), dec("1000")),
        );

        let mut router = LedgerRouter::new();
        router.register(bitcoin.clone());
        router.register(liquid.clone());

        let controller = SwapController::new(Arc::new(router), clock.clone(), config).unwrap();
        Self {
            controller,
            bitcoin,
            liquid,
            clock,
        }
    }

    /// 0.001 BTC from `addrA` for 50 DePix.
    pub fn terms(&self) -> OfferTerms {
        OfferTerms {
            initiator_asset: btc(),
            initiator_amount: dec("0.001"),
            acceptor_asset: depix(),
            acceptor_amount: dec("50.0"),
            initiator_address: addr("addrA"),
            initiator_refund_address: Some(addr("refundA")),
        }
    }

    /// Create, accept and lock both legs.
    pub async fn both_locked(&self) -> SwapId {
        let offer = self.controller.create_offer(self.terms()).unwrap();
        self.controller
            .accept_offer(
                &offer.swap_id,
                AcceptTerms {
                    acceptor_address: addr("addrB"),
                    acceptor_refund_address: Some(addr("refundB")),
                },
            )
            .unwrap();
        self.controller.lock_initiator(&offer.swap_id).await.unwrap();
        self.controller.lock_acceptor(&offer.swap_id).await.unwrap();
        offer.swap_id
    }
}

impl Default for TwoChains {
    fn default() -> Self {
        Self::new()
    }
}
