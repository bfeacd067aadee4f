//! Integration test: one engine driving two independent ledgers.
//!
//! Each leg of a swap lives on a different adapter behind the router, so
//! these tests check that locks, claims and refunds land on the right chain
//! and pay the right addresses.

use htlcswap_core::{AcceptTerms, AssetId, SwapStatus};
use htlcswap_crypto::commit;
use htlcswap_engine::EngineError;
use htlcswap_integration_tests::{addr, btc, dec, depix, TwoChains};
use htlcswap_ledger::{HtlcStatus, LedgerAdapter, LedgerError, LedgerOp};

// =========================================================================
// Happy path
// =========================================================================

#[tokio::test]
async fn test_swap_settles_on_both_chains() {
    let chains = TwoChains::new();
    let id = chains.both_locked().await;

    let offer = chains.controller.registry().get(&id).unwrap().to_offer();
    let btc_lock = offer.initiator_txid.clone().unwrap();
    let depix_lock = offer.acceptor_txid.clone().unwrap();

    // Each leg was opened on its own ledger, under the same hashlock.
    assert!(btc_lock.as_str().starts_with("ledger-bitcoin-lock-"));
    assert!(depix_lock.as_str().starts_with("ledger-liquid-lock-"));
    assert!(chains.liquid.contract(&btc_lock).is_none());
    assert!(chains.bitcoin.contract(&depix_lock).is_none());
    assert_eq!(chains.bitcoin.contract(&btc_lock).unwrap().hashlock, offer.hashlock);
    assert_eq!(chains.liquid.contract(&depix_lock).unwrap().hashlock, offer.hashlock);

    assert_eq!(chains.bitcoin.balance(&btc()).await.unwrap(), dec("0.999"));
    assert_eq!(chains.liquid.balance(&depix()).await.unwrap(), dec("950.0"));

    // Initiator claims DePix on Liquid, revealing the secret there.
    let receipt = chains.controller.claim_initiator(&id).await.unwrap();
    assert_eq!(receipt.status, SwapStatus::InitiatorClaimed);
    let revealed = chains.liquid.revealed_secret(&depix_lock).unwrap();
    assert_eq!(commit(&revealed), offer.hashlock);
    assert_eq!(chains.liquid.credited(&depix(), &addr("addrA")), dec("50.0"));

    // Acceptor uses the secret seen on Liquid to claim BTC on Bitcoin.
    let done = chains
        .controller
        .claim_acceptor(&id, Some(revealed))
        .await
        .unwrap();
    assert_eq!(done.status, SwapStatus::Completed);
    assert!(done.completed_at.is_some());
    assert_eq!(chains.bitcoin.credited(&btc(), &addr("addrB")), dec("0.001"));
    assert_eq!(
        chains.bitcoin.contract(&btc_lock).unwrap().status,
        HtlcStatus::Claimed
    );
}

#[tokio::test]
async fn test_several_swaps_share_the_router() {
    let chains = TwoChains::new();
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(chains.both_locked().await);
    }
    for id in &ids {
        chains.controller.claim_initiator(id).await.unwrap();
        chains.controller.claim_acceptor(id, None).await.unwrap();
    }

    assert_eq!(chains.liquid.credited(&depix(), &addr("addrA")), dec("150.0"));
    assert_eq!(chains.bitcoin.credited(&btc(), &addr("addrB")), dec("0.003"));
    assert_eq!(chains.bitcoin.balance(&btc()).await.unwrap(), dec("0.997"));
}

// =========================================================================
// Refunds
// =========================================================================

#[tokio::test]
async fn test_refund_returns_each_leg_on_its_own_chain() {
    let chains = TwoChains::new();
    let id = chains.both_locked().await;
    let offer = chains.controller.registry().get(&id).unwrap().to_offer();

    chains.clock.set(offer.initiator_timelock);
    let refunded = chains.controller.refund(&id).await.unwrap();

    assert_eq!(refunded.status, SwapStatus::Refunded);
    assert!(refunded
        .initiator_refund_txid
        .unwrap()
        .as_str()
        .starts_with("ledger-bitcoin-refund-"));
    assert!(refunded
        .acceptor_refund_txid
        .unwrap()
        .as_str()
        .starts_with("ledger-liquid-refund-"));
    assert_eq!(chains.bitcoin.credited(&btc(), &addr("refundA")), dec("0.001"));
    assert_eq!(chains.liquid.credited(&depix(), &addr("refundB")), dec("50.0"));
    assert_eq!(chains.bitcoin.credited(&btc(), &addr("addrB")), dec("0"));
}

#[tokio::test]
async fn test_refund_resumes_after_one_chain_fails() {
    let chains = TwoChains::new();
    let id = chains.both_locked().await;
    let offer = chains.controller.registry().get(&id).unwrap().to_offer();
    chains.clock.set(offer.initiator_timelock + 1);

    // Liquid refunds fine; Bitcoin is down for the initiator's leg.
    chains.bitcoin.fail_next(LedgerOp::Refund, 1);
    let err = chains.controller.refund(&id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::LedgerAdapterFailure {
            source: LedgerError::Unavailable(_),
            ..
        }
    ));
    assert!(err.is_retryable());

    let partial = chains.controller.registry().get(&id).unwrap().to_offer();
    assert_eq!(partial.status, SwapStatus::AcceptorLocked);
    assert!(partial.acceptor_refund_txid.is_some());
    assert!(partial.initiator_refund_txid.is_none());

    // Retry only touches the leg that is still locked.
    let refunded = chains.controller.refund(&id).await.unwrap();
    assert_eq!(refunded.status, SwapStatus::Refunded);
    assert_eq!(refunded.acceptor_refund_txid, partial.acceptor_refund_txid);
    assert_eq!(chains.liquid.credited(&depix(), &addr("refundB")), dec("50.0"));
    assert_eq!(chains.bitcoin.credited(&btc(), &addr("refundA")), dec("0.001"));
}

// =========================================================================
// Unsupported assets
// =========================================================================

#[tokio::test]
async fn test_unrouted_asset_fails_at_lock_and_keeps_status() {
    let chains = TwoChains::new();
    let mut terms = chains.terms();
    terms.initiator_asset = AssetId::new("lbtc").unwrap();

    let offer = chains.controller.create_offer(terms).unwrap();
    chains
        .controller
        .accept_offer(
            &offer.swap_id,
            AcceptTerms {
                acceptor_address: addr("addrB"),
                acceptor_refund_address: None,
            },
        )
        .unwrap();

    let err = chains
        .controller
        .lock_initiator(&offer.swap_id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::LedgerAdapterFailure {
            source: LedgerError::UnsupportedAsset(_),
            ..
        }
    ));
    assert!(!err.is_retryable());

    let record = chains.controller.registry().get(&offer.swap_id).unwrap();
    assert_eq!(record.status(), SwapStatus::Accepted);
    assert!(record.in_flight.is_none());
}
