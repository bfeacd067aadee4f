//! Swap lifecycle operations.
//!
//! Every operation is a compare-and-transition on one swap. Operations that
//! touch a ledger run in three steps: reserve the swap, call the adapter in
//! a spawned task, then commit the result or release the reservation. The
//! spawned task owns the commit, so dropping the caller's future can never
//! leave a broadcast transaction unrecorded.

use std::future::Future;
use std::sync::Arc;

use htlcswap_core::{
    AcceptTerms, Actor, Clock, EngineConfig, OfferTerms, SwapEvent, SwapId, SwapOffer,
    SwapStateMachine, SwapStatus, Timestamp, TimelockPolicy, TxRef,
};
use htlcswap_crypto::{commit, generate_secret_with_len, verify, Secret};
use htlcswap_ledger::{LedgerAdapter, LedgerError, LockRequest};
use serde::Serialize;

use crate::error::EngineError;
use crate::registry::{SwapRecord, SwapRegistry};

/// Result of `claim_initiator`: the secret is public from this point on.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimReceipt {
    pub swap_id: SwapId,
    pub status: SwapStatus,
    pub secret: Secret,
}

/// Drives swaps through their lifecycle.
pub struct SwapController {
    registry: Arc<SwapRegistry>,
    ledger: Arc<dyn LedgerAdapter>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    policy: TimelockPolicy,
}

/// Move `record` along the edge for `event`.
fn advance(record: &mut SwapRecord, event: SwapEvent) -> Result<(), EngineError> {
    let from = record.status();
    record.offer.status =
        SwapStateMachine::transition(from, event).map_err(|_| EngineError::IllegalTransition {
            swap_id: record.id(),
            status: from,
            operation: event,
        })?;
    Ok(())
}

fn require_tx(record: &SwapRecord, tx: &Option<TxRef>, leg: &str) -> Result<TxRef, EngineError> {
    tx.clone().ok_or_else(|| {
        EngineError::Internal(format!("swap {} has no {} lock transaction", record.id(), leg))
    })
}

/// Refunds need `timelock` to have passed.
fn require_expired(record: &SwapRecord, timelock: Timestamp, now: Timestamp) -> Result<(), EngineError> {
    if now < timelock {
        return Err(EngineError::TimelockNotExpired {
            swap_id: record.id(),
            timelock,
            now,
        });
    }
    Ok(())
}

impl SwapController {
    /// Create a controller with a fresh registry.
    pub fn new(
        ledger: Arc<dyn LedgerAdapter>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        Self::with_registry(Arc::new(SwapRegistry::new()), ledger, clock, config)
    }

    /// Create a controller over an existing registry.
    pub fn with_registry(
        registry: Arc<SwapRegistry>,
        ledger: Arc<dyn LedgerAdapter>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let policy = config.timelock_policy()?;
        Ok(Self {
            registry,
            ledger,
            clock,
            config,
            policy,
        })
    }

    pub fn registry(&self) -> Arc<SwapRegistry> {
        self.registry.clone()
    }

    pub fn ledger(&self) -> Arc<dyn LedgerAdapter> {
        self.ledger.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Publish a new offer with a fresh secret and timelocks.
    pub fn create_offer(&self, terms: OfferTerms) -> Result<SwapOffer, EngineError> {
        terms.validate()?;

        let secret = generate_secret_with_len(self.config.secret_len)?;
        let hashlock = commit(&secret);
        let now = self.clock.now();
        let timelocks = self.policy.compute(now, self.config.timelock_duration_secs)?;

        let offer = SwapOffer {
            swap_id: SwapId::new(),
            status: SwapStatus::Offered,
            initiator_asset: terms.initiator_asset,
            initiator_amount: terms.initiator_amount,
            acceptor_asset: terms.acceptor_asset,
            acceptor_amount: terms.acceptor_amount,
            initiator_address: terms.initiator_address,
            acceptor_address: None,
            initiator_refund_address: terms.initiator_refund_address,
            acceptor_refund_address: None,
            hashlock,
            initiator_timelock: timelocks.initiator,
            acceptor_timelock: timelocks.acceptor,
            initiator_txid: None,
            acceptor_txid: None,
            initiator_claim_txid: None,
            acceptor_claim_txid: None,
            initiator_refund_txid: None,
            acceptor_refund_txid: None,
            created_at: now,
            accepted_at: None,
            completed_at: None,
        };

        self.registry.insert(SwapRecord::new(offer.clone(), secret))?;
        tracing::info!(
            swap_id = %offer.swap_id,
            give = %offer.initiator_asset,
            take = %offer.acceptor_asset,
            hashlock = %offer.hashlock,
            "Swap offer created"
        );
        Ok(offer)
    }

    /// Bind a counterparty to an open offer.
    pub fn accept_offer(&self, id: &SwapId, terms: AcceptTerms) -> Result<SwapOffer, EngineError> {
        let now = self.clock.now();
        let (record, ()) =
            self.registry
                .compare_and_transition(id, SwapStatus::Offered, SwapEvent::Accept, |rec| {
                    if terms.acceptor_address == rec.offer.initiator_address {
                        return Err(EngineError::Validation(
                            "acceptor_address must differ from initiator_address".into(),
                        ));
                    }
                    rec.offer.acceptor_address = Some(terms.acceptor_address);
                    rec.offer.acceptor_refund_address = terms.acceptor_refund_address;
                    rec.offer.accepted_at = Some(now);
                    advance(rec, SwapEvent::Accept)
                })?;
        tracing::info!(swap_id = %id, status = %record.status(), "Swap offer accepted");
        Ok(record.to_offer())
    }

    /// Lock the initiator's leg, claimable by the acceptor until `initiator_timelock`.
    pub async fn lock_initiator(&self, id: &SwapId) -> Result<SwapOffer, EngineError> {
        let event = SwapEvent::LockInitiator;
        let record = self.reserve(id, SwapStatus::Accepted, event, |_, _| Ok(()))?;

        let offer = &record.offer;
        let recipient = match offer.acceptor_address.clone() {
            Some(addr) => addr,
            None => {
                let err = EngineError::Internal(format!("accepted swap {} has no acceptor_address", id));
                return Err(self.release(id, SwapStatus::Accepted, event, err));
            }
        };
        let request = LockRequest {
            asset: offer.initiator_asset.clone(),
            amount: offer.initiator_amount,
            hashlock: offer.hashlock,
            timelock: offer.initiator_timelock,
            recipient,
            refund_address: offer.initiator_refund_address.clone(),
        };

        let ledger = self.ledger.clone();
        let record = self
            .ledger_step(
                *id,
                SwapStatus::Accepted,
                event,
                async move { ledger.lock(request).await },
                move |rec, tx, _| {
                    rec.offer.initiator_txid = Some(tx);
                    advance(rec, event)
                },
            )
            .await?;
        Ok(record.to_offer())
    }

    /// Lock the acceptor's leg under the same hashlock, claimable by the
    /// initiator until `acceptor_timelock`.
    pub async fn lock_acceptor(&self, id: &SwapId) -> Result<SwapOffer, EngineError> {
        let event = SwapEvent::LockAcceptor;
        let record = self.reserve(id, SwapStatus::InitiatorLocked, event, |_, _| Ok(()))?;

        let offer = &record.offer;
        let request = LockRequest {
            asset: offer.acceptor_asset.clone(),
            amount: offer.acceptor_amount,
            hashlock: offer.hashlock,
            timelock: offer.acceptor_timelock,
            recipient: offer.initiator_address.clone(),
            refund_address: offer.acceptor_refund_address.clone(),
        };

        let ledger = self.ledger.clone();
        let record = self
            .ledger_step(
                *id,
                SwapStatus::InitiatorLocked,
                event,
                async move { ledger.lock(request).await },
                move |rec, tx, _| {
                    rec.offer.acceptor_txid = Some(tx);
                    advance(rec, event)
                },
            )
            .await?;
        Ok(record.to_offer())
    }

    /// Claim the acceptor's leg for the initiator, revealing the secret.
    pub async fn claim_initiator(&self, id: &SwapId) -> Result<ClaimReceipt, EngineError> {
        let event = SwapEvent::ClaimInitiator;
        let record = self.reserve(id, SwapStatus::AcceptorLocked, event, |rec, now| {
            if now >= rec.offer.acceptor_timelock {
                return Err(EngineError::TimelockExpired {
                    swap_id: rec.id(),
                    timelock: rec.offer.acceptor_timelock,
                    now,
                });
            }
            if !verify(&rec.secret, &rec.offer.hashlock) {
                return Err(EngineError::SecretMismatch(rec.id()));
            }
            Ok(())
        })?;

        let lock_tx = match require_tx(&record, &record.offer.acceptor_txid, "acceptor") {
            Ok(tx) => tx,
            Err(e) => return Err(self.release(id, SwapStatus::AcceptorLocked, event, e)),
        };
        let asset = record.offer.acceptor_asset.clone();
        let destination = record.offer.initiator_address.clone();
        let secret = record.secret.clone();

        let ledger = self.ledger.clone();
        let record = self
            .ledger_step(
                *id,
                SwapStatus::AcceptorLocked,
                event,
                async move { ledger.claim(&asset, &lock_tx, &secret, &destination).await },
                move |rec, tx, _| {
                    rec.offer.initiator_claim_txid = Some(tx);
                    advance(rec, event)
                },
            )
            .await?;

        tracing::info!(swap_id = %id, "Secret revealed");
        Ok(ClaimReceipt {
            swap_id: record.id(),
            status: record.status(),
            secret: record.secret.clone(),
        })
    }

    /// Claim the initiator's leg for the acceptor.
    ///
    /// A caller-supplied secret (as read from the initiator's claim) must
    /// open the hashlock; without one the engine uses the secret it holds.
    pub async fn claim_acceptor(
        &self,
        id: &SwapId,
        secret: Option<Secret>,
    ) -> Result<SwapOffer, EngineError> {
        let event = SwapEvent::ClaimAcceptor;
        let record = self.reserve(id, SwapStatus::InitiatorClaimed, event, |rec, now| {
            if let Some(supplied) = &secret {
                if !verify(supplied, &rec.offer.hashlock) {
                    return Err(EngineError::SecretMismatch(rec.id()));
                }
            }
            if now >= rec.offer.initiator_timelock {
                return Err(EngineError::TimelockExpired {
                    swap_id: rec.id(),
                    timelock: rec.offer.initiator_timelock,
                    now,
                });
            }
            Ok(())
        })?;

        let lock_tx = match require_tx(&record, &record.offer.initiator_txid, "initiator") {
            Ok(tx) => tx,
            Err(e) => return Err(self.release(id, SwapStatus::InitiatorClaimed, event, e)),
        };
        let destination = match record.offer.acceptor_address.clone() {
            Some(addr) => addr,
            None => {
                let err = EngineError::Internal(format!("swap {} has no acceptor_address", id));
                return Err(self.release(id, SwapStatus::InitiatorClaimed, event, err));
            }
        };
        let asset = record.offer.initiator_asset.clone();
        let secret = secret.unwrap_or_else(|| record.secret.clone());

        let ledger = self.ledger.clone();
        let record = self
            .ledger_step(
                *id,
                SwapStatus::InitiatorClaimed,
                event,
                async move { ledger.claim(&asset, &lock_tx, &secret, &destination).await },
                move |rec, tx, now| {
                    rec.offer.acceptor_claim_txid = Some(tx);
                    rec.offer.completed_at = Some(now);
                    advance(rec, event)
                },
            )
            .await?;
        Ok(record.to_offer())
    }

    /// Withdraw an offer nobody has accepted yet.
    pub fn cancel_offer(&self, id: &SwapId, actor: Actor) -> Result<SwapOffer, EngineError> {
        let event = SwapEvent::Cancel;
        let policy = self.config.cancel_policy;
        let now = self.clock.now();
        let (record, ()) = self
            .registry
            .compare_and_transition(id, SwapStatus::Offered, event, |rec| {
                if !policy.permits(actor) {
                    return Err(EngineError::Unauthorized {
                        swap_id: rec.id(),
                        actor,
                        operation: event,
                    });
                }
                rec.offer.completed_at = Some(now);
                advance(rec, event)
            })?;
        tracing::info!(swap_id = %id, actor = %actor, "Swap offer cancelled");
        Ok(record.to_offer())
    }

    /// Return locked legs to their funders as their timelocks pass.
    ///
    /// In `acceptor_locked` the acceptor's leg is refundable from
    /// `acceptor_timelock` on; the swap stays in `acceptor_locked` with
    /// `acceptor_refund_txid` set until `initiator_timelock` passes and the
    /// initiator's leg is refunded too. Each leg is its own ledger step and
    /// a leg whose refund is already recorded is skipped, so a refund
    /// interrupted by a ledger failure can simply be retried.
    pub async fn refund(&self, id: &SwapId) -> Result<SwapOffer, EngineError> {
        let event = SwapEvent::Refund;
        let current = self
            .registry
            .get(id)
            .ok_or(EngineError::NotFound(*id))?;
        let status = current.status();
        if !SwapStateMachine::can_transition(status, event) {
            return Err(EngineError::IllegalTransition {
                swap_id: *id,
                status,
                operation: event,
            });
        }

        if status == SwapStatus::AcceptorLocked {
            let record = self.reserve(id, status, event, |rec, now| {
                if rec.offer.acceptor_refund_txid.is_none() {
                    require_expired(rec, rec.offer.acceptor_timelock, now)?;
                }
                Ok(())
            })?;

            if record.offer.acceptor_refund_txid.is_some() {
                release_reservation(&self.registry, id, status, event);
            } else {
                let lock_tx = match require_tx(&record, &record.offer.acceptor_txid, "acceptor") {
                    Ok(tx) => tx,
                    Err(e) => return Err(self.release(id, status, event, e)),
                };
                let asset = record.offer.acceptor_asset.clone();
                let ledger = self.ledger.clone();
                let record = self
                    .ledger_step(
                        *id,
                        status,
                        event,
                        async move { ledger.refund(&asset, &lock_tx).await },
                        move |rec, tx, _| {
                            rec.offer.acceptor_refund_txid = Some(tx);
                            Ok(())
                        },
                    )
                    .await?;

                if self.clock.now() < record.offer.initiator_timelock {
                    tracing::info!(swap_id = %id, "Acceptor leg refunded, initiator leg still locked");
                    return Ok(record.to_offer());
                }
            }
        }

        let record = self.reserve(id, status, event, |rec, now| {
            if rec.status() == SwapStatus::AcceptorLocked && rec.offer.acceptor_refund_txid.is_none() {
                return Err(EngineError::Internal(format!(
                    "swap {} acceptor leg is still locked",
                    rec.id()
                )));
            }
            require_expired(rec, rec.offer.initiator_timelock, now)
        })?;
        let lock_tx = match require_tx(&record, &record.offer.initiator_txid, "initiator") {
            Ok(tx) => tx,
            Err(e) => return Err(self.release(id, status, event, e)),
        };
        let asset = record.offer.initiator_asset.clone();
        let ledger = self.ledger.clone();
        let record = self
            .ledger_step(
                *id,
                status,
                event,
                async move { ledger.refund(&asset, &lock_tx).await },
                move |rec, tx, now| {
                    rec.offer.initiator_refund_txid = Some(tx);
                    rec.offer.completed_at = Some(now);
                    advance(rec, event)
                },
            )
            .await?;
        tracing::info!(swap_id = %id, from = %status, "Swap refunded");
        Ok(record.to_offer())
    }

    /// Mark `event` in flight on a swap in status `expected`, after `check`
    /// passes. Returns the reserved record.
    fn reserve<C>(
        &self,
        id: &SwapId,
        expected: SwapStatus,
        event: SwapEvent,
        check: C,
    ) -> Result<SwapRecord, EngineError>
    where
        C: FnOnce(&SwapRecord, Timestamp) -> Result<(), EngineError>,
    {
        let now = self.clock.now();
        let (record, ()) = self
            .registry
            .compare_and_transition(id, expected, event, |rec| {
                if let Some(operation) = rec.in_flight {
                    return Err(EngineError::OperationInProgress {
                        swap_id: rec.id(),
                        operation,
                    });
                }
                check(rec, now)?;
                rec.in_flight = Some(event);
                Ok(())
            })?;
        tracing::debug!(swap_id = %id, operation = %event, "Reserved swap for ledger call");
        Ok(record)
    }

    /// Drop a reservation taken by `reserve` and hand back `err`.
    fn release(
        &self,
        id: &SwapId,
        expected: SwapStatus,
        event: SwapEvent,
        err: EngineError,
    ) -> EngineError {
        release_reservation(&self.registry, id, expected, event);
        err
    }

    /// Run a ledger call for a reserved swap and record its outcome.
    ///
    /// On success `apply` writes the transaction reference (and usually the
    /// next status) and the reservation is cleared in the same transition.
    /// On failure only the reservation is cleared.
    async fn ledger_step<Fut, A>(
        &self,
        id: SwapId,
        expected: SwapStatus,
        event: SwapEvent,
        call: Fut,
        apply: A,
    ) -> Result<SwapRecord, EngineError>
    where
        Fut: Future<Output = Result<TxRef, LedgerError>> + Send + 'static,
        A: FnOnce(&mut SwapRecord, TxRef, Timestamp) -> Result<(), EngineError> + Send + 'static,
    {
        let registry = self.registry.clone();
        let clock = self.clock.clone();

        let task = tokio::spawn(async move {
            match call.await {
                Ok(tx) => {
                    let now = clock.now();
                    let committed = registry.compare_and_transition(&id, expected, event, |rec| {
                        rec.in_flight = None;
                        apply(rec, tx, now)
                    });
                    match committed {
                        Ok((record, ())) => {
                            tracing::info!(
                                swap_id = %id,
                                operation = %event,
                                status = %record.status(),
                                "Ledger step committed"
                            );
                            Ok(record)
                        }
                        Err(e) => {
                            tracing::error!(swap_id = %id, operation = %event, error = %e, "Failed to commit ledger step");
                            release_reservation(&registry, &id, expected, event);
                            Err(e)
                        }
                    }
                }
                Err(source) => {
                    tracing::warn!(
                        swap_id = %id,
                        operation = %event,
                        error = %source,
                        retryable = source.is_retryable(),
                        "Ledger call failed, rolling back reservation"
                    );
                    release_reservation(&registry, &id, expected, event);
                    Err(EngineError::LedgerAdapterFailure {
                        swap_id: id,
                        operation: event,
                        source,
                    })
                }
            }
        });

        task.await
            .map_err(|e| EngineError::Internal(format!("ledger task for swap {} failed: {}", id, e)))?
    }
}

fn release_reservation(registry: &SwapRegistry, id: &SwapId, expected: SwapStatus, event: SwapEvent) {
    let released = registry.compare_and_transition(id, expected, event, |rec| {
        if rec.in_flight == Some(event) {
            rec.in_flight = None;
        }
        Ok(())
    });
    if let Err(e) = released {
        tracing::error!(swap_id = %id, operation = %event, error = %e, "Failed to release reservation");
    }
}
