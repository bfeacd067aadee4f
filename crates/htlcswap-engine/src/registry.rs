//! Swap records and the per-swap compare-and-transition store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use htlcswap_core::{SwapEvent, SwapId, SwapOffer, SwapStateMachine, SwapStatus};
use htlcswap_crypto::Secret;

use crate::error::EngineError;

/// Full engine-side state of one swap.
#[derive(Debug, Clone)]
pub struct SwapRecord {
    /// Everything that may be shown to either party.
    pub offer: SwapOffer,
    /// Preimage of `offer.hashlock`. Revealed only by `claim_initiator`.
    pub secret: Secret,
    /// Ledger step reserved on this swap and not yet committed or rolled back.
    pub in_flight: Option<SwapEvent>,
}

impl SwapRecord {
    pub fn new(offer: SwapOffer, secret: Secret) -> Self {
        Self {
            offer,
            secret,
            in_flight: None,
        }
    }

    pub fn id(&self) -> SwapId {
        self.offer.swap_id
    }

    pub fn status(&self) -> SwapStatus {
        self.offer.status
    }

    /// Public projection, without the secret.
    pub fn to_offer(&self) -> SwapOffer {
        self.offer.clone()
    }

    /// Name of the first immutable field that differs from `before`, if any.
    fn changed_immutable_field(&self, before: &SwapRecord) -> Option<&'static str> {
        let (a, b) = (&self.offer, &before.offer);
        if a.swap_id != b.swap_id {
            return Some("swap_id");
        }
        if a.hashlock != b.hashlock || self.secret != before.secret {
            return Some("hashlock");
        }
        if a.initiator_asset != b.initiator_asset || a.acceptor_asset != b.acceptor_asset {
            return Some("asset");
        }
        if a.initiator_amount != b.initiator_amount || a.acceptor_amount != b.acceptor_amount {
            return Some("amount");
        }
        if a.initiator_address != b.initiator_address {
            return Some("initiator_address");
        }
        if b.acceptor_address.is_some() && a.acceptor_address != b.acceptor_address {
            return Some("acceptor_address");
        }
        if a.initiator_timelock != b.initiator_timelock || a.acceptor_timelock != b.acceptor_timelock {
            return Some("timelock");
        }
        if a.created_at != b.created_at {
            return Some("created_at");
        }
        None
    }
}

/// Concurrent store of swap records.
///
/// Each swap sits behind its own mutex; the map shard lock is held only
/// long enough to clone the handle, so operations on unrelated swaps never
/// wait on each other.
pub struct SwapRegistry {
    swaps: DashMap<SwapId, Arc<Mutex<SwapRecord>>>,
}

fn lock(handle: &Mutex<SwapRecord>) -> MutexGuard<'_, SwapRecord> {
    // Mutators run on a copy, so a panic inside one never leaves a half-written record.
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SwapRegistry {
    pub fn new() -> Self {
        Self {
            swaps: DashMap::new(),
        }
    }

    fn handle(&self, id: &SwapId) -> Result<Arc<Mutex<SwapRecord>>, EngineError> {
        self.swaps
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(EngineError::NotFound(*id))
    }

    /// Store a new record. Fails if the id is already taken.
    pub fn insert(&self, record: SwapRecord) -> Result<(), EngineError> {
        match self.swaps.entry(record.id()) {
            Entry::Occupied(entry) => Err(EngineError::AlreadyExists(*entry.key())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Mutex::new(record)));
                Ok(())
            }
        }
    }

    /// Snapshot of one record.
    pub fn get(&self, id: &SwapId) -> Option<SwapRecord> {
        let handle = self.handle(id).ok()?;
        let record = lock(&handle).clone();
        Some(record)
    }

    /// Atomically check the status of a swap and apply `mutate` to it.
    ///
    /// Under the swap's lock: the current status must equal `expected`
    /// (otherwise `IllegalTransition` naming `operation`), then `mutate`
    /// runs on a copy. The copy is published only if the mutator succeeded,
    /// its status is `expected` or a legal successor, and no immutable
    /// field changed. Returns the published record and the mutator's value.
    pub fn compare_and_transition<T, F>(
        &self,
        id: &SwapId,
        expected: SwapStatus,
        operation: SwapEvent,
        mutate: F,
    ) -> Result<(SwapRecord, T), EngineError>
    where
        F: FnOnce(&mut SwapRecord) -> Result<T, EngineError>,
    {
        let handle = self.handle(id)?;
        let mut current = lock(&handle);

        if current.status() != expected {
            return Err(EngineError::IllegalTransition {
                swap_id: *id,
                status: current.status(),
                operation,
            });
        }

        let mut next = current.clone();
        let value = mutate(&mut next)?;

        let new_status = next.status();
        if new_status != expected && !SwapStateMachine::is_edge(expected, new_status) {
            return Err(EngineError::Internal(format!(
                "{} on swap {} attempted {} -> {}",
                operation, id, expected, new_status
            )));
        }
        if let Some(field) = next.changed_immutable_field(&current) {
            return Err(EngineError::Internal(format!(
                "{} on swap {} attempted to change immutable field {}",
                operation, id, field
            )));
        }

        *current = next.clone();
        Ok((next, value))
    }

    /// Snapshot of every record, each taken under its own lock.
    ///
    /// Every record is internally consistent, never a half-applied
    /// transition. The set as a whole is not an atomic cut across swaps.
    pub fn snapshot(&self) -> Vec<SwapRecord> {
        let handles: Vec<Arc<Mutex<SwapRecord>>> =
            self.swaps.iter().map(|entry| entry.value().clone()).collect();
        handles.iter().map(|h| lock(h).clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.swaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swaps.is_empty()
    }
}

impl Default for SwapRegistry {
    fn default() -> Self {
        Self::new()
    }
}
