use std::collections::BTreeMap;
use std::sync::Arc;

use htlcswap_core::{SwapId, SwapOffer, SwapStatus};

use crate::error::EngineError;
use crate::registry::SwapRegistry;

/// Which offers a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OfferFilter {
    #[default]
    All,
    Status(SwapStatus),
    /// Offers waiting for a counterparty.
    Open,
    /// Accepted swaps that have not reached a terminal state.
    Active,
}

impl OfferFilter {
    pub fn matches(&self, status: SwapStatus) -> bool {
        match self {
            Self::All => true,
            Self::Status(s) => *s == status,
            Self::Open => status.is_open(),
            Self::Active => status.is_active(),
        }
    }
}

/// Read-only view over the registry.
#[derive(Clone)]
pub struct SwapQuery {
    registry: Arc<SwapRegistry>,
}

impl SwapQuery {
    pub fn new(registry: Arc<SwapRegistry>) -> Self {
        Self { registry }
    }

    /// Offers matching `filter`, newest first. Each offer is a consistent
    /// view of its swap; see [`SwapRegistry::snapshot`].
    pub fn list(&self, filter: OfferFilter) -> Vec<SwapOffer> {
        let mut offers: Vec<SwapOffer> = self
            .registry
            .snapshot()
            .into_iter()
            .filter(|rec| filter.matches(rec.status()))
            .map(|rec| rec.to_offer())
            .collect();
        offers.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.swap_id.cmp(&a.swap_id))
        });
        offers
    }

    pub fn get(&self, id: &SwapId) -> Result<SwapOffer, EngineError> {
        self.registry
            .get(id)
            .map(|rec| rec.to_offer())
            .ok_or(EngineError::NotFound(*id))
    }

    /// Number of swaps in each status. Every status is present, possibly zero.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = SwapStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for rec in self.registry.snapshot() {
            *counts.entry(rec.status().as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.registry.len()
    }
}
