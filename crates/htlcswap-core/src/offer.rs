use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::state_machine::SwapStatus;
use crate::types::{Address, AssetId, Hashlock, SwapId, Timestamp, TxRef};

/// Terms an initiator publishes when creating an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferTerms {
    /// Asset the initiator gives.
    pub initiator_asset: AssetId,
    /// Quantity of `initiator_asset`, in the asset's native unit.
    pub initiator_amount: Decimal,
    /// Asset the initiator wants in return.
    pub acceptor_asset: AssetId,
    /// Quantity of `acceptor_asset`.
    pub acceptor_amount: Decimal,
    /// Where the initiator receives `acceptor_asset`.
    pub initiator_address: Address,
    /// Where a refund of the initiator's leg goes. `None` means the funding wallet.
    #[serde(default)]
    pub initiator_refund_address: Option<Address>,
}

impl OfferTerms {
    /// Check the terms before anything is generated or stored.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.initiator_amount <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(format!(
                "initiator_amount must be positive, got {}",
                self.initiator_amount
            )));
        }
        if self.acceptor_amount <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(format!(
                "acceptor_amount must be positive, got {}",
                self.acceptor_amount
            )));
        }
        if self.initiator_asset == self.acceptor_asset {
            return Err(CoreError::ValidationError(format!(
                "both legs trade the same asset ({})",
                self.initiator_asset
            )));
        }
        Ok(())
    }
}

/// Terms a counterparty supplies when accepting an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptTerms {
    /// Where the acceptor receives `initiator_asset`.
    pub acceptor_address: Address,
    /// Where a refund of the acceptor's leg goes. `None` means the funding wallet.
    #[serde(default)]
    pub acceptor_refund_address: Option<Address>,
}

/// Public projection of a swap. Never carries the secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapOffer {
    pub swap_id: SwapId,
    pub status: SwapStatus,
    pub initiator_asset: AssetId,
    pub initiator_amount: Decimal,
    pub acceptor_asset: AssetId,
    pub acceptor_amount: Decimal,
    pub initiator_address: Address,
    pub acceptor_address: Option<Address>,
    pub initiator_refund_address: Option<Address>,
    pub acceptor_refund_address: Option<Address>,
    pub hashlock: Hashlock,
    pub initiator_timelock: Timestamp,
    pub acceptor_timelock: Timestamp,
    pub initiator_txid: Option<TxRef>,
    pub acceptor_txid: Option<TxRef>,
    pub initiator_claim_txid: Option<TxRef>,
    pub acceptor_claim_txid: Option<TxRef>,
    pub initiator_refund_txid: Option<TxRef>,
    pub acceptor_refund_txid: Option<TxRef>,
    pub created_at: Timestamp,
    pub accepted_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}
