use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Lifecycle states of a swap offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStatus {
    /// Initiator published the offer; nothing is locked.
    Offered,
    /// A counterparty committed to the offer and gave a receiving address.
    Accepted,
    /// Initiator's leg is locked under the hashlock.
    InitiatorLocked,
    /// Both legs are locked under the same hashlock.
    AcceptorLocked,
    /// Initiator claimed the acceptor's leg, revealing the secret.
    InitiatorClaimed,
    /// Acceptor claimed the initiator's leg. Final state.
    Completed,
    /// Locked legs were returned after timelock expiry. Final state.
    Refunded,
    /// Offer withdrawn before acceptance. Final state.
    Cancelled,
}

impl SwapStatus {
    pub const ALL: [SwapStatus; 8] = [
        Self::Offered,
        Self::Accepted,
        Self::InitiatorLocked,
        Self::AcceptorLocked,
        Self::InitiatorClaimed,
        Self::Completed,
        Self::Refunded,
        Self::Cancelled,
    ];

    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Refunded | Self::Cancelled)
    }

    /// Whether the offer can still be taken by a counterparty.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Offered)
    }

    /// Whether the swap is underway (accepted but not yet final).
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::InitiatorLocked | Self::AcceptorLocked | Self::InitiatorClaimed
        )
    }

    /// Wire name, as used in JSON and query strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offered => "offered",
            Self::Accepted => "accepted",
            Self::InitiatorLocked => "initiator_locked",
            Self::AcceptorLocked => "acceptor_locked",
            Self::InitiatorClaimed => "initiator_claimed",
            Self::Completed => "completed",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SwapStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::UnknownStatus(s.to_string()))
    }
}

/// Protocol steps that move a swap between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapEvent {
    Accept,
    LockInitiator,
    LockAcceptor,
    ClaimInitiator,
    ClaimAcceptor,
    Cancel,
    Refund,
}

impl SwapEvent {
    pub const ALL: [SwapEvent; 7] = [
        Self::Accept,
        Self::LockInitiator,
        Self::LockAcceptor,
        Self::ClaimInitiator,
        Self::ClaimAcceptor,
        Self::Cancel,
        Self::Refund,
    ];

    /// Operation name as exposed by the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept_offer",
            Self::LockInitiator => "lock_initiator",
            Self::LockAcceptor => "lock_acceptor",
            Self::ClaimInitiator => "claim_initiator",
            Self::ClaimAcceptor => "claim_acceptor",
            Self::Cancel => "cancel_offer",
            Self::Refund => "refund",
        }
    }
}

impl fmt::Display for SwapEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Swap state transitions.
///
/// Valid transitions:
/// - Offered → Accepted (Accept)
/// - Offered → Cancelled (Cancel)
/// - Accepted → InitiatorLocked (LockInitiator)
/// - InitiatorLocked → AcceptorLocked (LockAcceptor)
/// - InitiatorLocked → Refunded (Refund)
/// - AcceptorLocked → InitiatorClaimed (ClaimInitiator)
/// - AcceptorLocked → Refunded (Refund)
/// - InitiatorClaimed → Completed (ClaimAcceptor)
pub struct SwapStateMachine;

impl SwapStateMachine {
    /// The transition table. Every legal edge is listed here and nowhere else.
    fn target(current: SwapStatus, event: SwapEvent) -> Option<SwapStatus> {
        let next = match (current, event) {
            (SwapStatus::Offered, SwapEvent::Accept) => SwapStatus::Accepted,
            (SwapStatus::Offered, SwapEvent::Cancel) => SwapStatus::Cancelled,

            (SwapStatus::Accepted, SwapEvent::LockInitiator) => SwapStatus::InitiatorLocked,

            (SwapStatus::InitiatorLocked, SwapEvent::LockAcceptor) => SwapStatus::AcceptorLocked,
            (SwapStatus::InitiatorLocked, SwapEvent::Refund) => SwapStatus::Refunded,

            (SwapStatus::AcceptorLocked, SwapEvent::ClaimInitiator) => SwapStatus::InitiatorClaimed,
            (SwapStatus::AcceptorLocked, SwapEvent::Refund) => SwapStatus::Refunded,

            (SwapStatus::InitiatorClaimed, SwapEvent::ClaimAcceptor) => SwapStatus::Completed,

            _ => return None,
        };
        Some(next)
    }

    /// Attempt a state transition based on an event.
    /// Returns the new state on success, or an error for invalid transitions.
    pub fn transition(current: SwapStatus, event: SwapEvent) -> Result<SwapStatus, CoreError> {
        let new_state = Self::target(current, event)
            .ok_or(CoreError::InvalidStateTransition { from: current, event })?;

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = %event,
            "swap state transition"
        );

        Ok(new_state)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: SwapStatus, event: SwapEvent) -> bool {
        Self::target(current, event).is_some()
    }

    /// Whether `to` is reachable from `from` by exactly one edge.
    pub fn is_edge(from: SwapStatus, to: SwapStatus) -> bool {
        SwapEvent::ALL
            .into_iter()
            .any(|event| Self::target(from, event) == Some(to))
    }

    /// Events that are legal in the given state.
    pub fn events_from(current: SwapStatus) -> Vec<SwapEvent> {
        SwapEvent::ALL
            .into_iter()
            .filter(|event| Self::can_transition(current, *event))
            .collect()
    }
}
