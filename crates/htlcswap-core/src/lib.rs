//! htlcswap core
//!
//! Shared vocabulary for the swap coordination engine: identifiers, the
//! closed swap status enum with its transition table, the public offer
//! projection, the timelock policy, and the clock capability.

pub mod error;
pub mod types;
pub mod state_machine;
pub mod offer;
pub mod timelock;
pub mod clock;
pub mod config;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CancelPolicy, EngineConfig};
pub use error::CoreError;
pub use offer::{AcceptTerms, OfferTerms, SwapOffer};
pub use state_machine::{SwapEvent, SwapStateMachine, SwapStatus};
pub use timelock::{TimelockPair, TimelockPolicy};
pub use types::{Actor, Address, AssetId, Hashlock, SwapId, Timestamp, TxRef};
