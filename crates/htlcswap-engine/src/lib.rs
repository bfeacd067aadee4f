//! htlcswap engine
//!
//! Coordinates two-party HTLC swaps: a registry of swap records with
//! per-swap compare-and-transition, the controller that walks each swap
//! through its lifecycle against a ledger adapter, and read-only queries.

pub mod error;
pub mod registry;
pub mod controller;
pub mod query;

pub use controller::{ClaimReceipt, SwapController};
pub use error::EngineError;
pub use query::{OfferFilter, SwapQuery};
pub use registry::{SwapRecord, SwapRegistry};
