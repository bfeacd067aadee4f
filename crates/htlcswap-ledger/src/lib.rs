//! htlcswap ledger layer
//!
//! The capability the swap engine uses to lock, claim, and refund funds on
//! a chain, a router that dispatches by asset, and an in-memory HTLC ledger
//! for tests and chainless nodes.

pub mod error;
pub mod types;
pub mod traits;
pub mod htlc;
pub mod router;
pub mod adapters;

pub use adapters::memory::MemoryLedger;
pub use error::LedgerError;
pub use htlc::{HtlcBook, HtlcContract, HtlcStatus};
pub use router::LedgerRouter;
pub use traits::LedgerAdapter;
pub use types::{LedgerOp, LockRequest};
