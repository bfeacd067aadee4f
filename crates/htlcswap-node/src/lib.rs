//! htlcswap node
//!
//! Configuration, shared state, and the REST API that expose the swap
//! engine over HTTP.

pub mod api;
pub mod config;
pub mod state;
